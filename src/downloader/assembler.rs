// src/downloader/assembler.rs

use crate::error::*;
use log::{debug, info};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// 按序号顺序把分片拼接为最终文件，不做任何转码。
pub struct Assembler;

impl Assembler {
    /// `chunks` 必须已按序号升序排列。先写入输出目录下的临时文件，
    /// 全部成功后再替换到 `output`，失败时不会留下半成品。
    pub fn merge(chunks: &[PathBuf], output: &Path) -> AppResult<u64> {
        if chunks.is_empty() {
            return Err(AppError::NoChunks);
        }

        let parent = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let temp_output = NamedTempFile::new_in(&parent)?;
        let mut writer = BufWriter::new(temp_output);
        let mut written = 0u64;
        for path in chunks {
            let mut reader = File::open(path).map_err(|e| {
                AppError::Merge(format!("无法读取分片 {:?}: {}", path.file_name().unwrap_or_default(), e))
            })?;
            written += io::copy(&mut reader, &mut writer)?;
        }
        writer.flush()?;
        let temp_output = writer
            .into_inner()
            .map_err(|e| AppError::Merge(e.error().to_string()))?;
        temp_output.persist(output)?;

        debug!("合并 {} 个分片，共 {} 字节", chunks.len(), written);
        info!("输出文件已写入: {}", output.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_concatenates_in_given_order() {
        let dir = tempfile::tempdir().unwrap();
        let parts: Vec<PathBuf> = ["a", "bb", "ccc"]
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let path = dir.path().join(format!("{:05}.ts", i));
                fs::write(&path, content).unwrap();
                path
            })
            .collect();

        let output = dir.path().join("out").join("video.ts");
        let written = Assembler::merge(&parts, &output).unwrap();

        assert_eq!(written, 6);
        assert_eq!(fs::read_to_string(&output).unwrap(), "abbccc");
    }

    #[test]
    fn test_merge_without_chunks_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("video.ts");
        assert!(matches!(Assembler::merge(&[], &output), Err(AppError::NoChunks)));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_chunk_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("00000.ts");
        fs::write(&present, "data").unwrap();
        let output = dir.path().join("video.ts");

        let err = Assembler::merge(&[present, dir.path().join("00001.ts")], &output).unwrap_err();
        assert!(matches!(err, AppError::Merge(_)));
        assert!(!output.exists());
        // 临时输出文件也应被清理
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
