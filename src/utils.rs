// src/utils.rs

use crate::constants::AES_BLOCK_LEN;

/// 将多行文本拆分为播放列表链接，忽略空行与首尾空白。
pub fn parse_playlist_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 解析 `#EXT-X-KEY` 中的 IV，例如 `0x000102...0f`。
pub fn parse_iv_hex(value: &str) -> Result<[u8; AES_BLOCK_LEN], String> {
    let digits = value
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let bytes = hex::decode(digits).map_err(|e| format!("无效的IV十六进制值 '{}': {}", value, e))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("IV 长度应为 {} 字节，实际为 {} 字节", AES_BLOCK_LEN, b.len()))
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}
