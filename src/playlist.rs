// src/playlist.rs

use crate::{
    client::RobustClient,
    config::KeyPolicy,
    error::*,
    models::{KeyDescriptor, PlaylistContent, RunPlan},
    utils,
};
use async_trait::async_trait;
use log::{debug, info};
use m3u8_rs::{Key, KeyMethod, MediaSegment, Playlist};
use std::sync::Arc;
use url::Url;

/// 播放列表来源：读取一个 M3U8 地址并返回其分片与密钥信息。
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn load(&self, uri: &Url) -> AppResult<PlaylistContent>;
}

pub struct HttpPlaylistSource {
    client: Arc<RobustClient>,
}

impl HttpPlaylistSource {
    pub fn new(client: Arc<RobustClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlaylistSource for HttpPlaylistSource {
    async fn load(&self, uri: &Url) -> AppResult<PlaylistContent> {
        debug!("下载播放列表: {}", uri);
        let body = self.client.fetch_bytes(uri.clone()).await?;
        parse_media_playlist(uri, &body)
    }
}

/// 依次加载所有播放列表，按输入顺序合并为一个全局编号的任务计划。
pub async fn load_plan(
    source: &dyn PlaylistSource,
    uris: &[Url],
    policy: KeyPolicy,
) -> AppResult<RunPlan> {
    let mut playlists = Vec::with_capacity(uris.len());
    for uri in uris {
        let content = source.load(uri).await?;
        info!(
            "播放列表 '{}' 包含 {} 个分片{}",
            uri,
            content.segments.len(),
            if content.key.is_some() { " (已加密)" } else { "" }
        );
        playlists.push(content);
    }
    Ok(RunPlan::build(playlists, policy))
}

/// 解析媒体播放列表文本。分片与密钥地址相对 `uri` 解析。
pub fn parse_media_playlist(uri: &Url, body: &[u8]) -> AppResult<PlaylistContent> {
    let parse_error = |reason: String| AppError::Parse {
        uri: uri.to_string(),
        reason,
    };

    let media = match m3u8_rs::parse_playlist_res(body) {
        Ok(Playlist::MediaPlaylist(media)) => media,
        Ok(Playlist::MasterPlaylist(_)) => {
            return Err(parse_error("这是一个多码率主播放列表，请提供具体的媒体播放列表".into()));
        }
        Err(e) => return Err(parse_error(e.to_string())),
    };

    let key = first_key(&media.segments)
        .map(|k| resolve_key(uri, k))
        .transpose()
        .map_err(parse_error)?
        .flatten();

    let segments = media
        .segments
        .iter()
        .map(|seg| uri.join(seg.uri.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| parse_error(format!("无效的分片地址: {}", e)))?;

    Ok(PlaylistContent {
        uri: uri.clone(),
        segments,
        key,
    })
}

fn first_key(segments: &[MediaSegment]) -> Option<&Key> {
    segments.iter().find_map(|seg| seg.key.as_ref())
}

/// `METHOD=NONE` 视为无密钥；只支持 AES-128。
fn resolve_key(base: &Url, key: &Key) -> Result<Option<KeyDescriptor>, String> {
    match &key.method {
        KeyMethod::None => return Ok(None),
        KeyMethod::AES128 => {}
        other => return Err(format!("不支持的加密方式: {:?}", other)),
    }
    let key_uri = key
        .uri
        .as_deref()
        .ok_or_else(|| "EXT-X-KEY 缺少 URI 属性".to_string())?;
    let uri = base
        .join(key_uri)
        .map_err(|e| format!("无效的密钥地址 '{}': {}", key_uri, e))?;
    let iv = key.iv.as_deref().map(utils::parse_iv_hex).transpose()?;
    Ok(Some(KeyDescriptor { uri, iv }))
}
