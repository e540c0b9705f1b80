// src/crypto.rs

use crate::{client::RobustClient, constants::AES_BLOCK_LEN, error::*, models::KeyDescriptor};
use aes::cipher::{
    BlockDecryptMut, KeyIvInit,
    block_padding::{NoPadding, Pkcs7},
};
use log::{debug, error};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// 已解析的 AES-128 密钥与 IV，任务期间不再修改。
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key: [u8; AES_BLOCK_LEN],
    iv: [u8; AES_BLOCK_LEN],
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"<redacted>")
            .field("iv", &hex::encode(self.iv))
            .finish()
    }
}

impl KeyMaterial {
    /// 未指定 IV 时使用密钥本身的前 16 字节。
    pub fn new(key_bytes: &[u8], iv: Option<[u8; AES_BLOCK_LEN]>) -> Result<Self, String> {
        let key = <[u8; AES_BLOCK_LEN]>::try_from(key_bytes).map_err(|_| {
            format!("密钥长度应为 {} 字节，实际为 {} 字节", AES_BLOCK_LEN, key_bytes.len())
        })?;
        Ok(Self {
            key,
            iv: iv.unwrap_or(key),
        })
    }

    pub fn iv(&self) -> &[u8; AES_BLOCK_LEN] {
        &self.iv
    }

    /// 以 AES-128-CBC 解密整个分片，所有分片共用同一个 IV。
    /// 末尾是合法的 PKCS#7 填充时去除填充，否则原样返回全部明文；
    /// 只有长度不是块大小整数倍的数据才算解密失败。
    pub fn decrypt(&self, data: &[u8]) -> AppResult<Vec<u8>> {
        if data.len() % AES_BLOCK_LEN != 0 {
            return Err(AppError::Decrypt(format!(
                "密文长度 {} 不是 {} 字节的整数倍",
                data.len(),
                AES_BLOCK_LEN
            )));
        }
        match self.decryptor()?.decrypt_padded_vec_mut::<Pkcs7>(data) {
            Ok(plain) => Ok(plain),
            Err(_) => {
                debug!("分片末尾不是 PKCS#7 填充，保留完整明文");
                self.decryptor()?
                    .decrypt_padded_vec_mut::<NoPadding>(data)
                    .map_err(|e| AppError::Decrypt(e.to_string()))
            }
        }
    }

    fn decryptor(&self) -> AppResult<Aes128CbcDec> {
        Aes128CbcDec::new_from_slices(&self.key, &self.iv)
            .map_err(|e| AppError::Decrypt(format!("AES解密器初始化失败: {}", e)))
    }
}

/// 负责下载密钥，每个密钥地址在一次任务中只请求一次。
pub struct KeyResolver<'a> {
    client: &'a RobustClient,
}

impl<'a> KeyResolver<'a> {
    pub fn new(client: &'a RobustClient) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, descriptor: &KeyDescriptor) -> AppResult<KeyMaterial> {
        let key_fetch_error = |reason: String| AppError::KeyFetch {
            uri: descriptor.uri.to_string(),
            reason,
        };

        let key_bytes = self
            .client
            .fetch_bytes(descriptor.uri.clone())
            .await
            .map_err(|e| {
                error!("密钥下载失败: {}", e);
                key_fetch_error(e.to_string())
            })?;
        let material = KeyMaterial::new(&key_bytes, descriptor.iv).map_err(key_fetch_error)?;
        debug!("已获取密钥 '{}': {:?}", descriptor.uri, material);
        Ok(material)
    }

    /// 依次解析所有密钥，任一失败即返回错误。
    pub async fn resolve_all(&self, descriptors: &[KeyDescriptor]) -> AppResult<Vec<KeyMaterial>> {
        let mut materials: Vec<KeyMaterial> = Vec::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            // 多个播放列表可能引用同一个密钥地址
            let fetched = descriptors[..i]
                .iter()
                .position(|d| d.uri == descriptor.uri)
                .map(|pos| materials[pos].key);
            let material = match fetched {
                Some(key) => KeyMaterial::new(&key, descriptor.iv).map_err(AppError::Decrypt)?,
                None => self.resolve(descriptor).await?,
            };
            materials.push(material);
        }
        Ok(materials)
    }
}
