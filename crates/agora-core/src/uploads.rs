use std::path::PathBuf;

use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::{Result, ServiceError};

pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    Avatars,
    PostImages,
}

impl ImageFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::PostImages => "images",
        }
    }
}

/// Uploaded images on disk under `{root}/{folder}/{uuid}.{ext}`, served
/// statically at `/{folder}/...`.
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub async fn new(root: PathBuf) -> Result<Self> {
        for folder in [ImageFolder::Avatars, ImageFolder::PostImages] {
            fs::create_dir_all(root.join(folder.as_str())).await?;
        }
        info!("Image storage directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn folder_path(&self, folder: ImageFolder) -> PathBuf {
        self.root.join(folder.as_str())
    }

    /// Write the image and return its public URL path.
    pub async fn save(&self, folder: ImageFolder, content_type: Option<&str>, data: &[u8]) -> Result<String> {
        let ext = content_type
            .and_then(extension_for)
            .ok_or_else(|| ServiceError::InvalidInput("unsupported image type".into()))?;
        if data.is_empty() {
            return Err(ServiceError::InvalidInput("empty image".into()));
        }
        if data.len() > MAX_IMAGE_SIZE {
            return Err(ServiceError::PayloadTooLarge(format!(
                "image exceeds {} bytes",
                MAX_IMAGE_SIZE
            )));
        }

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(self.folder_path(folder).join(&name), data).await?;

        let url = format!("/{}/{}", folder.as_str(), name);
        info!("Stored image {} ({} bytes)", url, data.len());
        Ok(url)
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
