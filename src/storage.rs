use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// Flat, name-addressed blob store for uploaded photo files.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    /// `Ok(None)` when no object is stored under `key`.
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

pub async fn from_config(config: &StorageConfig) -> anyhow::Result<std::sync::Arc<dyn StorageClient>> {
    let client: std::sync::Arc<dyn StorageClient> = match config {
        StorageConfig::Local { root } => std::sync::Arc::new(LocalStorage::new(root).await?),
        StorageConfig::S3 {
            endpoint,
            bucket,
            access_key,
            secret_key,
            region,
        } => std::sync::Arc::new(
            S3Storage::new(endpoint, bucket, access_key, secret_key, region).await?,
        ),
    };
    Ok(client)
}

/// Keys are single path segments; anything that could escape the store root is refused.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 255
        && !key.contains(['/', '\\'])
        && !key.starts_with('.')
        && !key.contains("..")
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

pub fn mime_from_key(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create storage dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(is_valid_key(key), "invalid object key {key:?}");
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        anyhow::ensure!(is_valid_key(key), "invalid object key {key:?}");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        anyhow::ensure!(is_valid_key(key), "invalid object key {key:?}");
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(e).context("s3 get_object"),
        };
        let data = output
            .body
            .collect()
            .await
            .context("s3 get_object body")?
            .into_bytes();
        Ok(Some(data))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        anyhow::ensure!(is_valid_key(key), "invalid object key {key:?}");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn test_mime_from_key() {
        assert_eq!(mime_from_key("a.JPG"), "image/jpeg");
        assert_eq!(mime_from_key("b.png"), "image/png");
        assert_eq!(mime_from_key("noext"), "application/octet-stream");
    }

    #[test]
    fn keys_cannot_escape_the_root() {
        assert!(is_valid_key("3f1c.jpg"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("a/b.jpg"));
        assert!(!is_valid_key("a\\b.jpg"));
        assert!(!is_valid_key(".hidden"));
    }

    #[tokio::test]
    async fn local_storage_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStorage::new(dir.path().join("files")).await.unwrap();

        store
            .put_object("pic.png", Bytes::from_static(b"png-bytes"), "image/png")
            .await
            .unwrap();
        let got = store.get_object("pic.png").await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"png-bytes"[..]));

        store.delete_object("pic.png").await.unwrap();
        assert!(store.get_object("pic.png").await.unwrap().is_none());
        // deleting twice is fine
        store.delete_object("pic.png").await.unwrap();
    }

    #[tokio::test]
    async fn local_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStorage::new(dir.path()).await.unwrap();
        assert!(store.get_object("../secret").await.is_err());
    }
}
