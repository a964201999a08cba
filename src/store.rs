//! Durable storage for run log records

use crate::errors::{CanaryError, Result};
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::debug;

/// Object store accepting one write per key
#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Stores objects as files under `<root>/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct FsLogStore {
    root: PathBuf,
}

impl FsLogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        for part in [bucket, key] {
            let path = Path::new(part);
            let escapes = path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if part.is_empty() || escapes {
                return Err(CanaryError::Store(format!("invalid object path segment: {:?}", part)));
            }
        }

        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait::async_trait]
impl LogStore for FsLogStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // records are never overwritten
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    CanaryError::AlreadyExists(format!("{}/{}", bucket, key))
                }
                _ => CanaryError::Io(e),
            })?;

        file.write_all(&body).await?;
        file.flush().await?;

        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }
}

/// Path-style HTTP object store: `PUT <endpoint>/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct HttpLogStore {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpLogStore {
    pub fn new(endpoint: String, http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("canary/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CanaryError::Http)?;

        Ok(Self {
            client,
            endpoint,
            timeout: http_timeout,
        })
    }
}

#[async_trait::async_trait]
impl LogStore for HttpLogStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let url = format!("{}/{}/{}", self.endpoint, bucket, key);

        let response = timeout(
            self.timeout,
            self.client
                .put(&url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(body)
                .send(),
        )
        .await
        .map_err(|_| CanaryError::Store(format!("Timed out writing {}", url)))?
        .map_err(CanaryError::Http)?;

        let status = response.status();
        if status.is_success() {
            debug!("Stored {}", url);
            return Ok(());
        }

        if matches!(status.as_u16(), 409 | 412) {
            return Err(CanaryError::AlreadyExists(format!("{}/{}", bucket, key)));
        }

        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        Err(CanaryError::Store(format!(
            "PUT {} returned {}: {}",
            url, status, error_body
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fs_store_writes_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());

        store
            .put("bucket", "logs/1700000000000.txt", b"Name: A".to_vec())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("bucket/logs/1700000000000.txt")).unwrap();
        assert_eq!(written, "Name: A");
    }

    #[tokio::test]
    async fn test_fs_store_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());

        store.put("bucket", "logs/1.txt", b"first".to_vec()).await.unwrap();
        let second = store.put("bucket", "logs/1.txt", b"second".to_vec()).await;

        assert!(matches!(second, Err(CanaryError::AlreadyExists(_))));
        let written = std::fs::read_to_string(dir.path().join("bucket/logs/1.txt")).unwrap();
        assert_eq!(written, "first");
    }

    #[tokio::test]
    async fn test_fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());

        let result = store.put("bucket", "../outside.txt", Vec::new()).await;
        assert!(matches!(result, Err(CanaryError::Store(_))));

        let result = store.put("", "logs/1.txt", Vec::new()).await;
        assert!(matches!(result, Err(CanaryError::Store(_))));
    }

    #[tokio::test]
    async fn test_http_store_puts_object() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/canary-bucket/logs/42.txt"))
            .and(header("content-type", "text/plain; charset=utf-8"))
            .and(body_string("Name: A, URL: https://a/, Status: available, Latency: 3ms"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpLogStore::new(server.uri(), Duration::from_secs(5)).unwrap();
        let body = b"Name: A, URL: https://a/, Status: available, Latency: 3ms".to_vec();

        tokio_test::assert_ok!(store.put("canary-bucket", "logs/42.txt", body).await);
    }

    #[tokio::test]
    async fn test_http_store_conflict_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let store = HttpLogStore::new(server.uri(), Duration::from_secs(5)).unwrap();
        let result = store.put("canary-bucket", "logs/1.txt", Vec::new()).await;

        assert!(matches!(result, Err(CanaryError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_http_store_reports_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
            .mount(&server)
            .await;

        let store = HttpLogStore::new(server.uri(), Duration::from_secs(5)).unwrap();
        let result = store.put("canary-bucket", "logs/1.txt", Vec::new()).await;

        match result {
            Err(CanaryError::Store(msg)) => assert!(msg.contains("AccessDenied")),
            other => panic!("expected store error, got {:?}", other),
        }
    }
}
