use std::sync::Arc;

use blog_shared::{AssetFailure, AssetReport};

use super::{AssetSource, BlobStore, EmbeddedAsset, ImageUpload};

/// Writes extracted assets to the blob store, one independent write per asset.
#[derive(Clone)]
pub struct AssetPersister {
    blobs: Arc<dyn BlobStore>,
    http: Option<reqwest::Client>,
}

impl AssetPersister {
    /// `http` enables fetching remote images; without it they are skipped.
    pub fn new(blobs: Arc<dyn BlobStore>, http: Option<reqwest::Client>) -> Self {
        Self { blobs, http }
    }

    /// Stores `assets` below `dir`. A failed asset is recorded and logged; it
    /// never stops the others and never undoes those already stored.
    pub async fn persist(&self, dir: &str, assets: &[EmbeddedAsset]) -> AssetReport {
        let mut report = AssetReport::default();

        for asset in assets {
            let path = asset.blob_path(dir);
            let bytes = match &asset.source {
                AssetSource::Inline(bytes) => bytes.clone(),
                AssetSource::Invalid(reason) => {
                    tracing::warn!(%path, %reason, "Skipping undecodable asset");
                    report.failed.push(AssetFailure {
                        path,
                        reason: reason.clone(),
                    });
                    continue;
                }
                AssetSource::Remote(url) => match self.fetch(url).await {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        tracing::warn!(%path, %url, "Failed to fetch asset: {}", e);
                        report.failed.push(AssetFailure {
                            path,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                    None => {
                        report.skipped.push(path);
                        continue;
                    }
                },
            };

            self.store(path, &bytes, &mut report).await;
        }

        tracing::debug!(
            %dir,
            stored = report.stored.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Persisted post assets"
        );
        report
    }

    /// Stores an uploaded image at `path`, recording the outcome in `report`.
    pub async fn persist_image(&self, path: String, image: &ImageUpload, report: &mut AssetReport) {
        self.store(path, &image.bytes, report).await;
    }

    async fn store(&self, path: String, bytes: &[u8], report: &mut AssetReport) {
        match self.blobs.store(&path, bytes).await {
            Ok(()) => report.stored.push(path),
            Err(e) => {
                tracing::warn!(%path, "Failed to store asset: {}", e);
                report.failed.push(AssetFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn fetch(&self, url: &str) -> Option<Result<Vec<u8>, reqwest::Error>> {
        let client = self.http.as_ref()?;
        let result: Result<Vec<u8>, reqwest::Error> = async {
            let response = client.get(url).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
        .await;
        Some(result)
    }

    /// Drops every blob stored below `prefix`.
    pub async fn discard(&self, prefix: &str) {
        if let Err(e) = self.blobs.delete_prefix(prefix).await {
            tracing::warn!(%prefix, "Failed to remove assets: {}", e);
        }
    }

    pub async fn remove(&self, path: &str) {
        if let Err(e) = self.blobs.delete(path).await {
            tracing::warn!(%path, "Failed to remove asset: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::content::{extract, BlobError, MemoryBlobStore};

    /// Fails every write whose path contains `/2.`.
    struct FlakyBlobStore {
        inner: MemoryBlobStore,
    }

    #[async_trait]
    impl BlobStore for FlakyBlobStore {
        async fn store(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
            if path.contains("/2.") {
                return Err(BlobError::Io(std::io::Error::other("disk full")));
            }
            self.inner.store(path, bytes).await
        }

        async fn delete(&self, path: &str) -> Result<(), BlobError> {
            self.inner.delete(path).await
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<(), BlobError> {
            self.inner.delete_prefix(prefix).await
        }
    }

    #[tokio::test]
    async fn failures_do_not_stop_remaining_assets() {
        let blobs = Arc::new(FlakyBlobStore {
            inner: MemoryBlobStore::new(),
        });
        let persister = AssetPersister::new(blobs.clone(), None);
        let dir = format!("{}/1", Uuid::nil());
        let extraction = extract(
            "<img src=\"data:image/gif;base64,R0lGOA==\">\
             <img src=\"data:image/png;base64,iVBORw0KGgo=\">\
             <img src=\"data:image/png;base64,@@@\">\
             <img src=\"https://cdn.example/x.jpg\">\
             <img src=\"data:image/gif;base64,R0lGOA==\">",
            "/r",
        );

        let report = persister.persist(&dir, &extraction.assets).await;

        let prefix = dir;
        assert_eq!(
            report.stored,
            vec![format!("{prefix}/1.gif"), format!("{prefix}/5.gif")]
        );
        assert_eq!(report.skipped, vec![format!("{prefix}/4.jpg")]);
        let failed: Vec<&str> = report.failed.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, vec![format!("{prefix}/2.png"), format!("{prefix}/3.png")]);
        assert!(!report.is_complete());
        assert_eq!(
            blobs.inner.get(&format!("{prefix}/1.gif")).await.as_deref(),
            Some(&b"GIF8"[..])
        );
    }

    #[tokio::test]
    async fn discard_removes_post_assets() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let persister = AssetPersister::new(blobs.clone(), None);
        let post_id = Uuid::new_v4();
        let extraction = extract("<img src=\"data:image/gif;base64,R0lGOA==\">", "/r");
        let mut report = persister.persist(&format!("{post_id}/1"), &extraction.assets).await;
        let cover = ImageUpload {
            extension: "png".to_string(),
            bytes: b"png".to_vec(),
        };
        persister
            .persist_image(format!("{post_id}/cover-1.png"), &cover, &mut report)
            .await;
        assert_eq!(report.stored.len(), 2);

        persister.remove(&format!("{post_id}/cover-1.png")).await;
        assert_eq!(blobs.paths().await, vec![format!("{post_id}/1/1.gif")]);

        persister.discard(&post_id.to_string()).await;
        assert!(blobs.paths().await.is_empty());
    }
}
