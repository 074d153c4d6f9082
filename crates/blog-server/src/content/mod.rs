mod assets;
mod blob;
mod extract;
mod sanitize;

pub use assets::AssetPersister;
pub use blob::{BlobError, BlobStore, FsBlobStore, MemoryBlobStore};
pub use extract::{decode_image, extract, AssetSource, EmbeddedAsset, Extraction, ImageUpload};
pub use sanitize::{
    is_hard_denied_attribute, is_hard_denied_tag, sanitize, SanitizePolicy, Sanitizer,
};

use uuid::Uuid;

/// Sanitizes a raw post body and lifts its images out, in that order.
#[derive(Debug, Clone)]
pub struct ContentPipeline {
    sanitizer: Sanitizer,
    url_prefix: String,
}

impl ContentPipeline {
    pub fn new(sanitizer: Sanitizer, url_prefix: &str) -> Self {
        Self {
            sanitizer,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Blob directory holding the body assets written by one post version.
    pub fn asset_dir(post_id: Uuid, revision: i64) -> String {
        format!("{post_id}/{revision}")
    }

    pub fn cover_path(post_id: Uuid, revision: i64, extension: &str) -> String {
        format!("{post_id}/cover-{revision}.{extension}")
    }

    pub fn public_url(&self, blob_path: &str) -> String {
        format!("{}/{}", self.url_prefix, blob_path)
    }

    /// Inverse of [`Self::public_url`].
    pub fn blob_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.url_prefix.as_str())?.strip_prefix('/')
    }

    pub fn process(&self, post_id: Uuid, revision: i64, raw: &str) -> Extraction {
        let clean = self.sanitizer.sanitize(raw);
        extract(&clean, &self.public_url(&Self::asset_dir(post_id, revision)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_before_extracting() {
        let pipeline = ContentPipeline::new(Sanitizer::default(), "/blogImages/");
        let id = Uuid::nil();

        let out = pipeline.process(
            id,
            2,
            "<script>x</script><img src=\"a.png\" onerror=\"x()\"><img src=\"javascript:x\">",
        );

        assert_eq!(
            out.markup,
            format!("<img src=\"/blogImages/{id}/2/1.png\"><img>")
        );
        assert_eq!(out.assets.len(), 1);
    }

    #[test]
    fn public_urls_map_back_to_blob_paths() {
        let pipeline = ContentPipeline::new(Sanitizer::default(), "/blogImages");
        let path = ContentPipeline::cover_path(Uuid::nil(), 3, "png");

        let url = pipeline.public_url(&path);

        assert_eq!(url, format!("/blogImages/{}/cover-3.png", Uuid::nil()));
        assert_eq!(pipeline.blob_path(&url), Some(path.as_str()));
        assert_eq!(pipeline.blob_path("/elsewhere/x.png"), None);
        assert_eq!(pipeline.blob_path("/blogImagesX/x.png"), None);
    }
}
