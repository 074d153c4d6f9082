//! Lifts embedded images out of sanitized markup.
//!
//! Every `<img>` with a `src` gets a sequential placeholder path under the
//! post's placeholder root, and the `src` value is rewritten in place. Nothing
//! else in the markup is touched.

use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD, Engine};
use blog_shared::AssetRef;
use regex::Regex;
use super::sanitize::decode_references;

/// Where the bytes of an extracted image come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Decoded from a `data:` URI.
    Inline(Vec<u8>),
    /// External URL, fetched at persistence time if enabled.
    Remote(String),
    /// A `data:` URI whose payload could not be decoded.
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct EmbeddedAsset {
    pub position: u32,
    pub original: String,
    /// The `<img>` element as it appeared before rewriting.
    pub element: String,
    pub placeholder: String,
    pub extension: String,
    pub source: AssetSource,
}

impl EmbeddedAsset {
    /// Blob store path: `{dir}/{position}.{extension}`.
    pub fn blob_path(&self, dir: &str) -> String {
        format!("{}/{}.{}", dir, self.position, self.extension)
    }

    pub fn to_ref(&self) -> AssetRef {
        AssetRef {
            position: self.position,
            placeholder: self.placeholder.clone(),
            extension: self.extension.clone(),
            original: match self.source {
                AssetSource::Remote(_) => Some(self.original.clone()),
                _ => None,
            },
        }
    }
}

/// An uploaded image, decoded and ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub extension: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub markup: String,
    pub assets: Vec<EmbeddedAsset>,
}

fn img_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid img pattern"))
}

/// One attribute per match; quoted values are consumed whole so that text
/// inside them is never mistaken for another attribute.
fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\s([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid attribute pattern")
    })
}

/// Rewrites every image reference in `markup` to `{placeholder_root}/{n}.{ext}`
/// and returns the assets in document order.
pub fn extract(markup: &str, placeholder_root: &str) -> Extraction {
    let root = placeholder_root.trim_end_matches('/');
    let mut rewritten = String::with_capacity(markup.len());
    let mut assets = Vec::new();
    let mut copied_to = 0;

    for tag in img_pattern().find_iter(markup) {
        let element = tag.as_str();
        let Some(value) = attribute_pattern()
            .captures_iter(element)
            .find(|caps| caps[1].eq_ignore_ascii_case("src"))
            .and_then(|caps| caps.get(2).or(caps.get(3)).or(caps.get(4)))
        else {
            continue;
        };
        if value.as_str().is_empty() {
            continue;
        }

        let position = assets.len() as u32 + 1;
        let original = decode_references(value.as_str());
        let extension = extension_for(&original);
        let placeholder = format!("{root}/{position}.{extension}");

        let value_start = tag.start() + value.start();
        let value_end = tag.start() + value.end();
        rewritten.push_str(&markup[copied_to..value_start]);
        rewritten.push_str(&placeholder);
        copied_to = value_end;

        assets.push(EmbeddedAsset {
            position,
            source: source_for(&original),
            original,
            element: element.to_string(),
            placeholder,
            extension,
        });
    }
    rewritten.push_str(&markup[copied_to..]);

    Extraction {
        markup: rewritten,
        assets,
    }
}

/// Decodes an upload given as a `data:image/...` URI.
pub fn decode_image(reference: &str) -> Result<ImageUpload, String> {
    let is_image = strip_data_scheme(reference)
        .and_then(|rest| rest.get(..6))
        .is_some_and(|mime| mime.eq_ignore_ascii_case("image/"));
    if !is_image {
        return Err("expected a data:image/... URI".to_string());
    }

    match source_for(reference) {
        AssetSource::Inline(bytes) if !bytes.is_empty() => Ok(ImageUpload {
            extension: extension_for(reference),
            bytes,
        }),
        AssetSource::Invalid(reason) => Err(reason),
        _ => Err("image payload is empty".to_string()),
    }
}

fn strip_data_scheme(reference: &str) -> Option<&str> {
    let head = reference.get(..5)?;
    head.eq_ignore_ascii_case("data:").then(|| &reference[5..])
}

fn extension_for(reference: &str) -> String {
    if let Some(rest) = strip_data_scheme(reference) {
        let mime = rest
            .split(|c| c == ';' || c == ',')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let subtype = mime.rsplit('/').next().unwrap_or_default();
        return match subtype {
            "jpeg" => "jpg".to_string(),
            "svg+xml" => "svg".to_string(),
            s if is_plain_extension(s) => s.to_string(),
            _ => "bin".to_string(),
        };
    }

    let path = reference
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && is_plain_extension(ext) => ext.to_ascii_lowercase(),
        _ => "bin".to_string(),
    }
}

fn is_plain_extension(ext: &str) -> bool {
    (1..=5).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn source_for(reference: &str) -> AssetSource {
    let Some(rest) = strip_data_scheme(reference) else {
        return AssetSource::Remote(reference.to_string());
    };
    let Some((meta, payload)) = rest.split_once(',') else {
        return AssetSource::Invalid("data URI has no payload".to_string());
    };

    if meta.to_ascii_lowercase().ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        match STANDARD.decode(compact) {
            Ok(bytes) => AssetSource::Inline(bytes),
            Err(e) => AssetSource::Invalid(format!("invalid base64 payload: {e}")),
        }
    } else {
        AssetSource::Inline(percent_decode(payload))
    }
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1), bytes.get(i + 2)) {
            (b'%', Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push(hex_value(hi) << 4 | hex_value(lo));
                i += 3;
            }
            (b, _, _) => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}
