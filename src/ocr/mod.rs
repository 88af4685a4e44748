//! Recognition engine abstraction.
//!
//! Defines the [`RecognitionEngine`] trait and the per-pass configuration so
//! different OCR backends (HTTP sidecar, local tesseract binary) can be swapped
//! via the `OCR_ENGINE` environment variable.

pub mod orchestrator;
pub mod sidecar;
pub mod tesseract;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ImageError};

/// Characters allowed by the restricted-alphabet pass.
pub const VIN_PLATE_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// Page segmentation strategy handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegmentation {
    Block,
    Auto,
    Sparse,
}

impl PageSegmentation {
    /// Tesseract page segmentation mode number.
    pub fn psm(&self) -> u8 {
        match self {
            PageSegmentation::Block => 6,
            PageSegmentation::Auto => 3,
            PageSegmentation::Sparse => 11,
        }
    }
}

/// One recognition configuration variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    pub id: String,
    pub segmentation: PageSegmentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<String>,
    /// Resolution hint in dots per inch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
}

impl PassConfig {
    /// Restricted alphabet over uniform blocks of text.
    pub fn block_vin_whitelist() -> Self {
        Self {
            id: "block_vin_whitelist".to_string(),
            segmentation: PageSegmentation::Block,
            whitelist: Some(VIN_PLATE_WHITELIST.to_string()),
            dpi: None,
        }
    }

    /// Automatic segmentation with a high resolution hint.
    pub fn auto_high_res() -> Self {
        Self {
            id: "auto_high_res".to_string(),
            segmentation: PageSegmentation::Auto,
            whitelist: None,
            dpi: Some(300),
        }
    }

    /// Sparse text, for scattered form fields.
    pub fn sparse_text() -> Self {
        Self {
            id: "sparse_text".to_string(),
            segmentation: PageSegmentation::Sparse,
            whitelist: None,
            dpi: None,
        }
    }

    /// Engine defaults, used when every configured pass failed.
    pub fn fallback() -> Self {
        Self {
            id: "fallback".to_string(),
            segmentation: PageSegmentation::Auto,
            whitelist: None,
            dpi: None,
        }
    }
}

impl Default for PassConfig {
    fn default() -> Self {
        Self::fallback()
    }
}

/// The default ordered set of passes.
pub fn default_passes() -> Vec<PassConfig> {
    vec![
        PassConfig::block_vin_whitelist(),
        PassConfig::auto_high_res(),
        PassConfig::sparse_text(),
    ]
}

/// Raw text from one successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionPass {
    pub configuration_id: String,
    pub raw_text: String,
}

/// A validated page image.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub filename: String,
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl PageImage {
    /// Accept bytes only if they look like a supported bitmap encoding.
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Result<Self, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        let format =
            image::guess_format(&data).map_err(|e| ImageError::Unsupported(e.to_string()))?;
        match format {
            ImageFormat::Png
            | ImageFormat::Jpeg
            | ImageFormat::Bmp
            | ImageFormat::Tiff
            | ImageFormat::WebP
            | ImageFormat::Gif => Ok(Self {
                filename: filename.into(),
                data,
                format,
            }),
            other => Err(ImageError::Unsupported(format!("{:?}", other))),
        }
    }

    /// MIME type for upload to the engine.
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            _ => "application/octet-stream",
        }
    }
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    fn name(&self) -> &str;
    async fn recognize(
        &self,
        image: &PageImage,
        config: &PassConfig,
    ) -> Result<String, EngineError>;
}

/// Known engine identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Sidecar,
    Tesseract,
}

impl EngineKind {
    /// Parse an `OCR_ENGINE` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sidecar" => Some(Self::Sidecar),
            "tesseract" => Some(Self::Tesseract),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_default_passes_are_distinct() {
        let passes = default_passes();
        assert_eq!(passes.len(), 3);
        assert_eq!(passes[0].segmentation.psm(), 6);
        assert_eq!(passes[1].segmentation.psm(), 3);
        assert_eq!(passes[2].segmentation.psm(), 11);
        assert!(passes[0].whitelist.is_some());
        assert_eq!(passes[1].dpi, Some(300));
    }

    #[test]
    fn test_pass_config_json() {
        let pass: PassConfig =
            serde_json::from_str(r#"{"id": "x", "segmentation": "sparse"}"#).unwrap();
        assert_eq!(pass.segmentation, PageSegmentation::Sparse);
        assert_eq!(pass.whitelist, None);
    }

    #[test]
    fn test_page_image_detects_png() {
        let image = PageImage::from_bytes("title.png", PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_page_image_rejects_garbage() {
        assert!(matches!(
            PageImage::from_bytes("a.txt", b"plain text".to_vec()),
            Err(ImageError::Unsupported(_))
        ));
        assert!(matches!(
            PageImage::from_bytes("a.png", Vec::new()),
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn test_engine_kind() {
        assert_eq!(EngineKind::parse("Sidecar"), Some(EngineKind::Sidecar));
        assert_eq!(EngineKind::parse("tesseract"), Some(EngineKind::Tesseract));
        assert_eq!(EngineKind::parse("mistral"), None);
    }
}
