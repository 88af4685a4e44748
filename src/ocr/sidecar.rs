//! HTTP OCR sidecar engine.

use serde::Deserialize;
use tracing::{debug, info};

use super::{PageImage, PassConfig, RecognitionEngine};
use crate::error::EngineError;

const DEFAULT_SIDECAR_URL: &str = "http://localhost:8884";

/// Sidecar response (private deserialization type).
#[derive(Debug, Deserialize)]
struct SidecarResponse {
    text: String,
}

pub struct SidecarEngine {
    url: String,
    client: reqwest::Client,
}

impl SidecarEngine {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Read `OCR_SIDECAR_URL`, falling back to the local default.
    pub fn from_env(client: reqwest::Client) -> Self {
        let url =
            std::env::var("OCR_SIDECAR_URL").unwrap_or_else(|_| DEFAULT_SIDECAR_URL.to_string());
        info!("SidecarEngine: using {}", url);
        Self::new(client, url)
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for SidecarEngine {
    fn name(&self) -> &str {
        "sidecar"
    }

    async fn recognize(
        &self,
        image: &PageImage,
        config: &PassConfig,
    ) -> Result<String, EngineError> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(image.data.clone())
            .file_name(image.filename.clone())
            .mime_str(image.mime_type())?;

        let mut form = Form::new()
            .part("file", part)
            .text("psm", config.segmentation.psm().to_string());
        if let Some(whitelist) = &config.whitelist {
            form = form.text("whitelist", whitelist.clone());
        }
        if let Some(dpi) = config.dpi {
            form = form.text("dpi", dpi.to_string());
        }

        debug!("SidecarEngine: pass '{}' -> {}/recognize", config.id, self.url);

        let response = self
            .client
            .post(format!("{}/recognize", self.url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        let raw = response.text().await?;
        let parsed: SidecarResponse =
            serde_json::from_str(&raw).map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(parsed.text)
    }
}
