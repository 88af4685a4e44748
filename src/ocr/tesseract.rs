//! Local tesseract binary engine.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{PageImage, PassConfig, RecognitionEngine};
use crate::error::EngineError;

pub struct TesseractCliEngine {
    binary: String,
    language: String,
}

impl TesseractCliEngine {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// Read `TESSERACT_BIN` and `TESSERACT_LANG`.
    pub fn from_env() -> Self {
        let binary = std::env::var("TESSERACT_BIN").unwrap_or_else(|_| "tesseract".to_string());
        let language = std::env::var("TESSERACT_LANG").unwrap_or_else(|_| "eng".to_string());
        Self::new(binary, language)
    }

    /// Command-line arguments for one pass; image on stdin, text on stdout.
    pub fn args(&self, config: &PassConfig) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            config.segmentation.psm().to_string(),
        ];
        if let Some(dpi) = config.dpi {
            args.push("--dpi".to_string());
            args.push(dpi.to_string());
        }
        if let Some(whitelist) = &config.whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", whitelist));
        }
        args
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for TesseractCliEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(
        &self,
        image: &PageImage,
        config: &PassConfig,
    ) -> Result<String, EngineError> {
        let args = self.args(config);
        debug!("TesseractCliEngine: pass '{}' args {:?}", config.id, args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&image.data).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(EngineError::Process(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|e| EngineError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_for_whitelist_pass() {
        let engine = TesseractCliEngine::new("tesseract", "eng");
        let args = engine.args(&PassConfig::block_vin_whitelist());
        assert_eq!(&args[..6], &["stdin", "stdout", "-l", "eng", "--psm", "6"]);
        assert_eq!(args[6], "-c");
        assert!(args[7].starts_with("tessedit_char_whitelist=ABC"));
    }

    #[test]
    fn test_args_for_dpi_pass() {
        let engine = TesseractCliEngine::new("tesseract", "eng");
        let args = engine.args(&PassConfig::auto_high_res());
        assert_eq!(args[5], "3");
        assert_eq!(&args[6..], &["--dpi", "300"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let engine = TesseractCliEngine::new("/nonexistent/tesseract-binary", "eng");
        let image = PageImage::from_bytes(
            "p.png",
            vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0],
        )
        .unwrap();
        let result = engine.recognize(&image, &PassConfig::fallback()).await;
        assert!(matches!(result, Err(EngineError::Io(_))));
    }
}
