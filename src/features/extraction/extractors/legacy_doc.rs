use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::features::extraction::error::ExtractionError;

/// Converts legacy Word `.doc` bytes into `.docx` bytes
#[async_trait]
pub trait DocConverter: Send + Sync {
    async fn to_docx(&self, doc_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError>;
}

/// Runs a headless LibreOffice inside a scratch directory
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    bin: PathBuf,
    timeout: Duration,
}

impl LibreOfficeConverter {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DocConverter for LibreOfficeConverter {
    async fn to_docx(&self, doc_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
        let workdir = tempfile::tempdir().map_err(|e| {
            ExtractionError::Transient(format!("Failed to create scratch directory: {}", e))
        })?;
        let input = workdir.path().join("input.doc");
        let output = workdir.path().join("input.docx");

        tokio::fs::write(&input, doc_bytes)
            .await
            .map_err(|e| ExtractionError::Transient(format!("Failed to write input: {}", e)))?;

        let mut cmd = Command::new(&self.bin);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(workdir.path())
            .arg(&input)
            .kill_on_drop(true);

        tracing::debug!(bin = %self.bin.display(), "Converting legacy document");

        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ExtractionError::Transient(format!(
                    "Converter timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ExtractionError::Transient(format!("Failed to run converter: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ExtractionError::Transient(format!(
                "Converter failed (exit {}): {}",
                result.status,
                stderr.trim()
            )));
        }

        tokio::fs::read(&output).await.map_err(|e| {
            ExtractionError::Transient(format!("Converter produced no output: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_transient() {
        let converter = LibreOfficeConverter::new(
            "/nonexistent/filevault-converter",
            Duration::from_secs(5),
        );
        let err = converter.to_docx(b"\xD0\xCF\x11\xE0").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_exit_without_output_is_transient() {
        let converter = LibreOfficeConverter::new("true", Duration::from_secs(5));
        let err = converter.to_docx(b"\xD0\xCF\x11\xE0").await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("no output"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_converter_is_transient() {
        let converter = LibreOfficeConverter::new("false", Duration::from_secs(5));
        let err = converter.to_docx(b"\xD0\xCF\x11\xE0").await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("Converter failed"));
    }
}
