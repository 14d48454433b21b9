use std::path::Path;

use anyhow::{Context, Result};

use super::AnalysisError;

/// A project document picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl PdfFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "projekt.pdf".into());
        let is_pdf = name.to_ascii_lowercase().ends_with(".pdf");

        Ok(Self {
            name,
            mime: is_pdf.then(|| "application/pdf".to_string()),
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn looks_like_pdf(&self) -> bool {
        self.mime.as_deref().is_some_and(|mime| mime.contains("pdf"))
            || self.name.to_ascii_lowercase().ends_with(".pdf")
    }

    /// Type, emptiness and size checks, run before anything touches the network.
    pub fn check(&self, max_bytes: u64) -> Result<(), AnalysisError> {
        if !self.looks_like_pdf() {
            return Err(AnalysisError::InvalidFile);
        }
        if self.bytes.is_empty() {
            return Err(AnalysisError::EmptyFile);
        }
        if self.size() > max_bytes {
            return Err(AnalysisError::TooLarge {
                size: self.size(),
                max: max_bytes,
            });
        }
        Ok(())
    }
}

/// `1536` becomes `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    let value = (value * 100.0).round() / 100.0;
    format!("{value} {}", UNITS[unit])
}
