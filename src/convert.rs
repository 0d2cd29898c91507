use std::{fs, io::Write, path::Path, process::Command};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task;
use tracing::{debug, warn};

pub const CONTENT_TYPE_PDF: &str = "application/pdf";
pub const CONTENT_TYPE_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const CONTENT_TYPE_PPT: &str = "application/vnd.ms-powerpoint";
pub const CONTENT_TYPE_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const CONTENT_TYPE_DOC: &str = "application/msword";
pub const CONTENT_TYPE_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CONTENT_TYPE_XLS: &str = "application/vnd.ms-excel";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported content type for PDF conversion: {0}")]
    Unsupported(String),
    #[error("converter binary not found: {0}")]
    BinaryMissing(String),
    #[error("pdf conversion failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    Presentation,
    WordProcessing,
    Spreadsheet,
    Pdf,
}

impl InputClass {
    /// Input file extension handed to the converter.
    fn extension(&self) -> &'static str {
        match self {
            InputClass::Presentation => "pptx",
            InputClass::WordProcessing => "docx",
            InputClass::Spreadsheet => "xlsx",
            InputClass::Pdf => "pdf",
        }
    }
}

/// Content-type dispatch for PDF conversion. Anything outside the four
/// supported families is rejected up front.
pub fn classify(content_type: &str) -> Result<InputClass, ConvertError> {
    match content_type {
        CONTENT_TYPE_PPTX | CONTENT_TYPE_PPT => Ok(InputClass::Presentation),
        CONTENT_TYPE_DOCX | CONTENT_TYPE_DOC => Ok(InputClass::WordProcessing),
        CONTENT_TYPE_XLSX | CONTENT_TYPE_XLS => Ok(InputClass::Spreadsheet),
        CONTENT_TYPE_PDF => Ok(InputClass::Pdf),
        other => Err(ConvertError::Unsupported(other.to_string())),
    }
}

#[async_trait]
pub trait PdfConverter: Send + Sync + 'static {
    async fn convert_to_pdf(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<u8>, ConvertError>;
}

/// Office-to-PDF conversion via a headless LibreOffice process. PDFs pass
/// through unchanged.
pub struct LibreOfficeConverter {
    binary: String,
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PdfConverter for LibreOfficeConverter {
    async fn convert_to_pdf(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<u8>, ConvertError> {
        let class = classify(content_type)?;
        debug!(content_type, ?class, "converting file to PDF");

        if class == InputClass::Pdf {
            return Ok(bytes);
        }

        let binary = self.binary.clone();
        task::spawn_blocking(move || run_soffice(&binary, &bytes, class))
            .await
            .map_err(|join_err| ConvertError::Failed(format!("conversion panicked: {join_err}")))?
    }
}

fn run_soffice(binary: &str, bytes: &[u8], class: InputClass) -> Result<Vec<u8>, ConvertError> {
    let workdir = tempfile::tempdir().map_err(|err| ConvertError::Failed(err.to_string()))?;
    let input_path = workdir.path().join(format!("input.{}", class.extension()));

    let mut input =
        fs::File::create(&input_path).map_err(|err| ConvertError::Failed(err.to_string()))?;
    input
        .write_all(bytes)
        .map_err(|err| ConvertError::Failed(err.to_string()))?;
    input
        .flush()
        .map_err(|err| ConvertError::Failed(err.to_string()))?;
    drop(input);

    let output = Command::new(binary)
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(workdir.path())
        .arg(&input_path)
        .output();

    match output {
        Ok(output) => {
            if !output.status.success() {
                warn!(status = %output.status, "soffice conversion failed");
                return Err(ConvertError::Failed(format!(
                    "soffice exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                )));
            }
            read_converted_pdf(workdir.path())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ConvertError::BinaryMissing(binary.to_string()))
        }
        Err(err) => Err(ConvertError::Failed(err.to_string())),
    }
}

fn read_converted_pdf(dir: &Path) -> Result<Vec<u8>, ConvertError> {
    let pdf_path = dir.join("input.pdf");
    fs::read(&pdf_path).map_err(|err| {
        ConvertError::Failed(format!("converted PDF missing at {}: {err}", pdf_path.display()))
    })
}
