use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::StepInput;
use super::registry::keys;

const FALLBACK_MIME: &str = "image/jpeg";

/// Documents captured during the upload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    IdFront,
    IdBack,
    Selfie,
    BankStatement,
    Payslip,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::IdFront,
        DocumentKind::IdBack,
        DocumentKind::Selfie,
        DocumentKind::BankStatement,
        DocumentKind::Payslip,
    ];

    pub const fn field_key(self) -> &'static str {
        match self {
            DocumentKind::IdFront => keys::ID_FRONT,
            DocumentKind::IdBack => keys::ID_BACK,
            DocumentKind::Selfie => keys::SELFIE,
            DocumentKind::BankStatement => keys::BANK_STATEMENT,
            DocumentKind::Payslip => keys::PAYSLIP,
        }
    }
}

/// Where a captured document currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    DataUri(String),
    Bytes {
        file_name: Option<String>,
        bytes: Vec<u8>,
    },
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedDocument {
    pub kind: DocumentKind,
    pub source: DocumentSource,
}

impl CapturedDocument {
    pub fn new(kind: DocumentKind, source: DocumentSource) -> Self {
        Self { kind, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {kind:?} from {path}: {source}")]
    Read {
        kind: DocumentKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{kind:?} is not an image or PDF data URI")]
    UnsupportedDataUri { kind: DocumentKind },
}

/// Convert one capture into a `data:` URI.
pub async fn encode_document(
    document: CapturedDocument,
) -> Result<(DocumentKind, String), DocumentError> {
    let CapturedDocument { kind, source } = document;

    let encoded = match source {
        DocumentSource::DataUri(uri) if is_document_uri(&uri) => uri.trim().to_string(),
        DocumentSource::DataUri(_) => return Err(DocumentError::UnsupportedDataUri { kind }),
        DocumentSource::Bytes { file_name, bytes } => {
            let mime = file_name
                .as_deref()
                .map(|name| mime_for(Path::new(name)))
                .unwrap_or(FALLBACK_MIME);
            to_data_uri(mime, &bytes)
        }
        DocumentSource::File(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| DocumentError::Read {
                    kind,
                    path: path.clone(),
                    source,
                })?;
            debug!(?kind, path = %path.display(), size = bytes.len(), "encoded captured document");
            to_data_uri(mime_for(&path), &bytes)
        }
    };

    Ok((kind, encoded))
}

/// Encode every capture concurrently; the first failure aborts the batch.
pub async fn encode_documents(
    documents: Vec<CapturedDocument>,
) -> Result<BTreeMap<DocumentKind, String>, DocumentError> {
    let encoded = try_join_all(documents.into_iter().map(encode_document)).await?;
    Ok(encoded.into_iter().collect())
}

/// Step input for the upload step built from encoded documents.
pub fn documents_input(encoded: BTreeMap<DocumentKind, String>) -> StepInput {
    encoded
        .into_iter()
        .map(|(kind, uri)| (kind.field_key().to_string(), uri))
        .collect()
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Values already carrying a `data:` prefix pass through; bare base64 is wrapped.
pub fn normalize_inline(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("data:") {
        trimmed.to_string()
    } else {
        format!("data:{FALLBACK_MIME};base64,{trimmed}")
    }
}

fn is_document_uri(uri: &str) -> bool {
    let uri = uri.trim_start();
    uri.starts_with("data:image/") || uri.starts_with("data:application/pdf")
}

fn mime_for(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .filter(|mime| mime.starts_with("image/") || *mime == "application/pdf")
        .unwrap_or(FALLBACK_MIME)
}
