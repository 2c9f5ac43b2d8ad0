//! File intake: type/size checks, preview rendering, batch processing.

use std::{
    fmt,
    io::Cursor,
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use image::ImageFormat;
use shared::{
    catalog::DocumentTypeDescriptor,
    domain::{DocumentId, DocumentKind},
};
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

const PREVIEW_MAX_DIMENSION: u32 = 320;

/// A file as handed over by the picker or drop zone.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.mime_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

impl fmt::Debug for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub file: RawFile,
    pub preview_data_uri: Option<String>,
}

impl UploadedDocument {
    pub fn document_type_key(&self) -> &'static str {
        self.kind.key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("{filename}: unsupported file type '{mime_type}'; upload a JPEG, PNG, GIF, WebP or PDF")]
    UnsupportedType { filename: String, mime_type: String },
    #[error("{filename}: {size} bytes exceeds the {max} byte limit for {slot}")]
    TooLarge {
        filename: String,
        slot: DocumentKind,
        size: u64,
        max: u64,
    },
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to render preview: {0}")]
    Image(#[from] image::ImageError),
    #[error("preview worker did not finish: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Hands out document ids. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct DocumentIds(Arc<AtomicI64>);

impl DocumentIds {
    pub fn next_id(&self) -> DocumentId {
        DocumentId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Abort handles for the preview workers of one batch.
#[derive(Debug, Clone, Default)]
pub struct PreviewTasks {
    handles: Arc<Mutex<Vec<AbortHandle>>>,
    cancelled: Arc<AtomicBool>,
}

impl PreviewTasks {
    fn register(&self, handle: AbortHandle) {
        if self.is_cancelled() {
            handle.abort();
            return;
        }
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    pub fn abort_all(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let handles =
            std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub slot: DocumentKind,
    pub accepted: Vec<UploadedDocument>,
    pub rejected: Vec<IntakeError>,
    /// Set when the batch was aborted; its documents must not be merged.
    pub cancelled: bool,
}

pub fn check_file(file: &RawFile, descriptor: &DocumentTypeDescriptor) -> Result<(), IntakeError> {
    if !descriptor.accepts_mime(&file.mime_type) {
        return Err(IntakeError::UnsupportedType {
            filename: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }
    if file.size() > descriptor.max_bytes {
        return Err(IntakeError::TooLarge {
            filename: file.name.clone(),
            slot: descriptor.kind,
            size: file.size(),
            max: descriptor.max_bytes,
        });
    }
    Ok(())
}

/// Decodes an image, shrinks it to a thumbnail and encodes it as a PNG
/// data URI.
pub fn render_preview(bytes: &[u8]) -> Result<String, PreviewError> {
    let decoded = image::load_from_memory(bytes)?;
    let thumbnail = decoded.thumbnail(PREVIEW_MAX_DIMENSION, PREVIEW_MAX_DIMENSION);
    let mut out = Cursor::new(Vec::new());
    thumbnail.write_to(&mut out, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(out.into_inner())
    ))
}

async fn generate_preview(file: &RawFile, tasks: &PreviewTasks) -> Result<String, PreviewError> {
    let bytes = Arc::clone(&file.bytes);
    let handle = tokio::task::spawn_blocking(move || render_preview(&bytes));
    tasks.register(handle.abort_handle());
    handle.await?
}

async fn intake_tracked(
    file: RawFile,
    descriptor: &DocumentTypeDescriptor,
    id: DocumentId,
    tasks: &PreviewTasks,
) -> Result<UploadedDocument, IntakeError> {
    check_file(&file, descriptor)?;

    let preview_data_uri = if file.is_image() {
        match generate_preview(&file, tasks).await {
            Ok(uri) => Some(uri),
            Err(error) => {
                warn!(
                    slot = %descriptor.kind,
                    filename = %file.name,
                    %error,
                    "preview generation failed; accepting document without preview"
                );
                None
            }
        }
    } else {
        None
    };

    Ok(UploadedDocument {
        id,
        kind: descriptor.kind,
        file,
        preview_data_uri,
    })
}

/// Validates one file against its slot and renders a preview for images.
/// A failed preview never rejects the file.
pub async fn intake_file(
    file: RawFile,
    descriptor: &DocumentTypeDescriptor,
    id: DocumentId,
) -> Result<UploadedDocument, IntakeError> {
    intake_tracked(file, descriptor, id, &PreviewTasks::default()).await
}

/// Processes every file of a batch concurrently. Rejected files are
/// reported individually and do not affect their siblings.
pub async fn intake_batch(
    files: Vec<RawFile>,
    descriptor: &DocumentTypeDescriptor,
    ids: &DocumentIds,
    tasks: &PreviewTasks,
) -> BatchOutcome {
    let results = join_all(
        files
            .into_iter()
            .map(|file| intake_tracked(file, descriptor, ids.next_id(), tasks)),
    )
    .await;

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for result in results {
        match result {
            Ok(document) => accepted.push(document),
            Err(error) => {
                warn!(slot = %descriptor.kind, %error, "rejected uploaded file");
                rejected.push(error);
            }
        }
    }

    let cancelled = tasks.is_cancelled();
    debug!(
        slot = %descriptor.kind,
        accepted = accepted.len(),
        rejected = rejected.len(),
        cancelled,
        "intake batch finished"
    );

    BatchOutcome {
        slot: descriptor.kind,
        accepted,
        rejected,
        cancelled,
    }
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
