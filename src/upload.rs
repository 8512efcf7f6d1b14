//! Upload batches and the size confirmation gate.

use std::path::Path;

use tracing::{debug, info};

use crate::gateway::{Gateway, GatewayError, UploadResponse};

/// Batches above this many megabytes need explicit confirmation.
pub const DEFAULT_CONFIRM_MB: f64 = 5.0;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after the final path component.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Files from one selection, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    pub files: Vec<FileBlob>,
    pub total_bytes: u64,
}

impl UploadBatch {
    pub fn new(files: Vec<FileBlob>) -> Self {
        let total_bytes = files.iter().map(FileBlob::size).sum();
        Self { files, total_bytes }
    }

    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Self> {
        let reads = paths.iter().map(|p| FileBlob::read(p.as_ref()));
        let files = futures::future::try_join_all(reads).await?;
        Ok(Self::new(files))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UploadDecision {
    Proceed,
    ConfirmationRequired { total_mb: f64 },
}

/// Decide whether a selection may be uploaded without asking first.
///
/// Exactly `threshold_mb` still proceeds; only strictly larger batches ask.
pub fn evaluate_upload(files: &[FileBlob], threshold_mb: f64) -> UploadDecision {
    let total_bytes: u64 = files.iter().map(FileBlob::size).sum();
    let total_mb = total_bytes as f64 / BYTES_PER_MB;

    if total_mb > threshold_mb {
        UploadDecision::ConfirmationRequired { total_mb }
    } else {
        UploadDecision::Proceed
    }
}

/// Result of submitting a batch through the guard.
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded(UploadResponse),
    NeedsConfirmation(PendingUpload),
}

/// A batch held back for confirmation.
///
/// Confirming consumes it and uploads the exact same files; the size is not
/// checked again.
#[derive(Debug)]
pub struct PendingUpload {
    batch: UploadBatch,
    total_mb: f64,
}

impl PendingUpload {
    pub fn total_mb(&self) -> f64 {
        self.total_mb
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    pub async fn confirm(self, gateway: &Gateway) -> Result<UploadResponse, GatewayError> {
        info!(files = self.batch.len(), total_mb = self.total_mb, "large upload confirmed");
        gateway.upload(self.batch).await
    }
}

/// Policy gate in front of [`Gateway::upload`].
#[derive(Debug, Clone, Copy)]
pub struct UploadGuard {
    threshold_mb: f64,
}

impl Default for UploadGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_MB)
    }
}

impl UploadGuard {
    pub fn new(threshold_mb: f64) -> Self {
        Self { threshold_mb }
    }

    pub fn evaluate(&self, batch: &UploadBatch) -> UploadDecision {
        evaluate_upload(&batch.files, self.threshold_mb)
    }

    pub async fn submit(
        &self,
        gateway: &Gateway,
        batch: UploadBatch,
    ) -> Result<UploadOutcome, GatewayError> {
        match self.evaluate(&batch) {
            UploadDecision::Proceed => {
                debug!(files = batch.len(), bytes = batch.total_bytes, "uploading batch");
                gateway.upload(batch).await.map(UploadOutcome::Uploaded)
            }
            UploadDecision::ConfirmationRequired { total_mb } => {
                debug!(total_mb, "upload needs confirmation");
                Ok(UploadOutcome::NeedsConfirmation(PendingUpload { batch, total_mb }))
            }
        }
    }
}
