//! Context file registry
//!
//! Mirrors the server's list of uploaded CSV files. The list is only ever
//! replaced by a fresh server listing, except for deletes, which remove the
//! deleted name locally as soon as the server confirms.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::{Applied, ClientContext};
use crate::error::{ClientError, ClientResult, PreconditionError};
use crate::sequence::Sequencer;

const LIST_FALLBACK: &str = "Failed to fetch files.";
const LIST_ALERT: &str = "Failed to fetch files. Please try again.";
const UPLOAD_OK: &str = "Upload successful.";
const UPLOAD_FALLBACK: &str = "Upload failed.";
const UPLOAD_ALERT: &str = "Upload failed. Please try again.";
const DELETE_OK: &str = "Delete successful.";
const DELETE_FALLBACK: &str = "Delete failed.";
const DELETE_ALERT: &str = "Delete failed. Please try again.";

/// A file picked for upload
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            bytes: Arc::from(bytes),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Upload gate: the name must end in `.csv`, any case.
pub fn is_csv_file_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRegistryState {
    pub files: Vec<String>,
    pub selected: Option<SelectedFile>,
    pub is_uploading: bool,
    pub status: String,
}

#[derive(Default)]
struct Inner {
    state: FileRegistryState,
    uploads_in_flight: usize,
    lists: Sequencer,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

/// Holds the uploading flag up for as long as it lives.
struct UploadGuard<'a> {
    inner: &'a Mutex<Inner>,
}

impl<'a> UploadGuard<'a> {
    fn begin(inner: &'a Mutex<Inner>) -> Self {
        let mut guard = lock(inner);
        guard.uploads_in_flight += 1;
        guard.state.is_uploading = true;
        guard.state.status.clear();
        Self { inner }
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        let mut guard = lock(self.inner);
        guard.uploads_in_flight = guard.uploads_in_flight.saturating_sub(1);
        guard.state.is_uploading = guard.uploads_in_flight > 0;
    }
}

pub struct FileRegistryController {
    ctx: ClientContext,
    inner: Mutex<Inner>,
}

impl FileRegistryController {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn snapshot(&self) -> FileRegistryState {
        lock(&self.inner).state.clone()
    }

    pub fn files(&self) -> Vec<String> {
        lock(&self.inner).state.files.clone()
    }

    pub fn status(&self) -> String {
        lock(&self.inner).state.status.clone()
    }

    pub fn is_uploading(&self) -> bool {
        lock(&self.inner).state.is_uploading
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        lock(&self.inner).state.selected.clone()
    }

    pub fn select_file(&self, file: SelectedFile) {
        lock(&self.inner).state.selected = Some(file);
    }

    pub fn clear_selection(&self) {
        lock(&self.inner).state.selected = None;
    }

    /// Initial population; call once when the registry is first shown.
    pub async fn mount(&self) -> ClientResult<Applied> {
        self.refresh_file_list().await
    }

    pub async fn refresh_file_list(&self) -> ClientResult<Applied> {
        let result = self.list_once().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "listing context files failed");
            self.report(err, LIST_FALLBACK, LIST_ALERT);
        }
        result
    }

    async fn list_once(&self) -> ClientResult<Applied> {
        let auth = self.ctx.authorize()?;
        let ticket = lock(&self.inner).lists.issue();

        let files = self
            .ctx
            .gateway
            .list_files(&auth)
            .await?
            .into_result(|status| format!("Failed with status {}", status))?
            .files;

        let mut inner = lock(&self.inner);
        if !inner.lists.try_apply(ticket) {
            tracing::debug!(ticket = ticket.value(), "discarding stale file list");
            return Ok(Applied::Stale);
        }
        tracing::info!(count = files.len(), "context file list refreshed");
        inner.state.files = files;
        Ok(Applied::Yes)
    }

    /// Uploads the selected file, then re-lists to pick up the server's view.
    pub async fn upload_file(&self) -> ClientResult<()> {
        let file = match self.checked_selection() {
            Ok(file) => file,
            Err(err) => {
                self.ctx.alerts.error(err.to_string());
                return Err(err.into());
            }
        };

        let auth = match self.ctx.authorize() {
            Ok(auth) => auth,
            Err(err) => {
                self.report(&err, UPLOAD_FALLBACK, UPLOAD_ALERT);
                return Err(err);
            }
        };

        let result = {
            let _busy = UploadGuard::begin(&self.inner);
            match self.ctx.gateway.upload_file(&auth, &file).await {
                Ok(reply) => reply.into_result(|status| format!("Upload failed with status {}", status)),
                Err(err) => Err(ClientError::from(err)),
            }
        };

        if let Err(err) = result {
            tracing::warn!(file = %file.name, error = %err, "upload failed");
            self.report(&err, UPLOAD_FALLBACK, UPLOAD_ALERT);
            return Err(err);
        }

        tracing::info!(file = %file.name, bytes = file.len(), "uploaded context file");
        {
            let mut inner = lock(&self.inner);
            inner.state.status = UPLOAD_OK.to_string();
            let same_selection = inner
                .state
                .selected
                .as_ref()
                .is_some_and(|s| Arc::ptr_eq(&s.bytes, &file.bytes));
            if same_selection {
                inner.state.selected = None;
            }
        }

        // A failed re-list reports itself; the upload still succeeded.
        let _ = self.refresh_file_list().await;
        Ok(())
    }

    fn checked_selection(&self) -> Result<SelectedFile, PreconditionError> {
        let file = self
            .selected_file()
            .ok_or(PreconditionError::NoFileSelected)?;
        if !is_csv_file_name(&file.name) {
            return Err(PreconditionError::NotCsv { name: file.name });
        }
        Ok(file)
    }

    pub async fn delete_file(&self, name: &str) -> ClientResult<()> {
        match self.delete_once(name).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(file = name, error = %err, "delete failed");
                self.report(&err, DELETE_FALLBACK, DELETE_ALERT);
                Err(err)
            }
        }
    }

    async fn delete_once(&self, name: &str) -> ClientResult<()> {
        let auth = self.ctx.authorize()?;
        let receipt = self
            .ctx
            .gateway
            .delete_file(&auth, name)
            .await?
            .into_result(|status| format!("Delete failed with status {}", status))?;

        let mut inner = lock(&self.inner);
        inner.state.files.retain(|f| f != name);
        // Listings already in flight may predate this delete.
        inner.lists.raise_floor();
        inner.state.status = receipt.message.unwrap_or_else(|| DELETE_OK.to_string());
        tracing::info!(file = name, "deleted context file");
        Ok(())
    }

    fn report(&self, err: &ClientError, fallback: &str, alert: &str) {
        lock(&self.inner).state.status = err.status_text(fallback);
        match err {
            ClientError::Unauthenticated => self.ctx.alerts.error(err.to_string()),
            _ => self.ctx.alerts.error(alert),
        }
    }
}
