//! Single-document upload.
//!
//! Size and type are checked locally before any network call, so an
//! oversized file never reaches the remote store. [`UploadForm`] holds the
//! "selected file + title" state of the add-paper form.

use std::path::Path;

use crate::error::{CorpusError, CorpusResult};
use crate::models::UploadRequest;
use crate::store::PaperStore;

/// Client-side upload ceiling (15 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// Extensions the remote ingestion endpoint understands.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "csv", "txt"];

/// Last path component of `name`, accepting both separators.
pub fn base_name(name: &str) -> &str {
    name.rsplit(&['/', '\\'][..]).next().unwrap_or(name)
}

/// Lower-cased extension of the file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    let base = base_name(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// File name with its last extension stripped: `"a.b.pdf"` → `"a.b"`.
pub fn title_from_file_name(name: &str) -> String {
    let base = base_name(name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// MIME type sent with the multipart file part.
pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn check_size(file_name: &str, len: u64, max_bytes: u64) -> CorpusResult<()> {
    if len > max_bytes {
        return Err(CorpusError::PayloadTooLarge(format!(
            "{} is too large ({}). Maximum allowed size is {}.",
            base_name(file_name),
            format_size(len),
            format_size(max_bytes)
        )));
    }
    Ok(())
}

pub fn check_extension(file_name: &str, allowed: &[String]) -> CorpusResult<()> {
    match extension_of(file_name) {
        Some(ext) if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => Ok(()),
        _ => Err(CorpusError::UnsupportedFileType(format!(
            "{} (supported: {})",
            base_name(file_name),
            allowed.join(", ")
        ))),
    }
}

fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Read a file for upload. The size is checked from metadata first so an
/// oversized file is never read into memory.
pub async fn read_upload(path: &Path, title: Option<String>, max_bytes: u64) -> CorpusResult<UploadRequest> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let len = tokio::fs::metadata(path).await?.len();
    check_size(&file_name, len, max_bytes)?;
    let bytes = tokio::fs::read(path).await?;
    Ok(UploadRequest::new(file_name, bytes, title))
}

/// State of the add-paper form: the chosen file and its title.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    file: Option<UploadRequest>,
    title: String,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose a file. An empty title is filled from the file name.
    pub fn select(&mut self, file_name: &str, bytes: Vec<u8>) {
        if self.title.trim().is_empty() {
            self.title = title_from_file_name(file_name);
        }
        self.file = Some(UploadRequest::new(file_name, bytes, None));
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn selected_file(&self) -> Option<&UploadRequest> {
        self.file.as_ref()
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.title.clear();
    }

    /// Upload the selected file.
    ///
    /// Success clears the form. A local size or type rejection clears the
    /// selected file (the title stays). Remote failures leave the form as is
    /// so the user can retry.
    pub async fn submit(
        &mut self,
        store: &dyn PaperStore,
        max_bytes: u64,
        allowed: &[String],
    ) -> CorpusResult<String> {
        let Some(file) = self.file.as_ref() else {
            return Err(CorpusError::InvalidSelection(
                "Please select a file to upload".to_string(),
            ));
        };

        let local = check_size(&file.file_name, file.len(), max_bytes)
            .and_then(|_| check_extension(&file.file_name, allowed));
        if let Err(e) = local {
            self.file = None;
            return Err(e);
        }

        let title = self.title.trim();
        let request = UploadRequest {
            title: (!title.is_empty()).then(|| title.to_string()),
            ..file.clone()
        };
        tracing::debug!(file = %request.file_name, bytes = request.len(), "uploading");
        let message = store.upload(&request).await?;
        self.clear();
        Ok(message)
    }
}
