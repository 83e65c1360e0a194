//! Bulk ingestion of a zip archive of documents.
//!
//! Coordinates the flow: decode archive → filter members → upload each
//! member as a single document → summarize. Per-member failures never abort
//! the run; they are collected into [`IngestSummary::failed`] and the
//! remaining members are still attempted.
//!
//! Uploads go through a bounded queue (`futures` `buffered`), so results
//! always come back in archive order whatever the concurrency limit.

use std::io::{Cursor, Read};

use futures::stream::{self, StreamExt};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use zip::ZipArchive;

use crate::error::{CorpusError, CorpusResult};
use crate::models::UploadRequest;
use crate::notify::Notification;
use crate::progress::{percent, IngestProgressEvent, IngestProgressReporter};
use crate::store::PaperStore;
use crate::upload::{base_name, check_size, title_from_file_name};

/// Paths produced by macOS archivers that never hold real documents.
const METADATA_GLOBS: [&str; 2] = ["**/__MACOSX/**", "**/._*"];

/// Decides which archive members are uploaded.
pub struct MemberFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl MemberFilter {
    /// Accept members whose extension is in `extensions` (case-insensitive),
    /// minus macOS metadata.
    pub fn new(extensions: &[String]) -> Result<Self, globset::Error> {
        let mut include = GlobSetBuilder::new();
        for ext in extensions {
            include.add(glob(&format!("**/*.{}", ext))?);
        }
        let mut exclude = GlobSetBuilder::new();
        for pattern in METADATA_GLOBS {
            exclude.add(glob(pattern)?);
        }
        Ok(Self {
            include: include.build()?,
            exclude: exclude.build()?,
        })
    }

    pub fn accepts(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn glob(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
}

/// A kept archive member, before its bytes are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub path: String,
    pub file_name: String,
    pub title: String,
    pub size: u64,
}

/// Kept members in archive order.
pub fn list_members<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    filter: &MemberFilter,
) -> CorpusResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let file = archive
            .by_index_raw(index)
            .map_err(|e| CorpusError::InvalidArchive(e.to_string()))?;
        if file.is_dir() {
            continue;
        }
        let path = file.name().to_string();
        if !filter.accepts(&path) {
            tracing::debug!(%path, "skipping archive member");
            continue;
        }
        let file_name = base_name(&path).to_string();
        entries.push(ArchiveEntry {
            index,
            title: title_from_file_name(&file_name),
            file_name,
            path,
            size: file.size(),
        });
    }
    Ok(entries)
}

fn read_member<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    entry: &ArchiveEntry,
    max_bytes: u64,
) -> CorpusResult<Vec<u8>> {
    check_size(&entry.file_name, entry.size, max_bytes)?;
    let mut file = archive
        .by_index(entry.index)
        .map_err(|e| CorpusError::InvalidArchive(format!("{}: {}", entry.path, e)))?;
    let mut bytes = Vec::with_capacity(entry.size as usize);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// A member whose upload failed, with the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedItem>,
}

impl IngestSummary {
    /// One notification for the whole run: a success with the count, or a
    /// single error naming every failed file.
    pub fn notification(&self) -> Notification {
        if self.failed.is_empty() {
            return Notification::success(format!(
                "Successfully uploaded {} papers",
                self.succeeded
            ));
        }
        let names: Vec<String> = self
            .failed
            .iter()
            .map(|f| format!("{} ({})", f.name, f.error))
            .collect();
        Notification::error(format!(
            "Uploaded {} of {} papers. Failed: {}",
            self.succeeded,
            self.total,
            names.join(", ")
        ))
    }
}

/// Uploads every supported member of an archive.
pub struct IngestPipeline<'a> {
    store: &'a dyn PaperStore,
    filter: &'a MemberFilter,
    reporter: &'a dyn IngestProgressReporter,
    max_bytes: u64,
    concurrency: usize,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(
        store: &'a dyn PaperStore,
        filter: &'a MemberFilter,
        reporter: &'a dyn IngestProgressReporter,
        max_bytes: u64,
    ) -> Self {
        Self {
            store,
            filter,
            reporter,
            max_bytes,
            concurrency: 1,
        }
    }

    /// Bound on in-flight uploads (at least 1).
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Ingest `archive`. Only archive-level problems are errors
    /// (`InvalidArchive`, `EmptyArchive`); everything per member lands in
    /// the summary.
    pub async fn ingest(&self, archive: &[u8]) -> CorpusResult<IngestSummary> {
        let mut zip = ZipArchive::new(Cursor::new(archive))
            .map_err(|e| CorpusError::InvalidArchive(e.to_string()))?;
        let members = list_members(&mut zip, self.filter)?;
        if members.is_empty() {
            return Err(CorpusError::EmptyArchive);
        }

        let total = members.len();
        tracing::info!(total, "ingesting archive");
        self.reporter.report(IngestProgressEvent::Started {
            total: total as u64,
        });

        let store = self.store;
        let max_bytes = self.max_bytes;
        let uploads = stream::iter(members)
            .map(|entry| {
                let loaded = read_member(&mut zip, &entry, max_bytes);
                async move {
                    let outcome = match loaded {
                        Ok(bytes) => {
                            let request = UploadRequest::new(
                                entry.file_name.clone(),
                                bytes,
                                Some(entry.title.clone()),
                            );
                            store.upload(&request).await.map(|_| ())
                        }
                        Err(e) => Err(e),
                    };
                    (entry, outcome)
                }
            })
            .buffered(self.concurrency);
        futures::pin_mut!(uploads);

        let mut summary = IngestSummary {
            total,
            ..Default::default()
        };
        let mut processed = 0u64;
        while let Some((entry, outcome)) = uploads.next().await {
            processed += 1;
            let ok = outcome.is_ok();
            match outcome {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    tracing::warn!(file = %entry.path, error = %e, "upload failed");
                    summary.failed.push(FailedItem {
                        name: entry.file_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
            self.reporter.report(IngestProgressEvent::Advanced {
                processed,
                total: total as u64,
                percent: percent(processed, total as u64),
                name: entry.file_name,
                ok,
            });
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "archive ingested"
        );
        Ok(summary)
    }
}
