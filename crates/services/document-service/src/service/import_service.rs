//! Bulk import of tabular files.
//!
//! [`ImportService`] stages an upload on disk and hands an [`ImportJob`] to
//! the [`ImportWorker`] over a channel. The worker holds its own registry,
//! parses rows on a blocking thread and inserts them in batches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use common::{AppError, AppResult, ImportConfig};
use domain::Entity;

use crate::repository::{
    EntityInput, JobListingRepository, RepositoryRegistry, RepositoryType,
};

const CSV_EXTENSION: &str = ".csv";

/// Content types with a known file extension.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[("text/csv", CSV_EXTENSION)];

/// Extensions the worker can read.
const SUPPORTED_EXTENSIONS: &[&str] = &[CSV_EXTENSION];

/// Repository an import writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportTarget {
    JobListings,
}

/// Immutable description of one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub file_path: PathBuf,
    pub content_type: Option<String>,
    pub file_extension: String,
    pub batch_size: usize,
    pub target: ImportTarget,
}

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub job_id: Uuid,
    pub target: ImportTarget,
    pub imported: usize,
    /// Rows that failed to parse or validate
    pub skipped: usize,
}

/// Joined suffixes of the file name, e.g. `.tar.gz`.
fn file_suffixes(file_name: &str) -> Option<String> {
    let name = Path::new(file_name).file_name()?.to_str()?;
    let mut parts = name.trim_start_matches('.').split('.');
    parts.next();

    let suffixes: String = parts
        .filter(|p| !p.is_empty())
        .map(|p| format!(".{}", p.to_lowercase()))
        .collect();
    (!suffixes.is_empty()).then_some(suffixes)
}

/// Resolve the staged file's extension.
///
/// A known content type wins; otherwise the file name's suffixes decide.
pub fn resolve_extension(file_name: Option<&str>, content_type: Option<&str>) -> AppResult<String> {
    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase())
        .filter(|ct| !ct.is_empty());

    if let Some(ct) = &content_type {
        if let Some((_, ext)) = CONTENT_TYPE_EXTENSIONS.iter().find(|(known, _)| *known == ct.as_str()) {
            return Ok(ext.to_string());
        }
    }

    let file_name_str = file_name.unwrap_or_default().to_string();
    match (file_name.and_then(file_suffixes), content_type) {
        (Some(ext), _) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        (Some(ext), _) => Err(AppError::UnknownFileExtension {
            file_name: file_name_str,
            extension: ext,
        }),
        (None, Some(ct)) => Err(AppError::UnknownContentType {
            file_name: file_name_str,
            content_type: ct,
        }),
        (None, None) => Err(AppError::FileTypeNotProvided),
    }
}

/// Accepts uploads and queues them for the worker.
#[derive(Clone)]
pub struct ImportService {
    config: ImportConfig,
    jobs: mpsc::Sender<ImportJob>,
}

impl ImportService {
    pub fn new(config: ImportConfig, jobs: mpsc::Sender<ImportJob>) -> Self {
        Self { config, jobs }
    }

    /// Stage `stream` as `<temp folder>/<job id><ext>` and queue the job.
    pub async fn import_file<S, E>(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        stream: S,
        target: ImportTarget,
    ) -> AppResult<ImportJob>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display + Send,
    {
        let file_extension = resolve_extension(file_name, content_type)?;

        fs::create_dir_all(&self.config.temp_folder).await?;
        let id = Uuid::new_v4();
        let file_path = self
            .config
            .temp_folder
            .join(format!("{}{}", id.simple(), file_extension));

        let mut file = fs::File::create(&file_path).await?;
        let mut written = 0usize;
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let message = format!("Upload interrupted: {}", e);
                    drop(file);
                    remove_staged(&file_path).await;
                    return Err(AppError::BadRequest(message));
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        let job = ImportJob {
            id,
            file_path,
            content_type: content_type.map(str::to_string),
            file_extension,
            batch_size: self.config.default_batch_size,
            target,
        };

        if self.jobs.send(job.clone()).await.is_err() {
            remove_staged(&job.file_path).await;
            return Err(AppError::internal("Import worker is not running"));
        }
        info!(
            "Import job {} queued for {:?}: {} bytes staged at {}",
            job.id,
            job.target,
            written,
            job.file_path.display()
        );

        Ok(job)
    }
}

async fn remove_staged(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Could not remove staged file {}: {}", path.display(), e);
    }
}

/// Background consumer of import jobs.
pub struct ImportWorker {
    registry: Arc<RepositoryRegistry>,
    jobs: mpsc::Receiver<ImportJob>,
    reports: Option<mpsc::UnboundedSender<ImportReport>>,
}

impl ImportWorker {
    /// `registry` should be dedicated to the worker.
    pub fn new(registry: Arc<RepositoryRegistry>, jobs: mpsc::Receiver<ImportJob>) -> Self {
        Self {
            registry,
            jobs,
            reports: None,
        }
    }

    /// Publish a report for every finished job.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<ImportReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process jobs until every sender is dropped.
    pub async fn run(mut self) {
        info!("Import worker started");
        while let Some(job) = self.jobs.recv().await {
            match self.process(&job).await {
                Ok(report) => {
                    info!(
                        "Import job {} finished: {} imported, {} skipped",
                        report.job_id, report.imported, report.skipped
                    );
                    if let Some(reports) = &self.reports {
                        // Nobody listening is fine
                        let _ = reports.send(report);
                    }
                }
                Err(e) => error!("Import job {} failed: {}", job.id, e),
            }
            remove_staged(&job.file_path).await;
        }
        info!("Import worker stopped");
    }

    /// Run one job to completion.
    pub async fn process(&self, job: &ImportJob) -> AppResult<ImportReport> {
        if !SUPPORTED_EXTENSIONS.contains(&job.file_extension.as_str()) {
            return Err(AppError::UnknownFileExtension {
                file_name: job.file_path.display().to_string(),
                extension: job.file_extension.clone(),
            });
        }

        match job.target {
            ImportTarget::JobListings => self.import_rows::<JobListingRepository>(job).await,
        }
    }

    async fn import_rows<R: RepositoryType>(&self, job: &ImportJob) -> AppResult<ImportReport> {
        let repository = self.registry.repository::<R>().await?;
        let batch_size = job.batch_size.max(1);

        let (tx, mut rx) = mpsc::channel(2);
        let path = job.file_path.clone();
        let reader = tokio::task::spawn_blocking(move || {
            read_csv_batches::<<R::Model as Entity>::Data>(&path, batch_size, tx)
        });

        let mut imported = 0;
        let mut skipped = 0;
        while let Some(batch) = rx.recv().await {
            let batch: Vec<<R::Model as Entity>::Data> = batch;
            let result = repository
                .repository()
                .create_many(batch.into_iter().map(EntityInput::Data))
                .await?;
            imported += result.inserted.len();
            skipped += result.skipped;
        }

        skipped += reader
            .await
            .map_err(|e| AppError::internal(format!("Import reader panicked: {}", e)))??;

        Ok(ImportReport {
            job_id: job.id,
            target: job.target,
            imported,
            skipped,
        })
    }
}

/// Parse rows into `D`, sending batches of `batch_size`. Returns the number of
/// rows that failed to parse.
fn read_csv_batches<D: DeserializeOwned>(
    path: &Path,
    batch_size: usize,
    tx: mpsc::Sender<Vec<D>>,
) -> AppResult<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut skipped = 0;
    let mut batch = Vec::with_capacity(batch_size);
    for (index, row) in reader.deserialize::<D>().enumerate() {
        match row {
            Ok(item) => batch.push(item),
            Err(e) => {
                // +2: header line and 1-based numbering
                warn!("Skipping row {} of {}: {}", index + 2, path.display(), e);
                skipped += 1;
                continue;
            }
        }

        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if tx.blocking_send(full).is_err() {
                return Ok(skipped);
            }
        }
    }

    if !batch.is_empty() {
        let _ = tx.blocking_send(batch);
    }
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(
            resolve_extension(Some("listings.txt"), Some("text/csv; charset=utf-8")).unwrap(),
            ".csv"
        );
        assert_eq!(resolve_extension(None, Some("text/csv")).unwrap(), ".csv");
    }

    #[test]
    fn test_extension_from_file_name() {
        assert_eq!(
            resolve_extension(Some("listings.CSV"), Some("application/octet-stream")).unwrap(),
            ".csv"
        );
        assert_eq!(resolve_extension(Some("dir/listings.csv"), None).unwrap(), ".csv");
    }

    #[test]
    fn test_unknown_extension() {
        let err = resolve_extension(Some("listings.tar.gz"), None).unwrap_err();
        assert!(matches!(
            err,
            AppError::UnknownFileExtension { ref extension, .. } if extension == ".tar.gz"
        ));
    }

    #[test]
    fn test_unknown_content_type_without_suffix() {
        let err = resolve_extension(Some("listings"), Some("application/pdf")).unwrap_err();
        assert!(matches!(err, AppError::UnknownContentType { .. }));
    }

    #[test]
    fn test_no_type_info() {
        assert!(matches!(
            resolve_extension(Some("listings"), None),
            Err(AppError::FileTypeNotProvided)
        ));
        assert!(matches!(
            resolve_extension(None, None),
            Err(AppError::FileTypeNotProvided)
        ));
    }

    #[test]
    fn test_job_round_trips_through_json() {
        let job = ImportJob {
            id: Uuid::new_v4(),
            file_path: PathBuf::from("/tmp/x.csv"),
            content_type: Some("text/csv".into()),
            file_extension: ".csv".into(),
            batch_size: 10,
            target: ImportTarget::JobListings,
        };
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(serde_json::from_str::<ImportJob>(&json).unwrap(), job);
    }
}
