//! Streaming download of export archives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

use crate::config::DEFAULT_ARCHIVE_NAME;
use crate::error_handling::DownloadError;
use crate::models::{ExportJob, ExportKind, JobStatus};

/// Downloads export archives into per-job folders and extracts them.
#[derive(Clone)]
pub struct ArchiveFetcher {
    http: Arc<reqwest::Client>,
    show_progress: bool,
}

impl ArchiveFetcher {
    pub fn new(http: Arc<reqwest::Client>) -> Self {
        Self {
            http,
            show_progress: true,
        }
    }

    /// Disables the progress bar (tests, JSON logging).
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Downloads a completed tables or gradebook export to `dest/<job id>/`
    /// and returns the archive path.
    ///
    /// Jobs that are not downloadable are rejected before anything is
    /// written to disk.
    pub async fn download(&self, job: &ExportJob, dest: &Path) -> Result<PathBuf, DownloadError> {
        check_downloadable(job)?;
        let link = job
            .download_link()
            .ok_or_else(|| DownloadError::MissingDownloadLink { id: job.id.clone() })?;

        let folder = dest.join(&job.id);
        self.download_url(link, &folder).await
    }

    /// Downloads every clickstream link into `dest/<job id>/`.
    pub async fn download_links(
        &self,
        job_id: &str,
        links: &[String],
        dest: &Path,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let folder = dest.join(job_id);
        let mut paths = Vec::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            log::info!("Downloading clickstream file {}/{}", i + 1, links.len());
            paths.push(self.download_url(link, &folder).await?);
        }
        Ok(paths)
    }

    /// Extracts a downloaded archive into `dest`. See [`super::extract`].
    pub async fn extract(&self, archive: &Path, dest: &Path) -> Result<PathBuf, DownloadError> {
        super::archive::extract(archive, dest).await
    }

    /// Streams `url` into `folder`, named after the URL's last path segment.
    pub async fn download_url(&self, url: &str, folder: &Path) -> Result<PathBuf, DownloadError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Remote {
                url: redact_query(url),
                status: status.as_u16(),
            });
        }

        tokio::fs::create_dir_all(folder).await?;
        let path = folder.join(archive_file_name(url));
        log::info!("Downloading {} to {}", redact_query(url), path.display());

        let progress = self.progress_bar(response.content_length());
        let part = partial_path(&path);
        let written = match write_stream(response, &part, &progress).await {
            Ok(written) => written,
            Err(e) => {
                progress.abandon();
                if let Err(remove_err) = tokio::fs::remove_file(&part).await {
                    log::warn!("Failed to remove {}: {}", part.display(), remove_err);
                }
                return Err(e);
            }
        };
        tokio::fs::rename(&part, &path).await?;
        progress.finish_and_clear();

        log::debug!("Downloaded {} bytes to {}", written, path.display());
        Ok(path)
    }

    fn progress_bar(&self, length: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match length {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                        )
                        .map(|style| style.progress_chars("#>-"))
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

/// Streams the response body into `path` and returns the byte count.
async fn write_stream(
    response: reqwest::Response,
    path: &Path,
    progress: &ProgressBar,
) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress.set_position(written);
    }
    file.flush().await?;
    Ok(written)
}

/// `<path>.part`, where a download is written until it completes.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Status and kind gate applied before any download.
pub fn check_downloadable(job: &ExportJob) -> Result<(), DownloadError> {
    match job.status {
        JobStatus::Pending | JobStatus::InProgress => {
            return Err(DownloadError::NotReady {
                id: job.id.clone(),
                status: job.status,
            })
        }
        JobStatus::Terminated => return Err(DownloadError::Terminated { id: job.id.clone() }),
        JobStatus::Completed => {}
    }
    if job.kind() == ExportKind::Clickstream {
        return Err(DownloadError::UnsupportedExportKind {
            id: job.id.clone(),
            kind: job.kind(),
        });
    }
    Ok(())
}

/// Last non-empty path segment of `url`, or `export.zip`.
pub fn archive_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string())
}

// Signed URLs carry credentials in the query string
fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?..."),
        None => url.to_string(),
    }
}
