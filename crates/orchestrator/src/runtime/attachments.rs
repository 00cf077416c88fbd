//! Attachment ingest.
//!
//! When download is enabled, each attachment URL is fetched with a hard
//! byte cap and stored under the configured directory as
//! `<attachment_id>-<sanitized_filename>`. Violations fail the turn with
//! `ATTACHMENT_REJECTED` and are never retried.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use codial_domain::config::AttachmentsConfig;
use codial_domain::error::{Error, Result};
use codial_domain::turn::Attachment;

pub struct AttachmentIngestor {
    http: reqwest::Client,
    max_bytes: u64,
    storage_dir: PathBuf,
}

impl AttachmentIngestor {
    /// Returns `None` when download is disabled — attachments then pass
    /// through to the bridge as URL metadata.
    pub fn from_config(config: &AttachmentsConfig, request_timeout: Duration) -> Option<Self> {
        if !config.download_enabled {
            return None;
        }
        Some(Self {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            max_bytes: config.download_max_bytes,
            storage_dir: config.storage_dir.clone(),
        })
    }

    /// Fetch every attachment, returning the records with `local_path`
    /// set. The first violation aborts the whole batch.
    pub async fn ingest(&self, attachments: &[Attachment]) -> Result<Vec<Attachment>> {
        let mut ingested = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            ingested.push(self.fetch_one(attachment).await?);
        }
        Ok(ingested)
    }

    async fn fetch_one(&self, attachment: &Attachment) -> Result<Attachment> {
        if attachment.size > self.max_bytes {
            return Err(Error::AttachmentRejected(format!(
                "{} declares {} bytes, cap is {}",
                attachment.filename, attachment.size, self.max_bytes
            )));
        }

        std::fs::create_dir_all(&self.storage_dir)?;
        let filename = format!(
            "{}-{}",
            attachment.attachment_id,
            sanitize_filename(&attachment.filename)
        );
        let path = self.storage_dir.join(&filename);

        let resp = self
            .http
            .get(&attachment.url)
            .send()
            .await
            .map_err(|e| Error::AttachmentRejected(format!("fetching {}: {e}", attachment.url)))?;
        if !resp.status().is_success() {
            return Err(Error::AttachmentRejected(format!(
                "{} returned {}",
                attachment.url,
                resp.status()
            )));
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| Error::AttachmentRejected(format!("reading {}: {e}", attachment.url)))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(Error::AttachmentRejected(format!(
                    "{} exceeded the {} byte cap mid-stream",
                    attachment.filename, self.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(
            attachment_id = %attachment.attachment_id,
            bytes = written,
            path = %path.display(),
            "attachment ingested"
        );

        let mut ingested = attachment.clone();
        ingested.local_path = Some(path.display().to_string());
        Ok(ingested)
    }
}

/// Strip path separators and control characters so the stored name can
/// never escape the storage directory.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "attachment".to_owned()
    } else {
        trimmed.to_owned()
    }
}
