//! Remote download job: delegates the actual transfer to an externally
//! supplied fetch routine and adapts its progress protocol to the runner's.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::JobError;
use crate::job::{Job, JobMeta, ProgressUpdate};
use crate::runner::{CancelWatch, WorkContext};

/// One progress reading from the fetch routine.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub percent: u8,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// What a fetch routine is given: where to write, how to report, and a
/// cancellation signal it must honor.
pub struct FetchContext {
    pub destination: PathBuf,
    pub progress: Arc<dyn Fn(FetchProgress) + Send + Sync>,
    pub cancel: CancelWatch,
}

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The externally supplied transfer routine. Consumed on the job's single
/// run.
pub type FetchFn = Box<dyn FnOnce(FetchContext) -> FetchFuture + Send>;

/// Download of a remote media file via a caller-provided fetcher.
pub struct RemoteDownloadJob {
    meta: JobMeta,
    fetch: Option<FetchFn>,
}

impl RemoteDownloadJob {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>, fetch: FetchFn) -> Self {
        let url = url.into();
        let destination = destination.into();
        let title = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.clone());
        Self {
            meta: JobMeta {
                title,
                source: url,
                destination,
                duration: None,
                size: None,
                thumbnail: None,
                reports_progress: true,
                // The fetch contract carries only a cancel signal; a pause
                // would not actually stop the transfer.
                supports_pause: false,
            },
            fetch: None,
        }
        .with_fetch(fetch)
    }

    fn with_fetch(mut self, fetch: FetchFn) -> Self {
        self.fetch = Some(fetch);
        self
    }
}

#[async_trait]
impl Job for RemoteDownloadJob {
    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    async fn execute(&mut self, ctx: &WorkContext) -> Result<()> {
        let fetch = self
            .fetch
            .take()
            .context("download job was already executed")?;

        let last_percent = Arc::new(AtomicU8::new(0));
        let progress = {
            let ctx = ctx.clone();
            let last_percent = Arc::clone(&last_percent);
            Arc::new(move |p: FetchProgress| {
                let percent = p.percent.min(100);
                last_percent.store(percent, Ordering::Relaxed);
                let mut update = ProgressUpdate::percent(percent);
                update.speed = p.speed;
                update.eta = p.eta;
                ctx.report(update);
            })
        };

        fetch(FetchContext {
            destination: self.meta.destination.clone(),
            progress,
            cancel: ctx.cancel_watch(),
        })
        .await?;

        if ctx.cancel_requested() {
            return Err(JobError::Canceled.into());
        }

        // A fetcher's last report often falls short of 100 (e.g. 97%); make
        // sure observers never see a succeeded job stuck below full.
        if last_percent.load(Ordering::Relaxed) < 100 {
            ctx.report(ProgressUpdate::percent(100));
        }
        Ok(())
    }
}
