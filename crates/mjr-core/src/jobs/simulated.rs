//! Simulated job: a fixed-duration in-memory work loop with no external
//! process. Exists to exercise the state machine and runner end to end.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::JobError;
use crate::job::{Job, JobMeta, ProgressUpdate};
use crate::runner::WorkContext;

const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Busy-loop stand-in for real work. Pause stops its clock; cancel is
/// observed at every tick.
pub struct SimulatedJob {
    meta: JobMeta,
    work_time: Duration,
    tick: Duration,
    fail: bool,
}

impl SimulatedJob {
    pub fn new(work_time: Duration) -> Self {
        Self {
            meta: JobMeta {
                title: "Simulated job".into(),
                source: "sim://job".into(),
                destination: PathBuf::new(),
                duration: Some(work_time),
                size: Some(10_000_000),
                thumbnail: None,
                reports_progress: true,
                supports_pause: true,
            },
            work_time,
            tick: DEFAULT_TICK,
            fail: false,
        }
    }

    /// Test hook: fail immediately with an injected fault.
    pub fn failing(work_time: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(work_time)
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.meta.destination = destination.into();
        self
    }
}

#[async_trait]
impl Job for SimulatedJob {
    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    async fn execute(&mut self, ctx: &WorkContext) -> Result<()> {
        if self.fail {
            anyhow::bail!("injected simulated failure");
        }

        ctx.report(ProgressUpdate::percent(0));

        // Active time accrues only while Working: the checkpoint blocks for
        // the whole pause, and the tick timer starts after it returns.
        let mut active = Duration::ZERO;
        let mut last_percent = 0u8;
        while active < self.work_time {
            ctx.checkpoint().await?;

            let tick_start = Instant::now();
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = ctx.canceled() => return Err(JobError::Canceled.into()),
            }
            active += tick_start.elapsed();

            let percent = (active.as_millis().saturating_mul(100)
                / self.work_time.as_millis().max(1))
            .min(100) as u8;
            if percent != last_percent {
                last_percent = percent;
                let remaining = self.work_time.saturating_sub(active);
                ctx.report(
                    ProgressUpdate::percent(percent)
                        .with_eta(format!("{}s", remaining.as_secs()))
                        .with_speed("10.0 MiB/s"),
                );
            }
        }
        Ok(())
    }
}
