//! `mjr simulate` – run an in-memory job with no side effects.

use std::time::Duration;

use anyhow::Result;
use mjr_core::config::MjrConfig;
use mjr_core::jobs::SimulatedJob;

use super::observe;

pub async fn run_simulate(cfg: &MjrConfig, duration_ms: u64) -> Result<()> {
    let job = SimulatedJob::new(Duration::from_millis(duration_ms)).with_tick(cfg.work_tick());
    observe::run_to_completion(Box::new(job)).await
}
