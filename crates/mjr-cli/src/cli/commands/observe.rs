//! Shared foreground run loop: start one job, print its progress to the
//! terminal and translate Ctrl-C into a cancel request instead of a hard
//! process abort.

use std::io::Write;

use anyhow::Result;
use mjr_core::{Job, JobEvent, JobRunner, JobStatus};

const PROGRESS_INTERVAL_MS: u128 = 250;

pub async fn run_to_completion(job: Box<dyn Job>) -> Result<()> {
    let (runner, mut events) = JobRunner::new();
    let handle = runner.start(job);

    let controller = handle.controller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            eprintln!("interrupted, canceling job");
            controller.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        let mut last_print = std::time::Instant::now();
        let mut printed = false;
        while let Some(event) = events.recv().await {
            match event {
                JobEvent::Progress { update, .. } => {
                    let now = std::time::Instant::now();
                    let full = update.percent == Some(100);
                    if now.duration_since(last_print).as_millis() < PROGRESS_INTERVAL_MS && !full {
                        continue;
                    }
                    let percent = update
                        .percent
                        .map(|p| format!("{p:3}%"))
                        .unwrap_or_else(|| "  ?%".to_string());
                    let speed = update.speed.as_deref().unwrap_or("");
                    let eta = update
                        .eta
                        .as_deref()
                        .map(|e| format!("ETA {e}"))
                        .unwrap_or_default();
                    print!("\r  {percent}  {speed}  {eta}    ");
                    let _ = std::io::stdout().flush();
                    printed = true;
                    last_print = now;
                }
                JobEvent::StatusChanged { status, .. } => {
                    print!("\r  [{status}]              ");
                    let _ = std::io::stdout().flush();
                    printed = true;
                }
                JobEvent::Finished { .. } => break,
            }
        }
        if printed {
            println!();
        }
    });

    let status = handle.wait().await;
    let _ = printer.await;
    interrupt.abort();

    match status {
        JobStatus::Succeeded => {
            println!("Done.");
            Ok(())
        }
        JobStatus::Canceled => {
            println!("Canceled.");
            Ok(())
        }
        status => anyhow::bail!("job ended {status} (details in the log)"),
    }
}
