//! Driver tests against a fake ffmpeg: a shell script that writes
//! ffmpeg-shaped diagnostics to stderr. Exercises the stream parsing, the
//! diagnostics sink and forced termination without needing ffmpeg itself.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mjr_core::ffmpeg::{FfmpegDriver, ParserEvent};
use mjr_core::job::{Job, JobMeta, ProgressUpdate};
use mjr_core::runner::WorkContext;
use mjr_core::{JobError, JobEvent, JobRunner, JobStatus};

fn fake_driver(log_dir: PathBuf) -> FfmpegDriver {
    FfmpegDriver::new(PathBuf::from("sh"), log_dir)
}

fn script_args(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

const HAPPY_SCRIPT: &str = r#"
printf 'Input #0, mov,mp4, from in.mp4:\n' >&2
printf '  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s\n' >&2
printf 'size=     100kB time=00:00:10.00 bitrate=  81.9kbits/s\n' >&2
printf 'Press [q] to stop, [?] for help\n' >&2
printf 'size=     256kB time=00:00:50.00 bitrate=  41.9kbits/s\n' >&2
printf '\n' >&2
"#;

#[tokio::test]
async fn streams_events_and_logs_raw_lines() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fake_driver(dir.path().to_path_buf());

    let mut run = driver
        .spawn(&script_args(HAPPY_SCRIPT), "fake-tool", None)
        .unwrap();

    let mut events = Vec::new();
    while let Some(ev) = run.next_event().await {
        events.push(ev);
    }
    // The progress-shaped line before the marker is noise and produced no
    // event; after the marker, 50s of 100s is 50%.
    assert_eq!(
        events,
        vec![
            ParserEvent::Started,
            ParserEvent::Progress(50),
            ParserEvent::Finished,
        ]
    );

    let exit = run.wait().await.unwrap();
    assert!(exit.success);
    assert!(!exit.killed);
    assert!(exit.finished_marker_seen);

    // Every raw line went to the diagnostics sink verbatim, noise included.
    let log = std::fs::read_to_string(dir.path().join("fake-tool.log")).unwrap();
    assert!(log.contains("cmd: sh -c"));
    assert!(log.contains("Duration: 00:01:40.00"));
    assert!(log.contains("time=00:00:10.00"));
    assert!(log.contains("time=00:00:50.00"));
}

#[tokio::test]
async fn exit_without_terminator_is_still_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fake_driver(dir.path().to_path_buf());

    // Marker and one progress line, then the process just exits.
    let script = r#"
printf '  Duration: 00:00:10.00, start: 0.000000, bitrate: 128 kb/s\n' >&2
printf 'Press [q] to stop, [?] for help\n' >&2
printf 'size=     10kB time=00:00:05.00 bitrate=  8.1kbits/s\n' >&2
"#;
    let mut run = driver.spawn(&script_args(script), "fake-tool", None).unwrap();
    let mut events = Vec::new();
    while let Some(ev) = run.next_event().await {
        events.push(ev);
    }
    assert_eq!(events, vec![ParserEvent::Started, ParserEvent::Progress(50)]);

    let exit = run.wait().await.unwrap();
    assert!(exit.success);
    assert!(!exit.finished_marker_seen);
}

#[tokio::test]
async fn terminate_kills_the_child_and_ends_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fake_driver(dir.path().to_path_buf());

    // Holds the stream open for much longer than the test timeout.
    let script = r#"
printf 'Press [q] to stop, [?] for help\n' >&2
exec sleep 30
"#;
    let mut run = driver.spawn(&script_args(script), "fake-tool", None).unwrap();
    assert_eq!(run.next_event().await, Some(ParserEvent::Started));

    let handle = run.handle();
    handle.terminate();

    let exit = tokio::time::timeout(Duration::from_secs(5), async {
        while run.next_event().await.is_some() {}
        run.wait().await
    })
    .await
    .expect("termination must unblock the stream read promptly")
    .unwrap();
    assert!(exit.killed);
}

#[tokio::test]
async fn known_total_overrides_stream_duration() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fake_driver(dir.path().to_path_buf());

    // Stream claims 100s, caller knows the bounded length is 50s.
    let mut run = driver
        .spawn(
            &script_args(HAPPY_SCRIPT),
            "fake-tool",
            Some(Duration::from_secs(50)),
        )
        .unwrap();
    let mut events = Vec::new();
    while let Some(ev) = run.next_event().await {
        events.push(ev);
    }
    assert_eq!(
        events,
        vec![
            ParserEvent::Started,
            ParserEvent::Progress(100),
            ParserEvent::Finished,
        ]
    );
    run.wait().await.unwrap();
}

/// Minimal subprocess-backed job, shaped like the crop work loop: spawns the
/// fake tool, attaches the process handle, forwards parser events.
struct FakeToolJob {
    meta: JobMeta,
    driver: FfmpegDriver,
    script: String,
}

#[async_trait]
impl Job for FakeToolJob {
    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    async fn execute(&mut self, ctx: &WorkContext) -> Result<()> {
        let mut run = self
            .driver
            .spawn(&script_args(&self.script), "fake-tool", None)?;
        ctx.attach_process(run.handle());

        while let Some(event) = run.next_event().await {
            if let ParserEvent::Progress(p) = event {
                ctx.report(ProgressUpdate::percent(p));
            }
        }
        let exit = run.wait().await?;
        if exit.killed || ctx.cancel_requested() {
            return Err(JobError::Canceled.into());
        }
        if !exit.success {
            return Err(JobError::Subprocess {
                tool: "fake-tool".into(),
                code: exit.code,
            }
            .into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn cancel_terminates_attached_process_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("out.mp4");
    std::fs::write(&destination, b"partial").unwrap();

    let job = FakeToolJob {
        meta: JobMeta {
            title: "out.mp4".into(),
            source: "in.mp4".into(),
            destination: destination.clone(),
            duration: Some(Duration::from_secs(600)),
            size: None,
            thumbnail: None,
            reports_progress: true,
            supports_pause: false,
        },
        driver: fake_driver(dir.path().to_path_buf()),
        script: "printf 'Press [q] to stop, [?] for help\\n' >&2\nexec sleep 30\n".to_string(),
    };

    let (runner, _events) = JobRunner::new();
    let handle = runner.start(Box::new(job));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handle.cancel());

    // The kill unblocks the stream read; no cooperative checkpoint needed.
    let status = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cancel must terminate the subprocess job promptly");
    assert_eq!(status, JobStatus::Canceled);
    assert!(!destination.exists(), "partial output must be removed");
}

#[tokio::test]
async fn failing_tool_maps_to_failed() {
    let dir = tempfile::tempdir().unwrap();
    let job = FakeToolJob {
        meta: JobMeta {
            title: "out.mp4".into(),
            source: "in.mp4".into(),
            destination: dir.path().join("out.mp4"),
            duration: None,
            size: None,
            thumbnail: None,
            reports_progress: true,
            supports_pause: false,
        },
        driver: fake_driver(dir.path().to_path_buf()),
        script: "printf 'broken input\\n' >&2\nexit 1\n".to_string(),
    };

    let (runner, _events) = JobRunner::new();
    let handle = runner.start(Box::new(job));
    let controller = handle.controller();

    assert_eq!(handle.wait().await, JobStatus::Failed);
    assert!(controller.snapshot().title.ends_with(" ERROR"));
}

#[tokio::test]
async fn pause_is_rejected_for_subprocess_jobs() {
    let dir = tempfile::tempdir().unwrap();

    // Progress keeps flowing for ~400ms; the encode cannot be suspended.
    let script = r#"
printf '  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s\n' >&2
printf 'Press [q] to stop, [?] for help\n' >&2
for t in 10 30 50 70 90; do
  printf 'size=     1kB time=00:00:%s.00 bitrate=  1.0kbits/s\n' "$t" >&2
  sleep 0.08
done
printf '\n' >&2
"#;
    let job = FakeToolJob {
        meta: JobMeta {
            title: "out.mp4".into(),
            source: "in.mp4".into(),
            destination: dir.path().join("out.mp4"),
            duration: Some(Duration::from_secs(100)),
            size: None,
            thumbnail: None,
            reports_progress: true,
            supports_pause: false,
        },
        driver: fake_driver(dir.path().to_path_buf()),
        script: script.to_string(),
    };

    let (runner, mut events) = JobRunner::new();
    let handle = runner.start(Box::new(job));
    let controller = handle.controller();

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Cannot suspend ffmpeg mid-encode: the request is a no-op, the job
    // never reads as Paused, and progress keeps its meaning.
    assert!(!controller.can_pause());
    assert!(!handle.pause());
    assert_ne!(handle.status(), JobStatus::Paused);

    assert_eq!(handle.wait().await, JobStatus::Succeeded);
    while let Ok(ev) = events.try_recv() {
        assert!(
            !matches!(
                ev,
                JobEvent::StatusChanged {
                    status: JobStatus::Paused,
                    ..
                }
            ),
            "subprocess job must never report Paused"
        );
    }
}

/// Job that only attaches its subprocess after cancellation was already
/// requested, exercising the attach/cancel ordering.
struct LateAttachJob {
    meta: JobMeta,
    driver: FfmpegDriver,
}

#[async_trait]
impl Job for LateAttachJob {
    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    async fn execute(&mut self, ctx: &WorkContext) -> Result<()> {
        let mut cancel = ctx.cancel_watch();
        cancel.canceled().await;

        let mut run = self
            .driver
            .spawn(&script_args("exec sleep 30"), "fake-tool", None)?;
        ctx.attach_process(run.handle());

        while run.next_event().await.is_some() {}
        let exit = run.wait().await?;
        if exit.killed || ctx.cancel_requested() {
            return Err(JobError::Canceled.into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn process_attached_after_cancel_is_still_terminated() {
    let dir = tempfile::tempdir().unwrap();
    let job = LateAttachJob {
        meta: JobMeta {
            title: "out.mp4".into(),
            source: "in.mp4".into(),
            destination: dir.path().join("out.mp4"),
            duration: None,
            size: None,
            thumbnail: None,
            reports_progress: true,
            supports_pause: false,
        },
        driver: fake_driver(dir.path().to_path_buf()),
    };

    let (runner, _events) = JobRunner::new();
    let handle = runner.start(Box::new(job));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.cancel());

    // The child is spawned only after the cancel flag is set; the attach
    // must still get it killed rather than letting it run for 30s.
    let status = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("late-attached subprocess must be terminated promptly");
    assert_eq!(status, JobStatus::Canceled);
}
