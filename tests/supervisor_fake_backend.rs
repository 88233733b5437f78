// tests/supervisor_fake_backend.rs

use std::error::Error;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use mpiwatch::errors::RunError;
use mpiwatch::fs::mock::MockFileSystem;
use mpiwatch::supervisor::{RunEvent, Supervisor, COST_REPORT, RESULTS_HEADER};
use mpiwatch::types::RunStatus;
use mpiwatch_test_utils::builders::{OptionsBuilder, RunRequestBuilder};
use mpiwatch_test_utils::fake_backend::{Script, ScriptedBackend};
use mpiwatch_test_utils::recording::RecordingObserver;
use mpiwatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor(backend: ScriptedBackend, fs: &MockFileSystem) -> Supervisor<ScriptedBackend> {
    Supervisor::new(backend, Arc::new(fs.clone()), OptionsBuilder::new().build())
}

/// The last three notifications of every completed run.
fn assert_terminal_sequence(events: &[RunEvent]) {
    let n = events.len();
    assert!(n >= 3, "too few events: {events:?}");
    assert_eq!(events[n - 3], RunEvent::Progress(100));
    assert_eq!(events[n - 2], RunEvent::TimeRemaining(0.0));
    assert_eq!(events[n - 1], RunEvent::Finished);
}

#[tokio::test]
async fn successful_run_forwards_lines_progress_and_artifact() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    let results = dir.path().join("results.txt");

    let script = Script::new([
        "starting 19 ranks",
        "[Rank0] blur aplicado",
        "[Rank1] blur aplicado",
        "[Rank0] filtros ligeros procesados",
    ])
    .artifact_on_exit(&fs, &results, "image_01.bmp: 1.23s\n");

    let backend = ScriptedBackend::new(script);
    let sup = supervisor(backend.clone(), &fs);
    let request = RunRequestBuilder::new(dir.path()).expected_total(12).build();

    let observer = RecordingObserver::new();
    let handle = sup.start(&request, observer.clone())?;
    let outcome = with_timeout(handle.wait()).await?;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.events, 7);
    assert_eq!(outcome.artifact.as_deref(), Some("image_01.bmp: 1.23s\n"));
    assert!(outcome.error.is_none());
    assert!(outcome.is_success());

    let events = observer.events();
    assert_eq!(
        &events[..8],
        &[
            RunEvent::Output("starting 19 ranks".into()),
            RunEvent::Progress(0),
            RunEvent::Output("[Rank0] blur aplicado".into()),
            RunEvent::Progress(8),
            events[4].clone(),
            RunEvent::Output("[Rank1] blur aplicado".into()),
            RunEvent::Progress(16),
            events[7].clone(),
        ]
    );
    assert!(matches!(events[4], RunEvent::TimeRemaining(r) if r >= 0.0));
    assert!(matches!(events[7], RunEvent::TimeRemaining(r) if r >= 0.0));

    let outputs = observer.outputs();
    let n = outputs.len();
    assert_eq!(outputs[n - 3], RESULTS_HEADER);
    assert_eq!(RESULTS_HEADER, "\n--- Resultados del procesamiento ---\n");
    assert_eq!(outputs[n - 2], "image_01.bmp: 1.23s\n");
    assert_eq!(outputs[n - 1], COST_REPORT);

    assert_eq!(observer.progress(), vec![0, 8, 16, 58, 100]);
    assert_terminal_sequence(&events);
    assert_eq!(observer.finished_count(), 1);

    let spawned = backend.spawned();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].program, "mpiexec");
    assert_eq!(
        spawned[0].args,
        vec!["-n", "19", "-f", "machinefile", "./procesador", "55"]
    );
    assert_eq!(spawned[0].cwd, dir.path());

    Ok(())
}

#[tokio::test]
async fn overshoot_progress_is_not_forwarded_before_completion() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "ok");

    let script = Script::new([
        "[Rank0] blur aplicado",
        "[Rank0] blur aplicado",
        "[Rank0] filtros ligeros procesados",
    ]);
    let sup = supervisor(ScriptedBackend::new(script), &fs);
    let request = RunRequestBuilder::new(dir.path()).expected_total(6).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.events, 7);
    // 16, 33, then 116 is withheld; 100 comes from completion.
    assert_eq!(observer.progress(), vec![16, 33, 100]);
    // Remaining time is still reported for the overshooting line.
    assert_eq!(observer.remaining().len(), 3 + 1);

    Ok(())
}

#[tokio::test]
async fn run_without_progress_lines_only_reports_completion() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "total: 0 images\n");

    let sup = supervisor(ScriptedBackend::new(Script::default()), &fs);
    let request = RunRequestBuilder::new(dir.path()).expected_total(6).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(
        observer.events(),
        vec![
            RunEvent::Output(RESULTS_HEADER.into()),
            RunEvent::Output("total: 0 images\n".into()),
            RunEvent::Output(COST_REPORT.into()),
            RunEvent::Progress(100),
            RunEvent::TimeRemaining(0.0),
            RunEvent::Finished,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn lines_before_the_first_event_report_zero_without_estimate() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "");

    let script = Script::new(["hello", "blur aplicado", "[Rank0] reading"]);
    let sup = supervisor(ScriptedBackend::new(script), &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.events, 0);
    // Every line refreshes the percentage; no estimate exists without events.
    assert_eq!(observer.progress(), vec![0, 0, 0, 100]);
    assert_eq!(observer.remaining(), vec![0.0]);

    Ok(())
}

#[tokio::test]
async fn plain_lines_after_an_event_refresh_the_remaining_time() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "ok");

    let script = Script::new(["starting", "[Rank0] blur aplicado", "noise a", "noise b"])
        .line_delay(Duration::from_millis(20));
    let sup = supervisor(ScriptedBackend::new(script), &fs);
    let request = RunRequestBuilder::new(dir.path()).expected_total(6).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.events, 1);
    assert_eq!(observer.progress(), vec![0, 16, 16, 16, 100]);

    // One interim estimate per line from the first event on, then the final 0.
    let remaining = observer.remaining();
    assert_eq!(remaining.len(), 3 + 1);
    assert_eq!(remaining[3], 0.0);

    // With the event count fixed at 1 of 6, the estimate is 5 x elapsed, so
    // it must grow as the clock advances between lines.
    assert!(remaining[0] > 0.0, "{remaining:?}");
    assert!(remaining[1] > remaining[0], "{remaining:?}");
    assert!(remaining[2] > remaining[1], "{remaining:?}");

    Ok(())
}

#[tokio::test]
async fn trailing_whitespace_is_trimmed_from_forwarded_lines() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "r");

    let script = Script::new(["[Rank2] blur aplicado   \r"]);
    let sup = supervisor(ScriptedBackend::new(script), &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(observer.outputs()[0], "[Rank2] blur aplicado");
    assert_eq!(observer.progress()[0], 16);

    Ok(())
}

#[tokio::test]
async fn non_zero_exit_reports_one_error_and_skips_artifact() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    // Present, but must not be read after a failed run.
    fs.add_file(dir.path().join("results.txt"), "stale results");

    let script = Script::new(["[Rank0] blur aplicado", "segfault in rank 3"]).exit_code(139);
    let sup = supervisor(ScriptedBackend::new(script), &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.status, RunStatus::Failed(139));
    assert_eq!(outcome.error, Some(RunError::NonZeroExit { code: 139 }));
    assert!(outcome.artifact.is_none());
    assert!(!outcome.is_success());

    let outputs = observer.outputs();
    assert_eq!(
        outputs,
        vec![
            "[Rank0] blur aplicado".to_string(),
            "segfault in rank 3".to_string(),
            RunError::NonZeroExit { code: 139 }.to_string(),
        ]
    );
    assert!(!outputs.iter().any(|l| l.contains("stale results")));

    let events = observer.events();
    assert_terminal_sequence(&events);
    assert_eq!(
        events[events.len() - 4],
        RunEvent::Output(RunError::NonZeroExit { code: 139 }.to_string())
    );

    Ok(())
}

#[tokio::test]
async fn missing_artifact_times_out_with_warning() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();

    let backend = ScriptedBackend::new(Script::new(["[Rank0] blur aplicado"]));
    let options = OptionsBuilder::new()
        .poll(3, Duration::from_millis(5))
        .build();
    let sup = Supervisor::new(backend, Arc::new(fs.clone()), options);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert!(outcome.artifact.is_none());
    let expected = RunError::ArtifactTimeout {
        file: "results.txt".into(),
        attempts: 3,
    };
    assert_eq!(outcome.error, Some(expected.clone()));
    assert!(!outcome.is_success());

    assert!(observer.outputs().contains(&expected.to_string()));
    assert!(!observer.outputs().iter().any(|l| l == COST_REPORT));
    assert_terminal_sequence(&observer.events());

    Ok(())
}

#[tokio::test]
async fn artifact_appearing_during_polling_is_read() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    let results = dir.path().join("results.txt");

    let backend = ScriptedBackend::new(Script::default());
    let options = OptionsBuilder::new()
        .poll(50, Duration::from_millis(10))
        .build();
    let sup = Supervisor::new(backend, Arc::new(fs.clone()), options);
    let request = RunRequestBuilder::new(dir.path()).build();

    let late_fs = fs.clone();
    let late_path = results.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        late_fs.add_file(late_path, "late but fine");
    });

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    assert_eq!(outcome.artifact.as_deref(), Some("late but fine"));
    assert!(outcome.is_success());

    Ok(())
}

#[tokio::test]
async fn unreadable_artifact_reports_read_error() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), vec![0xff, 0xfe, 0x00]);

    let sup = supervisor(ScriptedBackend::new(Script::default()), &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let outcome = with_timeout(sup.start(&request, observer.clone())?.wait()).await?;

    match &outcome.error {
        Some(RunError::ArtifactRead { file, reason }) => {
            assert_eq!(file, "results.txt");
            assert!(reason.contains("UTF-8"), "reason = {reason}");
        }
        other => panic!("expected ArtifactRead, got {other:?}"),
    }
    assert!(
        observer
            .outputs()
            .iter()
            .any(|l| l.starts_with("ERROR reading results.txt"))
    );
    assert_terminal_sequence(&observer.events());

    Ok(())
}

#[tokio::test]
async fn launch_failure_reports_diagnostic_then_finished() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();

    let sup = supervisor(ScriptedBackend::new(Script::default().fail_spawn()), &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let err = match sup.start(&request, observer.clone()) {
        Err(err) => err,
        Ok(_) => panic!("expected launch failure"),
    };

    match &err {
        RunError::Launch {
            program,
            machinefile,
            ..
        } => {
            assert_eq!(program, "./procesador");
            assert_eq!(machinefile, "machinefile");
        }
        other => panic!("expected Launch error, got {other:?}"),
    }

    assert_eq!(
        observer.events(),
        vec![RunEvent::Output(err.to_string()), RunEvent::Finished]
    );

    Ok(())
}

#[tokio::test]
async fn stop_kills_the_process_and_skips_artifact() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "should not be read");

    let backend = ScriptedBackend::new(Script::new(["[Rank0] blur aplicado"]).hang());
    let killed = backend.killed_flag();
    let sup = supervisor(backend, &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let handle = sup.start(&request, observer.clone())?;

    // Wait until the first line went through.
    with_timeout(async {
        while observer.outputs().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    handle.stop();
    handle.stop();
    let outcome = with_timeout(handle.wait()).await?;

    assert_eq!(outcome.status, RunStatus::Stopped);
    assert!(outcome.artifact.is_none());
    assert!(outcome.error.is_none());
    assert!(killed.load(Ordering::SeqCst));
    assert!(
        !observer
            .outputs()
            .iter()
            .any(|l| l.contains("should not be read"))
    );
    assert!(observer.finished_count() <= 1);

    Ok(())
}

#[tokio::test]
async fn stop_after_completion_is_a_no_op() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "done");

    let backend = ScriptedBackend::new(Script::new(["[Rank0] blur aplicado"]));
    let killed = backend.killed_flag();
    let sup = supervisor(backend, &fs);
    let request = RunRequestBuilder::new(dir.path()).build();

    let observer = RecordingObserver::new();
    let handle = sup.start(&request, observer.clone())?;

    with_timeout(async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    let before = observer.events();
    handle.stop();
    handle.stop();
    let outcome = with_timeout(handle.wait()).await?;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert!(!killed.load(Ordering::SeqCst));
    assert_eq!(observer.events(), before);
    assert_eq!(observer.finished_count(), 1);

    Ok(())
}

#[tokio::test]
async fn each_run_starts_with_fresh_progress_state() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("results.txt"), "ok");

    let script = Script::new(["[Rank0] filtros ligeros procesados"]);
    let sup = supervisor(ScriptedBackend::new(script), &fs);
    let request = RunRequestBuilder::new(dir.path()).expected_total(12).build();

    let first = RecordingObserver::new();
    let first_outcome = with_timeout(sup.start(&request, first.clone())?.wait()).await?;

    let second = RecordingObserver::new();
    let second_handle = sup.start(&request, second.clone())?;
    let second_outcome = with_timeout(second_handle.wait()).await?;

    assert_eq!(first_outcome.events, 5);
    assert_eq!(second_outcome.events, 5);
    assert_eq!(first.progress(), vec![41, 100]);
    assert_eq!(second.progress(), vec![41, 100]);

    Ok(())
}

#[tokio::test]
async fn custom_launch_settings_shape_the_command() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs = MockFileSystem::new();
    fs.add_file(dir.path().join("out.log"), "custom");

    let backend = ScriptedBackend::new(Script::default());
    let options = OptionsBuilder::new()
        .launcher("/opt/mpi/bin/mpirun")
        .machinefile("hosts.txt")
        .artifact_file("out.log")
        .build();
    let sup = Supervisor::new(backend.clone(), Arc::new(fs.clone()), options);
    let request = RunRequestBuilder::new(dir.path())
        .executable("blur")
        .workers(4)
        .kernel(101)
        .build();

    let outcome = with_timeout(sup.start(&request, RecordingObserver::new())?.wait()).await?;
    assert_eq!(outcome.artifact.as_deref(), Some("custom"));

    let cmd = &backend.spawned()[0];
    assert_eq!(
        cmd.to_string(),
        "/opt/mpi/bin/mpirun -n 4 -f hosts.txt ./blur 101"
    );

    Ok(())
}
