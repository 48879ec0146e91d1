// libwormhole/src/dispatch_tests.rs

use super::dispatch::{Batch, Dispatcher, LogDispatcher, ScpDispatcher, Transfer};
use crate::config::{RemoteTarget, TransferCommand};
use crate::journal::{EventLog, LogEntry, LogLevel};
use crate::test_utils::batch_of;
use crossbeam_channel::unbounded;
use std::ffi::OsStr;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn target() -> RemoteTarget {
    RemoteTarget {
        host: "backup.example".into(),
        user: Some("ops".into()),
        dir: "/srv/drop".into(),
    }
}

fn sh(script: &str) -> TransferCommand {
    TransferCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script.into(), "sh".into()],
    }
}

#[test]
fn command_line_ends_with_path_and_destination() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("a.txt");
    fs::write(&file, b"x").unwrap();

    let d = ScpDispatcher::new(TransferCommand::parse("scp -q").unwrap(), target());
    let cmd = d.command_for(&file);
    assert_eq!(cmd.get_program(), OsStr::new("scp"));
    let args: Vec<&OsStr> = cmd.get_args().collect();
    assert_eq!(
        args,
        [
            OsStr::new("-q"),
            file.as_os_str(),
            OsStr::new("ops@backup.example:/srv/drop")
        ]
    );
}

#[test]
fn directories_are_copied_recursively() {
    let tmp = tempdir().unwrap();
    let d = ScpDispatcher::new(TransferCommand::default(), target());
    let cmd = d.command_for(tmp.path());
    assert!(cmd.get_args().any(|a| a == OsStr::new("-r")));
}

#[cfg(unix)]
#[test]
fn exit_status_decides_success() {
    let d = ScpDispatcher::new(sh("exit 0"), target());
    assert_eq!(d.transfer("/opt/hole/a".as_ref()), Transfer::Sent);

    let d = ScpDispatcher::new(sh("echo out; echo err >&2; exit 3"), target());
    match d.transfer("/opt/hole/a".as_ref()) {
        Transfer::Failed(output) => {
            assert!(output.contains("out"), "got {output}");
            assert!(output.contains("err"), "got {output}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn missing_program_is_a_failed_transfer() {
    let d = ScpDispatcher::new(
        TransferCommand::parse("/definitely/not/a/real/scp").unwrap(),
        target(),
    );
    assert!(matches!(d.transfer("/opt/hole/a".as_ref()), Transfer::Failed(_)));
}

#[cfg(unix)]
#[test]
fn one_failure_does_not_stop_the_batch() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("changes.log");
    let journal = Arc::new(EventLog::open(&log_path).unwrap());
    let sent = tmp.path().join("sent");

    // record every successful path, fail on anything containing "bad"
    let script = format!(
        r#"case "$1" in *bad*) echo nope >&2; exit 1;; esac; echo "$1" >> "{}""#,
        sent.display()
    );
    let d = ScpDispatcher::new(sh(&script), target()).with_journal(journal);
    d.dispatch(batch_of(["/opt/hole/good1", "/opt/hole/bad", "/opt/hole/good2"]));

    let mut ok: Vec<String> = fs::read_to_string(&sent)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    ok.sort();
    assert_eq!(ok, ["/opt/hole/good1", "/opt/hole/good2"]);

    let entries: Vec<LogEntry> = fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "/opt/hole/bad");
    assert_eq!(entries[0].level, Some(LogLevel::Error));
    assert!(entries[0].action.contains("nope"));
}

#[test]
fn channel_dispatcher_survives_a_dropped_receiver() {
    let (tx, rx) = unbounded::<Batch>();
    tx.dispatch(batch_of(["/opt/hole/a"]));
    assert_eq!(rx.recv().unwrap().len(), 1);
    drop(rx);
    tx.dispatch(batch_of(["/opt/hole/b"]));
}

#[test]
fn log_dispatcher_accepts_any_batch() {
    LogDispatcher.dispatch(batch_of(["/opt/hole/a", "/opt/hole/b"]));
    LogDispatcher.dispatch(Default::default());
}
