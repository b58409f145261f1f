#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: book a lesson and stop before anything is due
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "type,at,lesson,student,teacher,start,duration,amount,method").unwrap();
    writeln!(csv1, "book,2026-03-01T09:00:00Z,1,s1,t1,2026-03-02T10:00:00Z,60,25,card").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("lessonbook"));
    cmd1.arg("process").arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,s1,t1,2026-03-02T10:00:00+00:00,scheduled"));

    // 2. Second run: only advance the clock past the auto-completion deadline
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "type,at,lesson,student,teacher,start,duration,amount,method").unwrap();
    writeln!(csv2, "tick,2026-03-05T00:00:00Z,,,,,,,").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("lessonbook"));
    cmd2.arg("process")
        .arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--report")
        .arg("balances");

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // The auto-completion task survived the restart and paid the teacher
    assert!(stdout2.contains("t1,20.00"));

    // 3. Third run: replaying the tick must not pay again
    let mut cmd3 = Command::new(cargo_bin!("lessonbook"));
    cmd3.arg("process")
        .arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--report")
        .arg("balances");

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    assert!(String::from_utf8_lossy(&output3.stdout).contains("t1,20.00"));
}
