use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_lessons_report() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.arg("process").arg("tests/fixtures/lessons.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "lesson,student,teacher,start,status,attendance,completion,reschedules,price,commission,tax,total,paid",
        ))
        // Confirmed by the student
        .stdout(predicate::str::contains(
            "1,s1,t1,2026-03-02T10:00:00+00:00,completed,attended,manual,0,25.00,5.00,2.10,32.10,true",
        ))
        // Student absent once, rescheduled, then auto-completed
        .stdout(predicate::str::contains(
            "2,s2,t1,2026-03-04T12:00:00+00:00,completed,pending,auto,1,40.00,8.00,3.36,51.36,true",
        ))
        // Teacher absent
        .stdout(predicate::str::contains(
            "3,s3,t2,2026-03-03T10:00:00+00:00,cancelled,absent,pending,0,30.00,6.00,2.52,38.52,false",
        ));

    Ok(())
}

#[test]
fn test_cli_balances_report() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.arg("process")
        .arg("tests/fixtures/lessons.csv")
        .arg("--report")
        .arg("balances");

    // 25 - 5 commission, plus 40 - 8 commission
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("teacher,balance"))
        .stdout(predicate::str::contains("t1,52.00"))
        .stdout(predicate::str::contains("t2,").not());

    Ok(())
}

#[test]
fn test_cli_payouts_report() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.arg("process")
        .arg("tests/fixtures/lessons.csv")
        .arg("--report")
        .arg("payouts");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("id,teacher,amount,method,status"))
        .stdout(predicate::str::contains("1,t1,10.00,paypal,pending"))
        .stdout(predicate::str::contains("bank_transfer").not())
        .stderr(predicate::str::contains("error processing command"));

    Ok(())
}

#[test]
fn test_cli_rates_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.env("LESSONBOOK_TAX_RATE", "0.10")
        .arg("process")
        .arg("tests/fixtures/lessons.csv");

    // (25 + 5) * 0.10 = 3
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("25.00,5.00,3.00,33.00,true"));

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_rate() {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.arg("process")
        .arg("tests/fixtures/lessons.csv")
        .arg("--commission-rate")
        .arg("1.5");

    cmd.assert().failure();
}

#[test]
fn test_cli_search() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.arg("search")
        .arg("tests/fixtures/teachers.csv")
        .arg("--language")
        .arg("spanish");

    let output = cmd.output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "id,name,languages,country,price,rating,reviews,experience_years",
            "t3,Maria Silva,portuguese;spanish,BR,18.00,4.9,300,9",
            "t1,Ana Lopez,english;spanish,ES,25.00,4.8,120,6",
        ]
    );

    Ok(())
}

#[test]
fn test_cli_search_price_sort_and_paging() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("lessonbook"));
    cmd.arg("search")
        .arg("tests/fixtures/teachers.csv")
        .arg("--sort")
        .arg("price-low")
        .arg("--limit")
        .arg("2")
        .arg("--page")
        .arg("2");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("t2,Luc Martin"))
        .stdout(predicate::str::contains("t4,John Reed"))
        .stdout(predicate::str::contains("t3,").not());

    Ok(())
}
