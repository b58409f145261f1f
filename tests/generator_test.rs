mod common;

#[test]
fn test_generate_lessons_csv() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("generated.csv");
    common::generate_lessons_csv(&output_path, 5).expect("Failed to generate CSV");

    let content = std::fs::read_to_string(&output_path).expect("Failed to read file");
    // Header + 5 bookings + 5 confirmations
    assert_eq!(content.lines().count(), 11);
}

#[test]
fn test_generated_teachers_are_spread() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("spread.csv");
    common::generate_lessons_csv(&output_path, 2_000).expect("Failed to generate CSV");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&output_path)
        .expect("Failed to open CSV");

    let mut teachers = std::collections::HashSet::new();
    for result in reader.records() {
        let record = result.expect("Failed to read record");
        if &record[0] != "book" {
            continue;
        }
        let teacher: u32 = record[4]
            .trim_start_matches('t')
            .parse()
            .expect("Failed to parse teacher id");
        assert!((1..=50).contains(&teacher));
        teachers.insert(teacher);
    }

    assert!(
        teachers.len() >= 40,
        "Should have seen most teachers (at least 40/50)"
    );
}
