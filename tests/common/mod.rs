use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 9] = [
    "type", "at", "lesson", "student", "teacher", "start", "duration", "amount", "method",
];

const METHODS: [&str; 4] = ["card", "paypal", "wallet", ""];

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Writes `lessons` bookings spread over 50 teachers, each confirmed by its
/// student once every lesson has started.
pub fn generate_lessons_csv(path: &Path, lessons: u32) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();
    wtr.write_record(HEADER)?;

    let booked_at = epoch();
    for id in 1..=lessons {
        let teacher = format!("t{}", rng.gen_range(1..=50));
        let student = format!("s{id}");
        let start = booked_at + Duration::days(1) + Duration::minutes(i64::from(id));
        let price = format!("{}.{:02}", rng.gen_range(5..=80), rng.gen_range(0..100));
        let method = METHODS[rng.gen_range(0..METHODS.len())];
        wtr.write_record([
            "book",
            &booked_at.to_rfc3339(),
            &id.to_string(),
            &student,
            &teacher,
            &start.to_rfc3339(),
            "60",
            &price,
            method,
        ])?;
    }
    let confirmed_at = booked_at + Duration::days(3);
    for id in 1..=lessons {
        wtr.write_record([
            "confirm",
            &confirmed_at.to_rfc3339(),
            &id.to_string(),
            &format!("s{id}"),
            "",
            "",
            "",
            "",
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
