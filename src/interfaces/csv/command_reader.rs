use crate::application::commands::{
    BookLessonCommand, CompleteLessonCommand, MarkAbsentCommand, MarkAttendedCommand,
    RescheduleCommand,
};
use crate::domain::lesson::{LessonId, Party};
use crate::domain::money::Amount;
use crate::domain::payout::PayoutMethod;
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Book,
    Attended,
    StudentAbsent,
    TeacherAbsent,
    Confirm,
    Reschedule,
    Payout,
    Tick,
}

/// One raw CSV row. Which optional columns are required depends on `type`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub at: DateTime<Utc>,
    pub lesson: Option<LessonId>,
    pub student: Option<String>,
    pub teacher: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub duration: Option<u32>,
    pub amount: Option<Decimal>,
    pub method: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Book(BookLessonCommand),
    Attended(MarkAttendedCommand),
    Absent(MarkAbsentCommand),
    Confirm(CompleteLessonCommand),
    Reschedule(RescheduleCommand),
    Payout {
        teacher: String,
        amount: Decimal,
        method: PayoutMethod,
    },
    /// Only advances the clock so due tasks run.
    Tick,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TimedCommand {
    pub at: DateTime<Utc>,
    pub command: Command,
}

fn required<T>(value: Option<T>, kind: CommandType, field: &str) -> Result<T> {
    value.ok_or_else(|| BookingError::ValidationError(format!("{kind:?} requires `{field}`")))
}

impl TryFrom<CommandRecord> for TimedCommand {
    type Error = BookingError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let kind = record.r#type;
        let lesson = || required(record.lesson, kind, "lesson");
        let command = match kind {
            CommandType::Book => Command::Book(BookLessonCommand {
                lesson: lesson()?,
                student: required(record.student.clone(), kind, "student")?,
                teacher: required(record.teacher.clone(), kind, "teacher")?,
                starts_at: required(record.start, kind, "start")?,
                duration_minutes: required(record.duration, kind, "duration")?,
                price: Amount::new(required(record.amount, kind, "amount")?)?,
                payment_method: record.method.clone(),
            }),
            CommandType::Attended => Command::Attended(MarkAttendedCommand { lesson: lesson()? }),
            CommandType::StudentAbsent => Command::Absent(MarkAbsentCommand {
                lesson: lesson()?,
                party: Party::Student,
            }),
            CommandType::TeacherAbsent => Command::Absent(MarkAbsentCommand {
                lesson: lesson()?,
                party: Party::Teacher,
            }),
            CommandType::Confirm => Command::Confirm(CompleteLessonCommand {
                lesson: lesson()?,
                student: required(record.student.clone(), kind, "student")?,
            }),
            CommandType::Reschedule => Command::Reschedule(RescheduleCommand {
                lesson: lesson()?,
                new_start: required(record.start, kind, "start")?,
            }),
            CommandType::Payout => Command::Payout {
                teacher: required(record.teacher.clone(), kind, "teacher")?,
                amount: required(record.amount, kind, "amount")?,
                method: required(record.method.as_deref(), kind, "method")?.parse()?,
            },
            CommandType::Tick => Command::Tick,
        };
        Ok(Self {
            at: record.at,
            command,
        })
    }
}

/// Reads timestamped lifecycle commands from a CSV source.
///
/// Like the rest of the CSV interface this streams rows lazily; a malformed
/// row yields an error for that row only.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<TimedCommand>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| result.map_err(BookingError::from).and_then(TimedCommand::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const HEADER: &str = "type,at,lesson,student,teacher,start,duration,amount,method";

    fn read(rows: &str) -> Vec<Result<TimedCommand>> {
        let data = format!("{HEADER}\n{rows}");
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "book,2026-03-01T09:00:00Z,1,s1,t1,2026-03-02T10:00:00Z,60,25,card\n\
             student_absent,2026-03-02T11:00:00Z,1,,,,,,\n\
             payout,2026-03-05T00:00:00Z,,,t1,,,10,paypal\n\
             tick,2026-03-06T00:00:00Z,,,,,,,",
        );
        assert_eq!(results.len(), 4);

        let book = results[0].as_ref().unwrap();
        assert_eq!(book.at, Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        match &book.command {
            Command::Book(cmd) => {
                assert_eq!(cmd.lesson, 1);
                assert_eq!(cmd.price.value(), dec!(25));
                assert_eq!(cmd.payment_method.as_deref(), Some("card"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(
            results[1].as_ref().unwrap().command,
            Command::Absent(MarkAbsentCommand {
                lesson: 1,
                party: Party::Student
            })
        );
        assert_eq!(
            results[2].as_ref().unwrap().command,
            Command::Payout {
                teacher: "t1".into(),
                amount: dec!(10),
                method: PayoutMethod::Paypal
            }
        );
        assert_eq!(results[3].as_ref().unwrap().command, Command::Tick);
    }

    #[test]
    fn test_reader_missing_booking_field() {
        let results = read("book,2026-03-01T09:00:00Z,1,s1,,2026-03-02T10:00:00Z,60,25,");
        assert!(matches!(
            results[0],
            Err(BookingError::ValidationError(ref msg)) if msg.contains("teacher")
        ));
    }

    #[test]
    fn test_reader_malformed_line() {
        let results = read(
            "cancel_everything,2026-03-01T09:00:00Z,1,,,,,,\n\
             tick,not-a-date,,,,,,,\n\
             payout,2026-03-05T00:00:00Z,,,t1,,,10,venmo",
        );
        assert!(matches!(results[0], Err(BookingError::CsvError(_))));
        assert!(matches!(results[1], Err(BookingError::CsvError(_))));
        assert!(matches!(
            results[2],
            Err(BookingError::UnsupportedPaymentMethod(_))
        ));
    }
}
