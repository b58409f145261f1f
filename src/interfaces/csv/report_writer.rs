use crate::domain::catalog::TeacherProfile;
use crate::domain::lesson::Lesson;
use crate::domain::money::Balance;
use crate::domain::payout::PayoutRequest;
use crate::error::{BookingError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

#[derive(Serialize)]
struct LessonRow<'a> {
    lesson: u32,
    student: &'a str,
    teacher: &'a str,
    start: String,
    status: String,
    attendance: String,
    completion: String,
    reschedules: u8,
    price: String,
    commission: String,
    tax: String,
    total: String,
    paid: bool,
}

#[derive(Serialize)]
struct BalanceRow<'a> {
    teacher: &'a str,
    balance: String,
}

#[derive(Serialize)]
struct PayoutRow<'a> {
    id: u64,
    teacher: &'a str,
    amount: String,
    method: String,
    status: String,
}

#[derive(Serialize)]
struct TeacherRow<'a> {
    id: &'a str,
    name: &'a str,
    languages: &'a str,
    country: &'a str,
    price: String,
    rating: f64,
    reviews: u32,
    experience_years: u32,
}

/// Writes end-of-run reports as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_lessons(&mut self, lessons: &[Lesson]) -> Result<()> {
        for lesson in lessons {
            let pricing = lesson.pricing();
            self.writer.serialize(LessonRow {
                lesson: lesson.id,
                student: &lesson.student,
                teacher: &lesson.teacher,
                start: lesson.starts_at().to_rfc3339(),
                status: lesson.status.to_string(),
                attendance: lesson.attendance_status.to_string(),
                completion: lesson.completion_status.to_string(),
                reschedules: lesson.reschedule_count,
                price: money(pricing.base_price),
                commission: money(pricing.commission),
                tax: money(pricing.tax),
                total: money(pricing.total_amount),
                paid: lesson.payment_released,
            })?;
        }
        self.flush()
    }

    pub fn write_balances(&mut self, balances: &[(String, Balance)]) -> Result<()> {
        for (teacher, balance) in balances {
            self.writer.serialize(BalanceRow {
                teacher,
                balance: money(balance.0),
            })?;
        }
        self.flush()
    }

    pub fn write_payouts(&mut self, payouts: &[PayoutRequest]) -> Result<()> {
        for payout in payouts {
            self.writer.serialize(PayoutRow {
                id: payout.id,
                teacher: &payout.teacher,
                amount: money(payout.amount.value()),
                method: payout.method.to_string(),
                status: format!("{:?}", payout.status).to_lowercase(),
            })?;
        }
        self.flush()
    }

    pub fn write_teachers(&mut self, teachers: &[TeacherProfile]) -> Result<()> {
        for teacher in teachers {
            self.writer.serialize(TeacherRow {
                id: &teacher.id,
                name: &teacher.name,
                languages: &teacher.languages,
                country: &teacher.country,
                price: money(teacher.price),
                rating: teacher.rating,
                reviews: teacher.reviews,
                experience_years: teacher.experience_years,
            })?;
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(BookingError::from)
    }
}
