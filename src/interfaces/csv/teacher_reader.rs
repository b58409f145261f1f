use crate::domain::catalog::TeacherProfile;
use crate::error::{BookingError, Result};
use std::io::Read;

/// Reads teacher profiles for the catalog from CSV.
pub struct TeacherReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TeacherReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn teachers(self) -> impl Iterator<Item = Result<TeacherProfile>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BookingError::from))
    }
}
