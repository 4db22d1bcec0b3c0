use std::fmt::{self, Write};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::normalize::DATE_FORMAT;

/// Attendance status as stored in the table's `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Present,
    Absent,
    Late,
    HalfDay,
    /// First character of an unrecognised status, accepted in permissive mode.
    Unchecked(char),
    /// No status was supplied.
    Blank,
}

impl Status {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(Status::Present),
            "A" => Some(Status::Absent),
            "L" => Some(Status::Late),
            "H" => Some(Status::HalfDay),
            _ => None,
        }
    }

    /// Single-character on-disk code; `None` for `Blank`.
    pub fn code(&self) -> Option<char> {
        match self {
            Status::Present => Some('P'),
            Status::Absent => Some('A'),
            Status::Late => Some('L'),
            Status::HalfDay => Some('H'),
            Status::Unchecked(c) => Some(*c),
            Status::Blank => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Status::Present)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(c) => f.write_char(c),
            None => Ok(()),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.code() {
            Some(c) => serializer.serialize_char(c),
            None => serializer.serialize_str(""),
        }
    }
}

/// One row as it arrives from the CLI or the CSV table, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: String,
}

impl RawRecord {
    pub fn new(
        student_id: impl Into<String>,
        student_name: impl Into<String>,
        date: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            student_name: student_name.into(),
            date: date.into(),
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub student_name: String,
    pub date: NaiveDate,
    pub status: Status,
}

impl AttendanceRecord {
    pub fn date_iso(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Serialized shape of a table row.
#[derive(Debug, Serialize)]
pub struct StoredRow<'a> {
    pub student_id: &'a str,
    pub student_name: &'a str,
    pub date: String,
    pub status: Status,
}

impl<'a> From<&'a AttendanceRecord> for StoredRow<'a> {
    fn from(record: &'a AttendanceRecord) -> Self {
        Self {
            student_id: &record.student_id,
            student_name: &record.student_name,
            date: record.date_iso(),
            status: record.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub name: String,
    pub present: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRate {
    pub date: String,
    pub present: usize,
    pub total: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub students: Vec<StudentSummary>,
    pub defaulters: Vec<StudentSummary>,
    pub daily_rates: Vec<DayRate>,
}
