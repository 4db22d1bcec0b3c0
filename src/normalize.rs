use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::models::{AttendanceRecord, RawRecord, Status};

/// Input format accepted for the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How statuses outside `P`/`A`/`L`/`H` are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Reduce to the first character and keep it whether or not it is a known code.
    #[default]
    Permissive,
    /// Reduce to the first character and reject anything that is not a known code.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    pub policy: StatusPolicy,
}

impl Normalizer {
    pub fn new(policy: StatusPolicy) -> Self {
        Self { policy }
    }

    /// Validate and canonicalize one raw entry. Pure; never touches the table.
    pub fn normalize(&self, raw: &RawRecord) -> Result<AttendanceRecord, ValidationError> {
        let student_id = raw.student_id.trim();
        if student_id.is_empty() {
            return Err(ValidationError::MissingStudentId);
        }

        let status = self.canonical_status(&raw.status)?;
        let date = parse_date(&raw.date)?;

        Ok(AttendanceRecord {
            student_id: student_id.to_string(),
            student_name: raw.student_name.trim().to_string(),
            date,
            status,
        })
    }

    pub fn canonical_status(&self, input: &str) -> Result<Status, ValidationError> {
        let upper = input.trim().to_uppercase();
        if let Some(status) = Status::from_code(&upper) {
            return Ok(status);
        }

        // "PRESENT" -> 'P', "half day" -> 'H'
        let Some(first) = upper.chars().next() else {
            return match self.policy {
                StatusPolicy::Permissive => Ok(Status::Blank),
                StatusPolicy::Strict => Err(ValidationError::UnknownStatus(String::new())),
            };
        };

        let mut code = [0u8; 4];
        match (Status::from_code(first.encode_utf8(&mut code)), self.policy) {
            (Some(status), _) => Ok(status),
            (None, StatusPolicy::Permissive) => Ok(Status::Unchecked(first)),
            (None, StatusPolicy::Strict) => {
                Err(ValidationError::UnknownStatus(input.trim().to_string()))
            }
        }
    }
}

/// Parse a date in [`DATE_FORMAT`]; surrounding whitespace is ignored.
///
/// The year must be exactly four digits and month/day one or two digits;
/// signs and inner whitespace are rejected before chrono sees the input.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidDate(trimmed.to_string());

    let parts: Vec<&str> = trimmed.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(invalid());
    };
    let digits = |part: &str, min: usize, max: usize| {
        (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };
    if !(digits(*year, 4, 4) && digits(*month, 1, 2) && digits(*day, 1, 2)) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())
}
