use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::AttendanceRecord;

/// Identifies the single authoritative record per student per day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey<'a> {
    pub student_id: &'a str,
    pub date: NaiveDate,
}

impl<'a> From<&'a AttendanceRecord> for DedupKey<'a> {
    fn from(record: &'a AttendanceRecord) -> Self {
        Self {
            student_id: &record.student_id,
            date: record.date,
        }
    }
}

/// Records whose key has not been seen earlier in `records`, in input order.
pub fn first_occurrences<'a>(
    records: &'a [AttendanceRecord],
) -> impl Iterator<Item = &'a AttendanceRecord> + 'a {
    let mut seen: HashSet<DedupKey<'a>> = HashSet::new();
    records
        .iter()
        .filter(move |record| seen.insert(DedupKey::from(*record)))
}

/// Keep the first record for each (student_id, date); later ones are dropped silently.
pub fn dedup(records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
    let keep: Vec<bool> = {
        let mut seen: HashSet<DedupKey<'_>> = HashSet::new();
        records
            .iter()
            .map(|record| seen.insert(DedupKey::from(record)))
            .collect()
    };

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
