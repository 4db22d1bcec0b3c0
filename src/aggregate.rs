use std::collections::{BTreeMap, HashMap};

use crate::dedup::first_occurrences;
use crate::models::{AttendanceRecord, AttendanceSummary, DayRate, StudentSummary};

pub const DEFAULT_DEFAULTER_THRESHOLD: f64 = 75.0;

#[derive(Debug)]
struct StudentCounter<'a> {
    student_id: &'a str,
    name: &'a str,
    present: usize,
    total: usize,
}

impl<'a> StudentCounter<'a> {
    fn new(student_id: &'a str) -> Self {
        Self {
            student_id,
            name: "",
            present: 0,
            total: 0,
        }
    }
}

#[derive(Debug, Default)]
struct DayCounter {
    present: usize,
    total: usize,
}

/// `present / total * 100` rounded to two decimals, ties to even; 0 when `total` is 0.
pub fn percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = present as f64 / total as f64 * 100.0;
    (raw * 100.0).round_ties_even() / 100.0
}

/// Roll deduplicated records up per student and per day.
///
/// Input is deduplicated here regardless of what the caller did. Students
/// appear in the order their id is first seen; `daily_rates` is ascending by date.
pub fn aggregate(records: &[AttendanceRecord], defaulter_threshold: f64) -> AttendanceSummary {
    let mut students: Vec<StudentCounter<'_>> = Vec::new();
    let mut student_index: HashMap<&str, usize> = HashMap::new();
    let mut daily: BTreeMap<String, DayCounter> = BTreeMap::new();

    for record in first_occurrences(records) {
        let position = match student_index.get(record.student_id.as_str()) {
            Some(position) => *position,
            None => {
                students.push(StudentCounter::new(record.student_id.as_str()));
                student_index.insert(record.student_id.as_str(), students.len() - 1);
                students.len() - 1
            }
        };

        let student = &mut students[position];
        if student.name.is_empty() && !record.student_name.is_empty() {
            student.name = record.student_name.as_str();
        }
        student.total += 1;

        let day = daily
            .entry(record.date_iso())
            .or_insert_with(DayCounter::default);
        day.total += 1;

        if record.status.is_present() {
            student.present += 1;
            day.present += 1;
        }
    }

    let students: Vec<StudentSummary> = students
        .into_iter()
        .map(|counter| StudentSummary {
            student_id: counter.student_id.to_string(),
            name: counter.name.to_string(),
            present: counter.present,
            total: counter.total,
            percentage: percentage(counter.present, counter.total),
        })
        .collect();

    let defaulters = students
        .iter()
        .filter(|student| student.percentage < defaulter_threshold)
        .cloned()
        .collect();

    let daily_rates = daily
        .into_iter()
        .map(|(date, counter)| DayRate {
            date,
            present: counter.present,
            total: counter.total,
            rate: percentage(counter.present, counter.total),
        })
        .collect();

    AttendanceSummary {
        students,
        defaulters,
        daily_rates,
    }
}

/// Students ordered by descending percentage; ties keep their input order.
pub fn rank_by_percentage(students: &[StudentSummary]) -> Vec<StudentSummary> {
    let mut ranked = students.to_vec();
    ranked.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}
