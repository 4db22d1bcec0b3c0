use std::fmt::Write;

use crate::aggregate::rank_by_percentage;
use crate::models::AttendanceSummary;

/// Plain-text summary for the terminal: top students, defaulters, daily rates.
pub fn console_summary(summary: &AttendanceSummary, threshold: f64, top: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Attendance Summary (Top {top}):");
    if summary.students.is_empty() {
        let _ = writeln!(output, "No attendance records found.");
    } else {
        for student in rank_by_percentage(&summary.students).iter().take(top) {
            let _ = writeln!(
                output,
                "{} - {}: {:.2}% ({}/{})",
                student.student_id,
                student.name,
                student.percentage,
                student.present,
                student.total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Defaulters (<{threshold}%):");
    if summary.defaulters.is_empty() {
        let _ = writeln!(output, "None.");
    } else {
        for student in summary.defaulters.iter() {
            let _ = writeln!(
                output,
                "{} - {}: {:.2}%",
                student.student_id, student.name, student.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Daily Attendance Rate:");
    if summary.daily_rates.is_empty() {
        let _ = writeln!(output, "No daily data.");
    } else {
        for day in summary.daily_rates.iter() {
            let _ = writeln!(
                output,
                "{}: {:.2}% ({}/{})",
                day.date, day.rate, day.present, day.total
            );
        }
    }

    output
}

pub fn build_report(summary: &AttendanceSummary, threshold: f64, source: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Generated from {} ({} students, {} days)",
        source,
        summary.students.len(),
        summary.daily_rates.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Attendance");

    if summary.students.is_empty() {
        let _ = writeln!(output, "No attendance records found.");
    } else {
        let _ = writeln!(output, "| Student | Name | Present | Total | Attendance |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for student in rank_by_percentage(&summary.students) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {:.2}% |",
                student.student_id,
                student.name,
                student.present,
                student.total,
                student.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Defaulters (below {threshold}%)");

    if summary.defaulters.is_empty() {
        let _ = writeln!(output, "No students below the threshold.");
    } else {
        for student in summary.defaulters.iter() {
            let _ = writeln!(
                output,
                "- {} ({}) at {:.2}%",
                student.name, student.student_id, student.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Attendance Rate");

    if summary.daily_rates.is_empty() {
        let _ = writeln!(output, "No daily data recorded.");
    } else {
        for day in summary.daily_rates.iter() {
            let _ = writeln!(
                output,
                "- {}: {:.2}% ({} of {} present)",
                day.date, day.rate, day.present, day.total
            );
        }
    }

    output
}

/// JSON hand-off for chart renderers and other external consumers.
pub fn to_json(summary: &AttendanceSummary) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
