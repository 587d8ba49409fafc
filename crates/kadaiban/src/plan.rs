//! Pure merge of the two scraped relations into the rendered row set.
//!
//! Everything here is a function of the extracted page data and a passed-in
//! "now"; no DOM, no network, no clock reads.

use chrono::{Datelike, NaiveDateTime};

use crate::deadline;
use crate::types::{
    Assignment, PageData, RenderPlan, Submission, Tally, Urgency, ViewRow, PLACEHOLDER,
};

/// Join assignments against the submission map and classify every row.
///
/// Deadlines are interpreted in `now`'s calendar year and countdowns are
/// relative to `now` itself.
pub fn build_plan(data: &PageData, now: NaiveDateTime) -> RenderPlan {
    let rows: Vec<ViewRow> = data
        .assignments
        .iter()
        .map(|assignment| build_row(assignment, data.submissions.get(&assignment.id), now))
        .collect();

    // Prefer the count the server prints; fall back to counting rows
    let tally = data.tally.unwrap_or_else(|| Tally {
        submitted: rows.iter().filter(|r| r.submitted).count(),
        total: rows.len(),
    });

    RenderPlan {
        rows,
        tally,
        form: data.form.clone(),
    }
}

fn build_row(
    assignment: &Assignment,
    submission: Option<&Submission>,
    now: NaiveDateTime,
) -> ViewRow {
    let submitted = submission.is_some();

    let (time_left, urgency) =
        match deadline::parse_compact_stamp(&assignment.deadline_raw, now.year()) {
            Ok(stamp) => (
                Some(deadline::time_left(stamp, now)),
                deadline::classify(stamp, now, submitted),
            ),
            Err(_) => (None, Urgency::Normal),
        };

    ViewRow {
        id: assignment.id.clone(),
        submitted,
        submitted_date: format_submitted_date(&assignment.submitted_raw),
        deadline: deadline::format_compact_stamp(&assignment.deadline_raw)
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        time_left,
        urgency,
        file_html: submission.map(|s| s.file_html.clone()),
        submitted_at: submission.and_then(format_submitted_at),
        grading_html: submission
            .map(|s| s.grading_html.clone())
            .filter(|html| !html.trim().is_empty()),
        comment_html: submission
            .map(|s| s.comment_html.clone())
            .filter(|html| !html.trim().is_empty()),
    }
}

/// MMDD dates get reformatted; anything else the server printed is shown
/// as-is, and an empty cell becomes the placeholder.
fn format_submitted_date(raw: &str) -> String {
    if let Some(formatted) = deadline::format_compact_date(raw) {
        return formatted;
    }
    if raw.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        raw.to_string()
    }
}

fn format_submitted_at(submission: &Submission) -> Option<String> {
    let raw = submission.submitted_at_raw.as_str();
    if raw.is_empty() {
        return None;
    }
    Some(deadline::format_compact_stamp(raw).unwrap_or_else(|| raw.to_string()))
}
