use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Placeholder shown for fields the page left empty or unreadable
pub const PLACEHOLDER: &str = "---";

/// One row of the assignment list table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Assignment number, the join key between the two tables
    pub id: String,

    /// Submitted date as the server prints it (MMDD when set)
    pub submitted_raw: String,

    /// Deadline as the server prints it (MMDDHHMM when well-formed)
    pub deadline_raw: String,
}

/// One row of the submission status table.
///
/// Only assignments with an uploaded file get an entry; absence from the
/// id map is what encodes "not submitted".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: String,

    /// Opaque markup around the download link
    pub file_html: String,

    /// Upload timestamp as the server prints it (MMDDHHMM when well-formed)
    pub submitted_at_raw: String,

    pub grading_html: String,
    pub comment_html: String,
}

/// Submitted/total counts for the summary card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub submitted: usize,
    pub total: usize,
}

impl Tally {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.submitted)
    }

    /// Completion percentage, rounded. Zero when there are no assignments.
    pub fn completion_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.submitted as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// Time left until a deadline, bucketed for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeLeft {
    Expired,
    Hours(i64),
    Days { days: i64, hours: i64 },
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLeft::Expired => write!(f, "期限切れ"),
            TimeLeft::Hours(0) => write!(f, "あと1時間未満"),
            TimeLeft::Hours(h) => write!(f, "あと{}時間", h),
            TimeLeft::Days { days, hours } => write!(f, "あと{}日{}時間", days, hours),
        }
    }
}

/// How loudly a row should ask for attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Normal,
    /// Due within 72 hours
    Soon,
    /// Due within 24 hours
    Today,
    /// Deadline passed with nothing submitted
    Missed,
}

impl Urgency {
    /// CSS hook attached to the rendered row
    pub fn css_class(&self) -> &'static str {
        match self {
            Urgency::Normal => "",
            Urgency::Soon => "due-soon",
            Urgency::Today => "due-today",
            Urgency::Missed => "missed",
        }
    }
}

/// The live submission form, reduced to what a relayed post needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSpec {
    /// Action attribute as scraped; may be relative to the page URL
    pub action: String,

    /// Name of the select carrying the assignment number
    pub exercise_field: String,

    /// Name of the student id input
    pub student_field: String,

    /// Value of the student id input
    pub student_id: String,

    /// Name of the submit control
    pub submit_field: String,

    /// Value of the submit control; the server checks this literal
    pub trigger_value: String,
}

/// Everything extracted from one fetch of the homework page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageData {
    pub assignments: Vec<Assignment>,
    pub submissions: HashMap<String, Submission>,
    pub tally: Option<Tally>,
    pub form: FormSpec,
}

/// One merged row of the rendered table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    pub id: String,
    pub submitted: bool,

    /// Formatted submitted date from the assignment list ("05/08" or "---")
    pub submitted_date: String,

    /// Formatted deadline ("05/08 16:46" or "---")
    pub deadline: String,

    /// None when the deadline string was unreadable
    pub time_left: Option<TimeLeft>,

    pub urgency: Urgency,

    pub file_html: Option<String>,
    pub submitted_at: Option<String>,
    pub grading_html: Option<String>,
    pub comment_html: Option<String>,
}

impl ViewRow {
    /// Space-separated class list for the row element
    pub fn css_classes(&self) -> String {
        let state = if self.submitted {
            "submitted-row"
        } else {
            "not-submitted-row"
        };
        match self.urgency.css_class() {
            "" => state.to_string(),
            hook => format!("{} {}", state, hook),
        }
    }
}

/// The full plan for one render of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPlan {
    pub rows: Vec<ViewRow>,
    pub tally: Tally,
    pub form: FormSpec,
}
