//! Extraction of the homework page's tables and submission form.
//!
//! The page is server-rendered with positional structure only: the two
//! `border="3"` tables are, in document order, the submission status table
//! and the assignment list table; a plain trailing table carries the
//! submitted/total count; the form is found by its action path. Everything
//! here reads fixed cell positions and stays tolerant of noise rows.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::types::{Assignment, FormSpec, PageData, Submission, Tally};

/// Path fragment identifying the submission form's action
pub const FORM_ACTION_FRAGMENT: &str = "hw25.php";

/// Trigger literal the server expects from the submit control
const DEFAULT_TRIGGER: &str = "次へ";

/// An expected anchor was not found; the caller leaves the page alone
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnchorError {
    #[error("submission status table not found")]
    MissingSubmissionTable,

    #[error("assignment list table not found")]
    MissingAssignmentTable,

    #[error("submission form not found")]
    MissingForm,

    #[error("submission form lacks its {0} field")]
    IncompleteForm(&'static str),
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Collapse whitespace and decode entities in cell text
pub fn clean_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell_text(cell: &ElementRef) -> String {
    clean_text(&cell.text().collect::<String>())
}

/// Locate the three tables and the form, and pull out both relations.
///
/// Any missing anchor aborts the whole pass with a typed error; nothing is
/// read past the first failure.
pub fn extract(html: &str) -> Result<PageData, AnchorError> {
    let doc = Html::parse_document(html);

    let bordered = sel("table[border=\"3\"]");
    let mut tables = doc.select(&bordered);
    let submission_table = tables.next().ok_or(AnchorError::MissingSubmissionTable)?;
    let assignment_table = tables.next().ok_or(AnchorError::MissingAssignmentTable)?;

    let form = locate_form(&doc)?;
    let assignments = collect_assignments(assignment_table);
    let submissions = collect_submissions(submission_table);
    let tally = parse_tally(&doc);

    debug!(
        assignments = assignments.len(),
        submissions = submissions.len(),
        "page extracted"
    );

    Ok(PageData {
        assignments,
        submissions,
        tally,
        form,
    })
}

/// Read the assignment list: id, submitted date, deadline per row
fn collect_assignments(table: ElementRef) -> Vec<Assignment> {
    let tr = sel("tr");
    let td = sel("td");

    table
        .select(&tr)
        .skip(1) // header row
        .filter_map(|row| {
            let cells: Vec<ElementRef> = row.select(&td).collect();
            if cells.len() < 3 {
                return None;
            }
            let id = cell_text(&cells[0]);
            if id.is_empty() {
                return None;
            }
            Some(Assignment {
                id,
                submitted_raw: cell_text(&cells[1]),
                deadline_raw: cell_text(&cells[2]),
            })
        })
        .collect()
}

/// Build the id map of uploaded submissions.
///
/// A row only counts once its file cell contains a real download link;
/// placeholder text in that cell is not a submission.
fn collect_submissions(table: ElementRef) -> HashMap<String, Submission> {
    let tr = sel("tr");
    let td = sel("td");
    let link = sel("a");

    let mut submissions = HashMap::new();
    for row in table.select(&tr).skip(1) {
        let cells: Vec<ElementRef> = row.select(&td).collect();
        if cells.len() < 2 {
            continue;
        }
        let id = cell_text(&cells[0]);
        let has_file = cells[1].select(&link).next().is_some();
        if id.is_empty() || !has_file {
            continue;
        }
        submissions.insert(
            id.clone(),
            Submission {
                id,
                file_html: cells[1].inner_html(),
                submitted_at_raw: cells.get(2).map(cell_text).unwrap_or_default(),
                grading_html: cells.get(3).map(|c| c.inner_html()).unwrap_or_default(),
                comment_html: cells.get(4).map(|c| c.inner_html()).unwrap_or_default(),
            },
        );
    }
    submissions
}

/// Find the submission form and reduce it to a relayable spec
fn locate_form(doc: &Html) -> Result<FormSpec, AnchorError> {
    let forms = sel("form");
    let form = doc
        .select(&forms)
        .find(|f| {
            f.value()
                .attr("action")
                .map(|a| a.contains(FORM_ACTION_FRAGMENT))
                .unwrap_or(false)
        })
        .ok_or(AnchorError::MissingForm)?;

    let action = form.value().attr("action").unwrap_or_default().to_string();

    let select = form
        .select(&sel("select"))
        .next()
        .ok_or(AnchorError::IncompleteForm("select"))?;
    let exercise_field = select.value().attr("name").unwrap_or("exerciseID").to_string();

    let student = form
        .select(&sel("input[name=\"studentID\"]"))
        .next()
        .ok_or(AnchorError::IncompleteForm("studentID"))?;
    let student_id = student.value().attr("value").unwrap_or_default().to_string();

    let submit = form.select(&sel("input[type=\"submit\"]")).next();
    let submit_field = submit
        .and_then(|s| s.value().attr("name"))
        .unwrap_or("select")
        .to_string();
    let trigger_value = submit
        .and_then(|s| s.value().attr("value"))
        .unwrap_or(DEFAULT_TRIGGER)
        .to_string();

    Ok(FormSpec {
        action,
        exercise_field,
        student_field: "studentID".to_string(),
        student_id,
        submit_field,
        trigger_value,
    })
}

/// Read the submitted/total count out of the page's last table
fn parse_tally(doc: &Html) -> Option<Tally> {
    let tables = sel("table");
    let td = sel("td");

    let cell = doc.select(&tables).last()?.select(&td).last()?;
    let text = cell_text(&cell);
    let (submitted, total) = text.split_once('/')?;
    Some(Tally {
        submitted: submitted.trim().parse().ok()?,
        total: total.trim().parse().ok()?,
    })
}
