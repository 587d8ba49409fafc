use chrono::NaiveDateTime;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use tracing::warn;

use crate::plan;
use crate::scrape;
use crate::types::{FormSpec, RenderPlan, Tally, ViewRow, PLACEHOLDER};

/// Run the whole pass over a raw document.
///
/// When the expected anchors are missing the input comes back unchanged,
/// byte for byte; the failure is only logged.
pub fn modernize(raw: &str, now: NaiveDateTime) -> String {
    match scrape::extract(raw) {
        Ok(data) => render_page(&plan::build_plan(&data, now)).into_string(),
        Err(e) => {
            warn!(error = %e, "page structure not recognized, leaving it untouched");
            raw.to_string()
        }
    }
}

/// Render the merged assignment view
pub fn render_page(plan: &RenderPlan) -> Markup {
    html! {
        (DOCTYPE)
        html lang="ja" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "課題提出" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "課題提出" }
                    (summary_card(&plan.tally))
                    table.assignments {
                        thead {
                            tr {
                                th { "課題" }
                                th { "提出日" }
                                th { "締切" }
                                th { "状況" }
                                th { "残り時間" }
                                th { "ファイル" }
                                th { "採点" }
                                th { "コメント" }
                                th { "操作" }
                            }
                        }
                        tbody {
                            @if plan.rows.is_empty() {
                                tr { td.empty-state colspan="9" { "課題が見つかりませんでした。" } }
                            } @else {
                                @for row in &plan.rows {
                                    (view_row(row))
                                }
                            }
                        }
                    }
                    (native_form(plan))
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn summary_card(tally: &Tally) -> Markup {
    let rate = tally.completion_rate();
    html! {
        div.submission-summary {
            div.summary-stats {
                div.stat-item {
                    span.stat-number { (tally.submitted) }
                    span.stat-label { "提出済み" }
                }
                div.stat-divider { "/" }
                div.stat-item {
                    span.stat-number { (tally.total) }
                    span.stat-label { "総課題数" }
                }
            }
            div.completion-rate {
                div.progress-bar {
                    div.progress-fill style=(format!("width: {}%", rate)) {}
                }
                span.rate-text { (rate) "% 完了" }
            }
            @if tally.remaining() > 0 {
                div.remaining-alert {
                    "⚠️ 残り " strong { (tally.remaining()) "個" } " の課題があります"
                }
            } @else {
                div.completion-badge { "🎉 全ての課題が完了しました！" }
            }
        }
    }
}

fn view_row(row: &ViewRow) -> Markup {
    html! {
        tr class=(row.css_classes()) {
            td.assignment-id { (row.id) }
            td { (row.submitted_date) }
            td.deadline { (row.deadline) }
            td {
                @if row.submitted {
                    span.status-badge.submitted { "✅ 済" }
                } @else {
                    span.status-badge.not-submitted { "❌ 未" }
                }
            }
            td.countdown {
                @match row.time_left {
                    Some(left) => { (left) }
                    None => { (PLACEHOLDER) }
                }
            }
            td.file-cell {
                @match &row.file_html {
                    Some(markup) => {
                        (PreEscaped(markup.as_str()))
                        @if let Some(at) = &row.submitted_at {
                            div.submitted-at { (at) }
                        }
                    }
                    None => { (PLACEHOLDER) }
                }
            }
            td {
                @match &row.grading_html {
                    Some(markup) => { (PreEscaped(markup.as_str())) }
                    None => { (PLACEHOLDER) }
                }
            }
            td.comment-cell {
                @match &row.comment_html {
                    Some(markup) => { (PreEscaped(markup.as_str())) }
                    None => { (PLACEHOLDER) }
                }
            }
            td.action {
                form.submit-form method="post" action="/submit" {
                    input type="hidden" name="assignment" value=(row.id);
                    button.submit-btn type="submit" { "提出" }
                }
            }
        }
    }
}

/// The original form, visually retired but kept functional so the direct
/// submission path survives the rewrite.
fn native_form(plan: &RenderPlan) -> Markup {
    let form = &plan.form;
    html! {
        form.native-form method="post" action=(form.action) aria-hidden="true" {
            select name=(form.exercise_field) {
                @for row in &plan.rows {
                    option value=(row.id) { (row.id) }
                }
            }
            input type="hidden" name=(form.student_field) value=(form.student_id);
            input type="submit" name=(form.submit_field) value=(form.trigger_value);
        }
    }
}

/// A self-submitting page that delivers one submission as a plain form
/// post straight to the institution server. Served when the relayed
/// request failed.
pub fn render_fallback(action: &str, form: &FormSpec, assignment_id: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="ja" {
            head {
                meta charset="UTF-8";
                title { "課題提出" }
            }
            body onload="document.forms[0].submit()" {
                p { "通信に失敗したため、通常のフォーム送信で提出します…" }
                form method="post" action=(action) {
                    input type="hidden" name=(form.exercise_field) value=(assignment_id);
                    input type="hidden" name=(form.student_field) value=(form.student_id);
                    input type="hidden" name=(form.submit_field) value=(form.trigger_value);
                    button type="submit" { "提出" }
                }
            }
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: "Hiragino Kaku Gothic ProN", "Noto Sans JP", -apple-system, sans-serif;
    background: #f4f6f8;
    color: #1f2933;
    line-height: 1.5;
    padding: 32px 16px;
}

.container {
    max-width: 1100px;
    margin: 0 auto;
}

h1 {
    font-size: 1.6em;
    font-weight: 700;
    margin-bottom: 20px;
}

.submission-summary {
    background: #fff;
    border: 1px solid #e1e5ea;
    border-radius: 8px;
    padding: 20px 24px;
    margin-bottom: 24px;
}

.summary-stats {
    display: flex;
    align-items: baseline;
    gap: 12px;
    margin-bottom: 12px;
}

.stat-number {
    font-size: 1.8em;
    font-weight: 700;
    margin-right: 4px;
}

.stat-label {
    color: #6b7480;
    font-size: 0.85em;
}

.stat-divider {
    color: #c3c9d1;
    font-size: 1.4em;
}

.progress-bar {
    background: #e1e5ea;
    border-radius: 4px;
    height: 8px;
    overflow: hidden;
    margin-bottom: 6px;
}

.progress-fill {
    background: #2f9e66;
    height: 100%;
}

.rate-text {
    color: #6b7480;
    font-size: 0.85em;
}

.remaining-alert {
    margin-top: 12px;
    color: #8a5a00;
    background: #fff6e0;
    border-radius: 6px;
    padding: 8px 12px;
    font-size: 0.9em;
}

.completion-badge {
    margin-top: 12px;
    color: #1d6f46;
    background: #e7f6ee;
    border-radius: 6px;
    padding: 8px 12px;
    font-size: 0.9em;
}

table.assignments {
    width: 100%;
    border-collapse: collapse;
    background: #fff;
    border: 1px solid #e1e5ea;
    border-radius: 8px;
    overflow: hidden;
}

.assignments th {
    background: #f8f9fa;
    text-align: left;
    font-size: 0.85em;
    color: #6b7480;
    padding: 10px 12px;
    border-bottom: 1px solid #e1e5ea;
}

.assignments td {
    padding: 10px 12px;
    border-bottom: 1px solid #eef0f3;
    vertical-align: top;
    font-size: 0.95em;
}

.assignments tr:last-child td {
    border-bottom: none;
}

.assignment-id {
    font-weight: 700;
}

.status-badge {
    display: inline-block;
    border-radius: 12px;
    padding: 2px 10px;
    font-size: 0.85em;
    white-space: nowrap;
}

.status-badge.submitted {
    background: #e7f6ee;
    color: #1d6f46;
}

.status-badge.not-submitted {
    background: #fdecec;
    color: #b3261e;
}

.submitted-row {
    background: #fbfdfc;
}

.missed .countdown,
.missed .deadline {
    color: #b3261e;
    font-weight: 700;
}

.due-today .countdown {
    color: #b3261e;
    font-weight: 700;
}

.due-soon .countdown {
    color: #8a5a00;
    font-weight: 700;
}

.submitted-at {
    color: #6b7480;
    font-size: 0.85em;
    margin-top: 2px;
}

.comment-cell {
    max-width: 260px;
}

.submit-btn {
    background: #2457a7;
    color: #fff;
    border: none;
    border-radius: 6px;
    padding: 6px 16px;
    font-size: 0.9em;
    cursor: pointer;
}

.submit-btn:hover {
    background: #1c4486;
}

.submit-btn:disabled {
    background: #9fb3d1;
    cursor: wait;
}

.empty-state {
    text-align: center;
    color: #6b7480;
    padding: 40px 0;
}

.native-form {
    display: none;
}
"#;

const JAVASCRIPT: &str = r#"
// One submission per click: freeze the pressed button until the server's
// response replaces this page.
document.querySelectorAll('form.submit-form').forEach(form => {
    form.addEventListener('submit', function () {
        const btn = form.querySelector('.submit-btn');
        if (btn) {
            btn.disabled = true;
            btn.textContent = '送信中…';
        }
    });
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon_may_first() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn sample_page() -> String {
        r#"<html><body>
<font size="+1">これまでの提出状況</font><hr>
<table border="3">
<tr><td>課題</td><td>ファイル</td><td>提出時間</td><td>採点</td><td>コメント</td></tr>
<tr><td>1</td><td><a href="files/1.pdf">1.pdf</a></td><td>04301646</td><td>A</td><td></td></tr>
</table>
<hr>課題提出処理
<table border="3">
<tr><td>課題</td><td>提出日</td><td>締切</td></tr>
<tr><td>1</td><td>0430</td><td>05011700</td></tr>
<tr><td>2</td><td></td><td>04301000</td></tr>
<tr><td>3</td><td></td><td>未定</td></tr>
</table>
<form action="hw25.php" method="post">
<p><select name="exerciseID"><option value="1">1</option></select></p>
<p><input type="text" name="studentID" value="s2400123"></p>
<p><input type="submit" name="select" value="次へ"></p>
</form>
<table><tr><td>提出回数</td><td>1/3</td></tr></table>
</body></html>"#
            .to_string()
    }

    // ========== modernize tests ==========

    #[test]
    fn test_modernize_renders_merged_view() {
        let rendered = modernize(&sample_page(), noon_may_first());

        // Fixed column set
        for header in ["課題", "提出日", "締切", "状況", "残り時間", "ファイル", "採点", "コメント", "操作"] {
            assert!(rendered.contains(header), "missing header {}", header);
        }

        // Row 1 submitted with its file link carried over
        assert!(rendered.contains("✅ 済"));
        assert!(rendered.contains(r#"<a href="files/1.pdf">1.pdf</a>"#));
        assert!(rendered.contains("04/30 16:46"));

        // Row 2 missed, row 3 placeholder deadline
        assert!(rendered.contains("not-submitted-row missed"));
        assert!(rendered.contains("期限切れ"));
        assert!(rendered.contains(PLACEHOLDER));

        // Row 1 is due within 24h of the fixed now
        assert!(rendered.contains("submitted-row due-today"));
    }

    #[test]
    fn test_modernize_summary_card() {
        let rendered = modernize(&sample_page(), noon_may_first());
        assert!(rendered.contains("submission-summary"));
        assert!(rendered.contains("width: 33%"));
        assert!(rendered.contains("提出済み"));
    }

    #[test]
    fn test_modernize_action_forms() {
        let rendered = modernize(&sample_page(), noon_may_first());
        assert!(rendered.contains(r#"action="/submit""#));
        assert!(rendered.contains(r#"name="assignment" value="2""#));
    }

    #[test]
    fn test_modernize_keeps_native_form() {
        let rendered = modernize(&sample_page(), noon_may_first());
        assert!(rendered.contains("native-form"));
        assert!(rendered.contains(r#"action="hw25.php""#));
        assert!(rendered.contains(r#"name="studentID" value="s2400123""#));
        assert!(rendered.contains(r#"name="select" value="次へ""#));
    }

    #[test]
    fn test_modernize_drops_original_clutter() {
        let rendered = modernize(&sample_page(), noon_may_first());
        assert!(!rendered.contains("これまでの提出状況"));
        assert!(!rendered.contains("課題提出処理"));
        assert!(!rendered.contains(r#"border="3""#));
    }

    #[test]
    fn test_modernize_unrecognized_page_is_untouched() {
        let raw = "<html><body><p>メンテナンス中</p></body></html>";
        assert_eq!(modernize(raw, noon_may_first()), raw);
    }

    #[test]
    fn test_modernize_missing_form_is_untouched() {
        let raw = sample_page().replace("action=\"hw25.php\"", "action=\"other.php\"");
        assert_eq!(modernize(&raw, noon_may_first()), raw);
    }

    // ========== render_fallback tests ==========

    #[test]
    fn test_render_fallback_posts_directly() {
        let form = FormSpec {
            action: "hw25.php".to_string(),
            exercise_field: "exerciseID".to_string(),
            student_field: "studentID".to_string(),
            student_id: "s2400123".to_string(),
            submit_field: "select".to_string(),
            trigger_value: "次へ".to_string(),
        };

        let page = render_fallback("http://school.example/hw25.php", &form, "12").into_string();

        assert!(page.contains(r#"action="http://school.example/hw25.php""#));
        assert!(page.contains(r#"name="exerciseID" value="12""#));
        assert!(page.contains(r#"name="studentID" value="s2400123""#));
        assert!(page.contains(r#"name="select" value="次へ""#));
        assert!(page.contains("document.forms[0].submit()"));
    }
}
