//! Interchangeable renderers for exported test cases.
//!
//! Each formatter is a pure function from a list of [`TestCaseExport`]
//! values to a serialized document. Every formatter has a defined
//! empty-state output rather than failing on an empty input.

use std::fmt::Write;

use testrail_platform::case::CaseStep;

use crate::export::TestCaseExport;

/// A renderer from exported test cases to a serialized document.
pub trait TestCaseFormatter {
    fn format(&self, test_cases: &[TestCaseExport]) -> String;
}

/// Pretty-printed JSON array.
pub struct JsonFormatter;

impl TestCaseFormatter for JsonFormatter {
    fn format(&self, test_cases: &[TestCaseExport]) -> String {
        serde_json::to_string_pretty(test_cases).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Quoted CSV with a fixed header row, one row per case.
pub struct CsvFormatter;

impl TestCaseFormatter for CsvFormatter {
    fn format(&self, test_cases: &[TestCaseExport]) -> String {
        if test_cases.is_empty() {
            return String::new();
        }

        let headers = [
            "ID",
            "Title",
            "Suite",
            "Section",
            "Description",
            "Preconditions",
            "Steps",
            "Expected Result",
            "Tags",
        ];

        let mut lines = Vec::with_capacity(test_cases.len() + 1);
        lines.push(headers.join(","));

        for tc in test_cases {
            let row = [
                format!("C{}", tc.id),
                csv_quote(&tc.title),
                csv_quote(tc.suite_name.as_deref().unwrap_or_default()),
                csv_quote(tc.section_name.as_deref().unwrap_or_default()),
                csv_quote(tc.description.as_deref().unwrap_or_default()),
                csv_quote(tc.preconditions.as_deref().unwrap_or_default()),
                csv_quote(&format_steps_as_string(tc.steps.as_deref())),
                csv_quote(tc.expected.as_deref().unwrap_or_default()),
                csv_quote(&tc.tags.join(", ")),
            ];
            lines.push(row.join(","));
        }

        lines.join("\n")
    }
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Markdown document with a suite/section/case heading hierarchy.
pub struct MarkdownFormatter;

impl TestCaseFormatter for MarkdownFormatter {
    fn format(&self, test_cases: &[TestCaseExport]) -> String {
        if test_cases.is_empty() {
            return "# No test cases found".to_string();
        }

        let mut markdown = String::from("# TestRail Test Cases\n\n");

        let refs: Vec<&TestCaseExport> = test_cases.iter().collect();
        for (suite_id, suite_cases) in group_by(&refs, |tc| tc.suite_id) {
            let suite_name = suite_cases[0]
                .suite_name
                .clone()
                .unwrap_or_else(|| format!("Suite {suite_id}"));
            let _ = writeln!(markdown, "## Suite: {suite_name}\n");

            for (section_id, section_cases) in group_by(&suite_cases, |tc| tc.section_id) {
                let section_name = section_cases[0]
                    .section_name
                    .clone()
                    .unwrap_or_else(|| format!("Section {section_id}"));
                let _ = writeln!(markdown, "### Section: {section_name}\n");

                for tc in section_cases {
                    let _ = writeln!(markdown, "#### C{}: {}\n", tc.id, tc.title);

                    if !tc.tags.is_empty() {
                        let _ = writeln!(markdown, "**Tags:** {}\n", tc.tags.join(", "));
                    }

                    if let Some(description) = &tc.description {
                        let _ = writeln!(markdown, "**Description:**\n{description}\n");
                    }

                    if let Some(preconditions) = &tc.preconditions {
                        let _ = writeln!(markdown, "**Preconditions:**\n{preconditions}\n");
                    }

                    match &tc.steps {
                        Some(steps) if !steps.is_empty() => {
                            markdown.push_str("**Steps:**\n\n");
                            markdown.push_str("| # | Step | Expected Result |\n");
                            markdown.push_str("|---|------|----------------|\n");
                            for (index, step) in steps.iter().enumerate() {
                                let _ = writeln!(
                                    markdown,
                                    "| {} | {} | {} |",
                                    index + 1,
                                    step.content.replace('|', "\\|"),
                                    step.expected.replace('|', "\\|"),
                                );
                            }
                            markdown.push('\n');
                        }
                        _ => {
                            if let Some(expected) = &tc.expected {
                                let _ =
                                    writeln!(markdown, "**Expected Result:**\n{expected}\n");
                            }
                        }
                    }

                    markdown.push_str("---\n\n");
                }
            }
        }

        markdown
    }
}

/// Inline-styled HTML document with a suite/section/case hierarchy.
pub struct HtmlFormatter;

const HTML_HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>TestRail Test Cases</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 20px; }
    h1 { color: #2980b9; }
    h2 { color: #3498db; border-bottom: 1px solid #3498db; padding-bottom: 5px; }
    h3 { color: #2c3e50; }
    h4 { color: #34495e; }
    .case { border: 1px solid #ddd; padding: 15px; margin-bottom: 20px; border-radius: 5px; }
    .case h4 { margin-top: 0; background-color: #f8f9fa; padding: 10px; border-radius: 3px; }
    .tags { color: #7f8c8d; font-size: 0.9em; }
    .steps { border-collapse: collapse; width: 100%; }
    .steps th, .steps td { border: 1px solid #ddd; padding: 8px; }
    .steps th { background-color: #f8f9fa; text-align: left; }
    .steps tr:nth-child(even) { background-color: #f9f9f9; }
    .label { font-weight: bold; margin-top: 10px; }
  </style>
</head>
<body>
  <h1>TestRail Test Cases</h1>
"#;

impl TestCaseFormatter for HtmlFormatter {
    fn format(&self, test_cases: &[TestCaseExport]) -> String {
        if test_cases.is_empty() {
            return "<html><body><h1>No test cases found</h1></body></html>".to_string();
        }

        let mut html = String::from(HTML_HEADER);

        let refs: Vec<&TestCaseExport> = test_cases.iter().collect();
        for (suite_id, suite_cases) in group_by(&refs, |tc| tc.suite_id) {
            let suite_name = suite_cases[0]
                .suite_name
                .clone()
                .unwrap_or_else(|| format!("Suite {suite_id}"));
            let _ = writeln!(html, "<h2>Suite: {}</h2>", escape_html(&suite_name));

            for (section_id, section_cases) in group_by(&suite_cases, |tc| tc.section_id) {
                let section_name = section_cases[0]
                    .section_name
                    .clone()
                    .unwrap_or_else(|| format!("Section {section_id}"));
                let _ = writeln!(html, "<h3>Section: {}</h3>", escape_html(&section_name));

                for tc in section_cases {
                    html.push_str("<div class=\"case\">\n");
                    let _ = writeln!(
                        html,
                        "<h4>C{}: {}</h4>",
                        tc.id,
                        escape_html(&tc.title)
                    );

                    if !tc.tags.is_empty() {
                        let _ = writeln!(
                            html,
                            "<div class=\"tags\">Tags: {}</div>",
                            escape_html(&tc.tags.join(", "))
                        );
                    }

                    if let Some(description) = &tc.description {
                        html.push_str("<div class=\"label\">Description:</div>\n");
                        let _ = writeln!(html, "<div>{}</div>", format_html_content(description));
                    }

                    if let Some(preconditions) = &tc.preconditions {
                        html.push_str("<div class=\"label\">Preconditions:</div>\n");
                        let _ =
                            writeln!(html, "<div>{}</div>", format_html_content(preconditions));
                    }

                    match &tc.steps {
                        Some(steps) if !steps.is_empty() => {
                            html.push_str("<div class=\"label\">Steps:</div>\n");
                            html.push_str("<table class=\"steps\">\n");
                            html.push_str(
                                "<tr><th>#</th><th>Step</th><th>Expected Result</th></tr>\n",
                            );
                            for (index, step) in steps.iter().enumerate() {
                                let _ = writeln!(
                                    html,
                                    "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                                    index + 1,
                                    format_html_content(&step.content),
                                    format_html_content(&step.expected),
                                );
                            }
                            html.push_str("</table>\n");
                        }
                        _ => {
                            if let Some(expected) = &tc.expected {
                                html.push_str("<div class=\"label\">Expected Result:</div>\n");
                                let _ =
                                    writeln!(html, "<div>{}</div>", format_html_content(expected));
                            }
                        }
                    }

                    html.push_str("</div>\n");
                }
            }
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Group cases by a key, preserving first-occurrence order of the keys.
fn group_by<'a, K: PartialEq + Copy>(
    test_cases: &[&'a TestCaseExport],
    key: impl Fn(&TestCaseExport) -> K,
) -> Vec<(K, Vec<&'a TestCaseExport>)> {
    let mut groups: Vec<(K, Vec<&'a TestCaseExport>)> = Vec::new();
    for &tc in test_cases {
        let k = key(tc);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(tc),
            None => groups.push((k, vec![tc])),
        }
    }
    groups
}

/// Format steps as a flat numbered string (used by the CSV formatter).
pub fn format_steps_as_string(steps: Option<&[CaseStep]>) -> String {
    let Some(steps) = steps else {
        return String::new();
    };

    steps
        .iter()
        .enumerate()
        .map(|(index, step)| format!("{}. {}\nExpected: {}", index + 1, step.content, step.expected))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Escape HTML special characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Escape HTML and preserve line breaks.
pub fn format_html_content(content: &str) -> String {
    escape_html(content).replace('\n', "<br>")
}
