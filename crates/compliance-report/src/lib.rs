// crates/compliance-report/src/lib.rs
// ============================================================================
// Module: Report Renderer
// Description: Consumes the accumulated result set and metadata, and emits
//              one self-contained HTML artifact.
// Purpose: Implements §4.F — the human-facing counterpart to the Evidence
//          Recorder's machine-facing JSON artifact.
// Dependencies: compliance-core, chrono, tempfile, thiserror, tracing
// ============================================================================

//! ## Overview
//! Layout and styling are plain Rust string constants compiled into the
//! binary — no templating crate was evidenced anywhere in the example pack
//! for a static report of this shape, so a `String` builder is used rather
//! than importing one. Results render in `BTreeMap` (alphabetical) order,
//! and the compliance summary is computed by the same
//! [`compliance_core::summarize`] the Evidence Recorder uses, so the two
//! artifacts can never disagree on the published rate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;

use compliance_core::MachineInfo;
use compliance_core::QueryResult;
use compliance_core::QueryResultValue;
use compliance_core::QueryStatus;
use compliance_core::compact_timestamp;
use compliance_core::now;
use compliance_core::summarize;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Report Renderer failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The artifact could not be written atomically.
    #[error("failed to write report artifact {path}: {source}")]
    Write {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SECTION: Embedded Assets
// ============================================================================

const STYLESHEET: &str = r"
body { font-family: -apple-system, Segoe UI, sans-serif; margin: 2rem; color: #1a1a1a; }
h1 { font-size: 1.4rem; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
th, td { border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; }
th { background: #f2f2f2; }
.status-pass { color: #146c2e; font-weight: 600; }
.status-fail { color: #b3261e; font-weight: 600; }
.status-not-found { color: #8a6d00; font-weight: 600; }
.status-error { color: #b3261e; font-weight: 600; }
.panel { margin-top: 1.5rem; }
";

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Accumulates rendered-result rows for one scan, then emits a single HTML
/// artifact.
#[derive(Debug)]
pub struct ReportRenderer {
    /// Report title, used both in the page heading and the output filename.
    title: String,
    /// Logical report type (unused in the filename; kept for parity with
    /// the Evidence Recorder's metadata).
    report_type: String,
    /// Agent/tool version string shown in the footer.
    tool_version: String,
    /// Directory the finalized artifact is written into.
    output_dir: PathBuf,
    /// Host identity, mirrored into the system-info panel.
    machine_information: MachineInfo,
    /// Accumulated outcomes, keyed by check name (alphabetical via `BTreeMap`).
    results: BTreeMap<String, QueryResult>,
}

impl ReportRenderer {
    /// Starts a new renderer for one scan.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        report_type: impl Into<String>,
        tool_version: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            report_type: report_type.into(),
            tool_version: tool_version.into(),
            output_dir: output_dir.into(),
            machine_information: unknown_machine_info(),
            results: BTreeMap::new(),
        }
    }

    /// Records host identity, mirroring the Evidence Recorder's.
    pub fn set_machine_information(&mut self, info: MachineInfo) {
        self.machine_information = info;
    }

    /// Appends one query outcome. Panel already-classified `QueryResult`
    /// values are accepted directly so the executor classifies an outcome
    /// exactly once and hands the same record to both the Renderer and the
    /// Evidence Recorder.
    pub fn append(&mut self, result: QueryResult) {
        self.results.insert(result.name.clone(), result);
    }

    /// Renders the accumulated results to
    /// `<output_dir>/<sanitized_title>_<YYYYMMDD_HHMMSS>.html` and returns
    /// the path written.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the artifact cannot be written.
    pub fn render(&self) -> Result<PathBuf, ReportError> {
        let timestamp = now();
        let html = self.render_html(timestamp);
        let filename = format!("{}_{}.html", sanitize_filename(&self.title), compact_timestamp(timestamp));
        let path = self.output_dir.join(filename);
        write_atomically(&self.output_dir, &path, &html)?;
        tracing::debug!(path = %path.display(), "report rendered");
        Ok(path)
    }

    /// Builds the full HTML document string for this renderer's current state.
    fn render_html(&self, generated_at: chrono::DateTime<chrono::Utc>) -> String {
        let summary = summarize(self.results.values());
        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>{css}</style></head><body>",
            title = escape(&self.title),
            css = STYLESHEET,
        );
        let _ = write!(html, "<h1>{}</h1>", escape(&self.title));
        let _ = write!(
            html,
            "<p>report type: {} · generated: {}</p>",
            escape(&self.report_type),
            escape(&generated_at.to_rfc3339()),
        );

        render_summary_panel(&mut html, &summary);
        render_system_info_panel(&mut html, &self.machine_information);
        render_results_table(&mut html, &self.results);

        let _ = write!(html, "<p class=\"panel\">compliance-toolkit {}</p>", escape(&self.tool_version));
        html.push_str("</body></html>");
        html
    }
}

/// Appends the total/passed/failed/not-found/errors/rate table.
fn render_summary_panel(html: &mut String, summary: &compliance_core::ScanSummary) {
    let _ = write!(
        html,
        "<div class=\"panel\"><h2>Summary</h2><table><tr><th>Total</th><th>Passed</th><th>Failed</th><th>Not Found</th><th>Errors</th><th>Compliance Rate</th></tr>\
         <tr><td>{total}</td><td>{passed}</td><td>{failed}</td><td>{not_found}</td><td>{errors}</td><td>{rate:.1}%</td></tr></table></div>",
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        not_found = summary.not_found,
        errors = summary.errors,
        rate = summary.compliance_rate,
    );
}

/// Appends the machine-identity table mirroring the Evidence Recorder's.
fn render_system_info_panel(html: &mut String, info: &MachineInfo) {
    html.push_str("<div class=\"panel\"><h2>System Information</h2><table>");
    let rows: [(&str, &str); 7] = [
        ("Hostname", &info.hostname),
        ("OS Version", &info.os_version),
        ("Build Number", &info.build_number),
        ("Architecture", &info.architecture),
        ("Owner", &info.owner),
        ("Organization", &info.organization),
        ("System Root", &info.system_root),
    ];
    for (label, value) in rows {
        let _ = write!(html, "<tr><th>{}</th><td>{}</td></tr>", escape(label), escape(value));
    }
    let _ = write!(
        html,
        "<tr><th>Domain</th><td>{}</td></tr>",
        escape(info.domain.as_deref().unwrap_or("N/A")),
    );
    html.push_str("</table></div>");
}

/// Appends the alphabetically ordered (via `BTreeMap` iteration) results table.
fn render_results_table(html: &mut String, results: &BTreeMap<String, QueryResult>) {
    html.push_str(
        "<div class=\"panel\"><h2>Results</h2><table><tr><th>Name</th><th>Description</th><th>Path</th><th>Value Name</th><th>Status</th><th>Value / Error</th></tr>",
    );
    for result in results.values() {
        let _ = write!(
            html,
            "<tr><td>{name}</td><td>{description}</td><td>{path}</td><td>{value_name}</td><td class=\"{status_class}\">{status}</td><td>{cell}</td></tr>",
            name = escape(&result.name),
            description = escape(&result.description),
            path = escape(&result.registry_path),
            value_name = escape(&result.value_name),
            status_class = status_class(result.status),
            status = status_label(result.status),
            cell = cell_content(result),
        );
    }
    html.push_str("</table></div>");
}

/// Maps a status to its CSS class.
fn status_class(status: QueryStatus) -> &'static str {
    match status {
        QueryStatus::Pass => "status-pass",
        QueryStatus::Fail => "status-fail",
        QueryStatus::NotFound => "status-not-found",
        QueryStatus::Error => "status-error",
    }
}

/// Maps a status to its display label.
fn status_label(status: QueryStatus) -> &'static str {
    match status {
        QueryStatus::Pass => "PASS",
        QueryStatus::Fail => "FAIL",
        QueryStatus::NotFound => "NOT_FOUND",
        QueryStatus::Error => "ERROR",
    }
}

/// Renders one result's value cell: each sub-key/value pair for a read-all
/// map, a formatted display string for a scalar, or the error text for a
/// failure.
fn cell_content(result: &QueryResult) -> String {
    if let Some(actual) = &result.actual {
        match actual {
            QueryResultValue::Scalar(value) => escape(value),
            QueryResultValue::Map(map) => map
                .iter()
                .map(|(key, value)| format!("{}: {}", escape(key), escape(value)))
                .collect::<Vec<_>>()
                .join("<br>"),
        }
    } else if let Some(error) = &result.error {
        escape(error)
    } else {
        String::new()
    }
}

/// A placeholder used before machine info is set.
fn unknown_machine_info() -> MachineInfo {
    MachineInfo {
        hostname: MachineInfo::UNKNOWN.to_owned(),
        os_version: MachineInfo::UNKNOWN.to_owned(),
        build_number: MachineInfo::UNKNOWN.to_owned(),
        architecture: MachineInfo::UNKNOWN.to_owned(),
        owner: MachineInfo::UNKNOWN.to_owned(),
        organization: MachineInfo::UNKNOWN.to_owned(),
        install_date: MachineInfo::UNKNOWN.to_owned(),
        system_root: MachineInfo::UNKNOWN.to_owned(),
        domain: None,
        ip_address: None,
        mac_address: None,
    }
}

/// Escapes the five HTML-significant characters.
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Reduces `input` to `[A-Za-z0-9_-]`, replacing spaces with underscores
/// and dropping every other character.
#[must_use]
pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => Some(c),
            _ => None,
        })
        .collect()
}

/// Writes `contents` to a temp file in `dir` then renames it into place at
/// `final_path`, so readers never observe a partially written artifact.
fn write_atomically(dir: &Path, final_path: &Path, contents: &str) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Write {
        path: dir.display().to_string(),
        source,
    })?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|source| ReportError::Write {
        path: final_path.display().to_string(),
        source,
    })?;
    use std::io::Write as _;
    temp.write_all(contents.as_bytes())
        .map_err(|source| ReportError::Write {
            path: final_path.display().to_string(),
            source,
        })?;
    temp.persist(final_path)
        .map_err(|error| ReportError::Write {
            path: final_path.display().to_string(),
            source: error.error,
        })?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use super::*;

    fn pass_result(name: &str) -> QueryResult {
        QueryResult {
            name: name.to_owned(),
            description: "desc".to_owned(),
            registry_path: r"SOFTWARE\Example".to_owned(),
            value_name: "Value".to_owned(),
            status: QueryStatus::Pass,
            actual: Some(QueryResultValue::Scalar("ok".to_owned())),
            error: None,
            expected: None,
            timestamp: now(),
        }
    }

    #[test]
    fn sanitize_filename_keeps_only_safe_characters() {
        assert_eq!(sanitize_filename("CIS Level 1: Report!"), "CIS_Level_1_Report");
    }

    #[test]
    fn escape_neutralizes_html_significant_characters() {
        assert_eq!(escape("<script>&\"'"), "&lt;script&gt;&amp;&quot;&#39;");
    }

    #[test]
    fn render_writes_one_html_file_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = ReportRenderer::new("CIS Level 1", "cis_level1", "1.0.0", dir.path());
        renderer.append(pass_result("b_check"));
        renderer.append(pass_result("a_check"));

        let path = renderer.render().unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("CIS_Level_1_"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<td>2</td>"), "total count should appear in summary");
        let a_index = contents.find("a_check").unwrap();
        let b_index = contents.find("b_check").unwrap();
        assert!(a_index < b_index, "results should render in alphabetical order");
    }

    #[test]
    fn map_cell_renders_each_sub_key_value_pair() {
        let mut result = pass_result("read_all_check");
        let mut map = BTreeMap::new();
        map.insert("ValueA".to_owned(), "1".to_owned());
        map.insert("ValueB".to_owned(), "2".to_owned());
        result.actual = Some(QueryResultValue::Map(map));

        let cell = cell_content(&result);
        assert!(cell.contains("ValueA: 1"));
        assert!(cell.contains("ValueB: 2"));
    }
}
