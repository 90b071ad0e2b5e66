//! Compliance report rendering and persistence.
//!
//! The markdown form is meant to be read by people and grepped by CI; the
//! JSON form is the serialized verdict.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tally_eval::Verdict;

use crate::config::ReportFormat;

/// The rendered report could not be persisted. Never affects the exit status.
#[derive(Debug, thiserror::Error)]
#[error("failed to write report to {}: {source}", .path.display())]
pub struct ReportWriteFailure {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub fn render(verdict: &Verdict, format: ReportFormat) -> String {
    match format {
        ReportFormat::Markdown => render_markdown(verdict),
        ReportFormat::Json => render_json(verdict),
    }
}

pub fn render_json(verdict: &Verdict) -> String {
    serde_json::to_string_pretty(verdict)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e))
}

pub fn render_markdown(verdict: &Verdict) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_markdown(&mut out, verdict);
    out
}

fn write_markdown(out: &mut String, v: &Verdict) -> std::fmt::Result {
    writeln!(out, "# Dataset Memory Analysis Report")?;
    writeln!(out)?;
    writeln!(out, "**Generated On:** {}", v.timestamp)?;
    writeln!(out, "**Status:** {}", v.status_label())?;
    writeln!(out)?;
    writeln!(out, "## Configuration")?;
    writeln!(out, "- Target Metadata Type: `{}`", v.target_type)?;
    writeln!(out, "- Compliance Threshold: `{:.2}%`", v.threshold)?;
    writeln!(out)?;
    writeln!(out, "## Results Summary")?;
    writeln!(out, "- **Total Combined Usage:** `{:.2}%`", v.total_usage)?;
    writeln!(
        out,
        "- **Is Compliant:** {}",
        if v.is_compliant { "Yes" } else { "No" }
    )?;
    writeln!(out, "- **Exceeded By:** `{:.2}%`", v.exceeded_by)?;
    writeln!(out)?;
    writeln!(out, "## Details of Relevant Datasets")?;
    if v.datasets.is_empty() {
        writeln!(out, "_No records of type `{}` contributed._", v.target_type)?;
    } else {
        writeln!(out, "| Dataset Name | Memory Usage (%) |")?;
        writeln!(out, "|---|---|")?;
        for d in &v.datasets {
            writeln!(out, "| {} | {:.2} |", escape_cell(&d.name), d.value)?;
        }
    }

    if !v.issues.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Skipped Records")?;
        for issue in &v.issues {
            writeln!(
                out,
                "- `{}` ({}): {}",
                one_line(&issue.record),
                issue.kind.label(),
                one_line(&issue.detail)
            )?;
        }
    }
    Ok(())
}

fn escape_cell(text: &str) -> String {
    one_line(text).replace('|', "\\|")
}

/// Line breaks inside a value would end its table row or list item.
fn one_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Write `contents` to `path`, creating parent directories as needed.
pub fn write_report(path: &Path, contents: &str) -> Result<(), ReportWriteFailure> {
    let fail = |source| ReportWriteFailure {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }
    std::fs::write(path, contents).map_err(fail)
}
