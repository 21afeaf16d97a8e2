//! Text (terminal) reporter: a table of commits and their fixed dates

use super::{RetimeReport, RunMode};
use crate::error::human_date;
use crate::models::FixedCommit;
use anyhow::Result;
use console::{measure_text_width, pad_str, style, Alignment};
use std::fmt::Write;

/// Messages longer than this are cut and suffixed with `...`
const MESSAGE_WIDTH: usize = 50;

const HEADERS: [&str; 4] = ["Hash", "Message", "Date", "Fixed date"];

/// Render report as formatted terminal output
pub fn render(report: &RetimeReport) -> Result<String> {
    let mut out = String::new();

    writeln!(
        out,
        "{} commit(s) since \"{}\"",
        report.commits, report.since
    )?;

    if report.fixes.is_empty() {
        writeln!(out, "{}", style("No commit to fix").green())?;
        return Ok(out);
    }

    out.push_str(&table(&report.fixes));

    match report.mode {
        RunMode::DryRun => {
            writeln!(
                out,
                "{} commit(s) to fix. {}",
                report.fixes.len(),
                style("Dry run: re-run with --apply to rewrite history").yellow()
            )?;
            if report.fixes.len() > 1 {
                writeln!(
                    out,
                    "{}",
                    style("Dates after the first fix are recomputed after each rewrite").dim()
                )?;
            }
        }
        RunMode::Apply => {
            writeln!(
                out,
                "{} Rewrote {} commit(s) in {} pass(es)",
                style("✓").green(),
                report.fixes.len(),
                report.passes
            )?;
        }
    }
    Ok(out)
}

fn table(fixes: &[FixedCommit]) -> String {
    let rows: Vec<[String; 4]> = fixes
        .iter()
        .map(|f| {
            [
                f.commit.short_hash().to_string(),
                truncate_message(&f.commit.message),
                human_date(&f.commit.author_date),
                human_date(&f.author_date_fixed),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut out = String::new();
    out.push_str(&separator);
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| style(pad_str(h, w, Alignment::Left, None)).bold().to_string())
        .collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&separator);
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| pad_str(cell, w, Alignment::Left, None).into_owned())
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.push_str(&separator);
    out
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MESSAGE_WIDTH {
        return message.to_string();
    }
    let cut: String = message.chars().take(MESSAGE_WIDTH).collect();
    format!("{}...", cut)
}
