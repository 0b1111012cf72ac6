//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Tables use `tabled`,
//! structured formats use serde, plain emits tab-separated values.

use std::io::{self, IsTerminal, Write};

use bytesize::ByteSize;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use netpulse_core::{Notice, NoticeLevel, SeriesPoint, Snapshot};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Whether color output should be enabled on stderr.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Print a banner to stderr, colored by level.
pub fn print_notice(notice: &Notice, color: bool) {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    let mut stderr = io::stderr().lock();
    let _ = if color {
        match notice.level {
            NoticeLevel::Info => writeln!(stderr, "{} {}", tag.cyan(), notice.message),
            NoticeLevel::Warning => writeln!(stderr, "{} {}", tag.yellow(), notice.message),
            NoticeLevel::Error => writeln!(stderr, "{} {}", tag.red().bold(), notice.message),
        }
    } else {
        writeln!(stderr, "{tag} {}", notice.message)
    };
}

// ── Rates ────────────────────────────────────────────────────────────

/// Human-readable throughput, e.g. `1.2 MB/s`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    #[allow(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let bytes = bytes_per_sec.max(0.0).round() as u64;
    format!("{}/s", ByteSize::b(bytes).to_string_as(true))
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct PointRow {
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Inbound")]
    pub inbound: String,
    #[tabled(rename = "Outbound")]
    pub outbound: String,
    #[tabled(rename = "Total")]
    pub total: String,
}

impl PointRow {
    pub fn new(p: &SeriesPoint) -> Self {
        Self {
            time: p.label.clone(),
            inbound: format_rate(p.inbound),
            outbound: format_rate(p.outbound),
            total: format_rate(p.total),
        }
    }
}

/// Tab-separated `label inbound outbound total`.
pub fn plain_point(p: &SeriesPoint) -> String {
    format!("{}\t{}\t{}\t{}", p.label, p.inbound, p.outbound, p.total)
}

/// Key/value view of one snapshot.
pub fn snapshot_detail(s: &Snapshot) -> String {
    let mut lines = vec![
        format!("Time:      {}", s.timestamp.to_rfc3339()),
        format!("Inbound:   {}", format_rate(s.inbound)),
        format!("Outbound:  {}", format_rate(s.outbound)),
        format!("Total:     {}", format_rate(s.total)),
    ];
    for (key, value) in &s.extra {
        lines.push(format!("{key}: {value}"));
    }
    lines.join("\n")
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&plain_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single item. Table mode uses `detail_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| CliError::Render(e.to_string()))
}

pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(
    data: &T,
) -> Result<String, CliError> {
    serde_json::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
