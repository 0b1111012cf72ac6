//! `netpulse watch`: follow the live series, or show a historical range.
//!
//! The dashboard owns polling and the mode guard; this module is its render
//! sink (rows to stdout) and prints banners to stderr.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use netpulse_config::FilePreferences;
use netpulse_core::{
    ChartFrame, CoreError, Dashboard, DashboardEvent, Mode, Notice, PreferenceStore, RenderSink,
    TimeRange,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

// ── Render sink ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct FrameRow<'a> {
    label: &'a str,
    inbound: f64,
    outbound: f64,
    total: f64,
}

/// Streams new rows of each frame to stdout.
///
/// Rows up to the last printed timestamp are skipped, so a live append
/// prints one row while a replaced series prints in full. Labels are not
/// unique below one second and cannot mark the position.
pub struct TerminalSink {
    format: OutputFormat,
    quiet: bool,
    last_printed: Mutex<Option<DateTime<Utc>>>,
    header_printed: AtomicBool,
}

impl TerminalSink {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self {
            format,
            quiet,
            last_printed: Mutex::new(None),
            header_printed: AtomicBool::new(false),
        }
    }

    fn format_row(&self, row: &FrameRow<'_>) -> Option<String> {
        match self.format {
            OutputFormat::Table => Some(format!(
                "{:<16} {:>14} {:>14} {:>14}",
                row.label,
                output::format_rate(row.inbound),
                output::format_rate(row.outbound),
                output::format_rate(row.total),
            )),
            OutputFormat::Plain => Some(format!(
                "{}\t{}\t{}\t{}",
                row.label, row.inbound, row.outbound, row.total
            )),
            OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(row)
                .inspect_err(|e| warn!(error = %e, "failed to encode row"))
                .ok(),
            OutputFormat::Yaml => serde_yaml::to_string(row)
                .map(|doc| format!("---\n{}", doc.trim_end()))
                .inspect_err(|e| warn!(error = %e, "failed to encode row"))
                .ok(),
        }
    }
}

/// Index of the first row after `last`, or 0 when `last` is not in the
/// frame.
fn resume_index(last: Option<DateTime<Utc>>, frame: &ChartFrame) -> usize {
    last.and_then(|t| frame.timestamps.binary_search(&t).ok())
        .map_or(0, |i| i + 1)
}

impl RenderSink for TerminalSink {
    fn render(&self, frame: &ChartFrame) {
        let Ok(mut last) = self.last_printed.lock() else {
            return;
        };
        if frame.is_empty() {
            *last = None;
            return;
        }
        if self.quiet {
            return;
        }

        let start = resume_index(*last, frame);

        let rows: Vec<String> = frame
            .labels
            .iter()
            .zip(&frame.inbound)
            .zip(&frame.outbound)
            .zip(&frame.total)
            .skip(start)
            .filter_map(|(((label, &inbound), &outbound), &total)| {
                self.format_row(&FrameRow {
                    label,
                    inbound,
                    outbound,
                    total,
                })
            })
            .collect();
        *last = frame.timestamps.last().copied();
        if rows.is_empty() {
            return;
        }

        let mut stdout = std::io::stdout().lock();
        if self.format == OutputFormat::Table && !self.header_printed.swap(true, Ordering::Relaxed)
        {
            let _ = writeln!(
                stdout,
                "{:<16} {:>14} {:>14} {:>14}",
                "TIME", "INBOUND", "OUTBOUND", "TOTAL"
            );
        }
        for row in rows {
            let _ = writeln!(stdout, "{row}");
        }
        let _ = stdout.flush();
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, session: Session, global: &GlobalOpts) -> Result<(), CliError> {
    let Session {
        client,
        device,
        dashboard: mut config,
    } = session;
    if let Some(interval) = args.interval {
        config.poll_interval = interval;
    }
    if args.no_backfill {
        config.backfill = false;
    }

    let prefs: Arc<dyn PreferenceStore> = Arc::new(FilePreferences::open_default());
    let sink = Arc::new(TerminalSink::new(global.output, global.quiet));
    let dashboard = Dashboard::with_render_sink(client, prefs, config, sink)?;
    let color = output::should_color(global.color);

    let mut events = dashboard.events().subscribe();
    let mut notices = dashboard.notices().subscribe();

    dashboard.select_device(device).await;
    match args.range {
        Some(range) => dashboard.set_mode(range.mode()).await,
        None => dashboard.start().await,
    }

    let result = match dashboard.mode().await {
        Mode::Live => {
            follow_live(&mut events, &mut notices, args.count, color, global.quiet).await
        }
        Mode::Historical(range) => finish_historical(range, &mut events, global.quiet),
    };
    dashboard.shutdown().await;
    result
}

/// Run until interrupted, the event bus closes, or `count` snapshots
/// have arrived. Failures are shown and polling continues.
async fn follow_live(
    events: &mut broadcast::Receiver<DashboardEvent>,
    notices: &mut watch::Receiver<Option<Notice>>,
    count: Option<u64>,
    color: bool,
    quiet: bool,
) -> Result<(), CliError> {
    if count == Some(0) {
        return Ok(());
    }
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut seen: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                return Ok(());
            }
            changed = notices.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = notices.borrow_and_update().clone();
                if let Some(notice) = current.filter(|_| !quiet) {
                    output::print_notice(&notice, color);
                }
            }
            event = events.recv() => match event {
                Ok(DashboardEvent::SnapshotUpdate(_)) => {
                    seen += 1;
                    if count.is_some_and(|c| seen >= c) {
                        return Ok(());
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// A historical view is loaded once by `start`/`set_mode`; turn what it
/// published into an exit status.
fn finish_historical(
    range: TimeRange,
    events: &mut broadcast::Receiver<DashboardEvent>,
    quiet: bool,
) -> Result<(), CliError> {
    loop {
        match events.try_recv() {
            Ok(DashboardEvent::Error { kind, message, .. }) => {
                return Err(CoreError::Request { kind, message }.into());
            }
            Ok(DashboardEvent::Waiting { message }) => {
                return Err(CliError::Waiting { message });
            }
            Ok(DashboardEvent::NoData { .. }) => {
                if !quiet {
                    eprintln!("no data for {range}");
                }
            }
            Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: i64 = 1_718_000_000;

    fn frame(points: &[(i64, u32, &str)]) -> ChartFrame {
        ChartFrame {
            timestamps: points
                .iter()
                .filter_map(|&(secs, nanos, _)| DateTime::from_timestamp(BASE + secs, nanos))
                .collect(),
            labels: points.iter().map(|(_, _, l)| (*l).to_owned()).collect(),
            inbound: vec![1.0; points.len()],
            outbound: vec![2.0; points.len()],
            total: vec![3.0; points.len()],
        }
    }

    fn last_printed(sink: &TerminalSink) -> Option<DateTime<Utc>> {
        sink.last_printed.lock().ok().and_then(|l| *l)
    }

    #[test]
    fn sink_remembers_the_last_printed_point() {
        let sink = TerminalSink::new(OutputFormat::Plain, false);
        sink.render(&frame(&[(0, 0, "10:00:00"), (60, 0, "10:01:00")]));
        sink.render(&frame(&[(0, 0, "10:00:00"), (60, 0, "10:01:00"), (120, 0, "10:02:00")]));
        assert_eq!(last_printed(&sink), DateTime::from_timestamp(BASE + 120, 0));

        sink.render(&frame(&[]));
        assert_eq!(last_printed(&sink), None);
    }

    #[test]
    fn sub_second_points_sharing_a_label_still_advance() {
        let sink = TerminalSink::new(OutputFormat::Plain, false);
        sink.render(&frame(&[(0, 0, "10:00:00")]));
        let next = frame(&[(0, 0, "10:00:00"), (0, 500_000_000, "10:00:00")]);
        assert_eq!(resume_index(last_printed(&sink), &next), 1);

        sink.render(&next);
        assert_eq!(last_printed(&sink), DateTime::from_timestamp(BASE, 500_000_000));
    }

    #[test]
    fn replaced_series_prints_in_full() {
        let earlier = frame(&[(-120, 0, "09:58"), (-60, 0, "09:59")]);
        assert_eq!(resume_index(DateTime::from_timestamp(BASE, 0), &earlier), 0);
        assert_eq!(resume_index(None, &earlier), 0);
    }

    #[test]
    fn rows_follow_the_output_format() {
        let row = FrameRow {
            label: "10:00:00",
            inbound: 1.0,
            outbound: 2.0,
            total: 3.0,
        };
        let plain = TerminalSink::new(OutputFormat::Plain, false).format_row(&row);
        assert_eq!(plain.as_deref(), Some("10:00:00\t1\t2\t3"));

        let json = TerminalSink::new(OutputFormat::JsonCompact, false).format_row(&row);
        assert_eq!(
            json.as_deref(),
            Some(r#"{"label":"10:00:00","inbound":1.0,"outbound":2.0,"total":3.0}"#)
        );
    }
}
