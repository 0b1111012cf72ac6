//! `netpulse history`: fetch one historical range and print it.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use netpulse_core::{MetricsSource, Mode, SeriesBuffer, SeriesPoint, outcome_into_result};

use crate::cli::{GlobalOpts, HistoryArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, PointRow};

fn spinner(message: String, quiet: bool) -> Option<ProgressBar> {
    if quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub async fn handle(args: HistoryArgs, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let mode = args.range.mode();
    let Mode::Historical(range) = mode else {
        return Err(CliError::Validation {
            field: "range".into(),
            reason: "history needs a time range; use `netpulse watch` to follow live data".into(),
        });
    };

    let pb = spinner(format!("fetching {range} history"), global.quiet);
    let outcome = session.client.history(range, session.device.as_deref()).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let mut snapshots = outcome_into_result(outcome)?;
    snapshots.sort_by_key(|s| s.timestamp);
    let snapshots = range.downsample(snapshots);

    let mut buffer = SeriesBuffer::new(range.capacity());
    buffer.replace_all(snapshots.iter().map(|s| SeriesPoint::from_snapshot(s, mode)));
    let points: Vec<SeriesPoint> = buffer.iter().cloned().collect();

    if points.is_empty() {
        if !global.quiet {
            eprintln!("no data for {range}");
        }
        return Ok(());
    }

    let out = output::render_list(global.output, &points, PointRow::new, output::plain_point)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
