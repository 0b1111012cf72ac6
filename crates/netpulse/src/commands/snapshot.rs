//! `netpulse snapshot`: fetch and print the newest measurement.

use netpulse_core::{MetricsSource, outcome_into_result};

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = session.client.latest(session.device.as_deref()).await;
    let snapshot = outcome_into_result(outcome)?.ok_or_else(|| CliError::Waiting {
        message: "no snapshot recorded yet".into(),
    })?;

    let out = output::render_single(
        global.output,
        &snapshot,
        output::snapshot_detail,
        |s| format!("{}\t{}\t{}\t{}", s.timestamp.to_rfc3339(), s.inbound, s.outbound, s.total),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
