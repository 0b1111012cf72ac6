//! Command handlers.

pub mod config_cmd;
pub mod history;
pub mod snapshot;
pub mod watch;

use netpulse_core::{Mode, TimeRange};

use crate::cli::{Command, GlobalOpts, RangeArg};
use crate::config::Session;
use crate::error::CliError;

/// Route an appliance command to its handler.
pub async fn dispatch(cmd: Command, session: Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(args, session, global).await,
        Command::Snapshot => snapshot::handle(&session, global).await,
        Command::History(args) => history::handle(args, &session, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not contact the appliance".into(),
        }),
    }
}

impl RangeArg {
    pub fn mode(self) -> Mode {
        match self {
            Self::Live => Mode::Live,
            Self::Minutes15 => Mode::Historical(TimeRange::Minutes15),
            Self::Minutes30 => Mode::Historical(TimeRange::Minutes30),
            Self::Hour1 => Mode::Historical(TimeRange::Hour1),
            Self::Hours6 => Mode::Historical(TimeRange::Hours6),
            Self::Hours12 => Mode::Historical(TimeRange::Hours12),
            Self::Hours24 => Mode::Historical(TimeRange::Hours24),
            Self::Days7 => Mode::Historical(TimeRange::Days7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn range_names_match_preference_values() {
        for arg in RangeArg::value_variants() {
            let name = arg.to_possible_value().map(|v| v.get_name().to_owned());
            assert_eq!(name.as_deref(), Some(arg.mode().preference_value()));
        }
    }
}
