//! CLI argument parsing.

use clap::{Parser, Subcommand};

/// Reconciliation poller and HTTP server for hydraulic machine predictions.
#[derive(Parser, Debug)]
#[command(name = "hydrosync-server", version, about)]
pub struct Cli {
    /// Configuration profile; keys are read as `{PROFILE}_{KEY}` before `{KEY}`.
    #[arg(long, env = "HYDROSYNC_PROFILE", default_value = "")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server and the reconciliation poller (default).
    Serve,
    /// Print the keys currently missing outputs without dispatching anything.
    Scan,
    /// Run a single reconciliation pass and exit.
    ReconcileOnce,
}

impl Cli {
    pub fn resolved_command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_default() {
        let cli = Cli::try_parse_from(["hydrosync-server"]).unwrap();
        assert_eq!(cli.resolved_command(), Command::Serve);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["hydrosync-server", "reconcile-once"]).unwrap();
        assert_eq!(cli.resolved_command(), Command::ReconcileOnce);

        let cli = Cli::try_parse_from(["hydrosync-server", "--profile", "prod", "scan"]).unwrap();
        assert_eq!(cli.resolved_command(), Command::Scan);
        assert_eq!(cli.profile, "prod");
    }
}
