//! Command dispatch: bridges CLI args -> sync service -> output formatting.

pub mod blacklist;
pub mod coins;
pub mod config_cmd;
pub mod dashboard;
pub mod health;
pub mod positions;
pub mod util;
pub mod watch;

use tradedash_core::SyncService;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, service: &SyncService, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Dashboard => dashboard::handle(service, global).await,
        Command::Coins(args) => coins::handle(service, &args, global).await,
        Command::Positions(args) => positions::handle(service, &args, global).await,
        Command::Blacklist(args) => blacklist::handle(service, args, global).await,
        Command::Watch(args) => watch::handle(service, &args, global).await,
        Command::Health => health::handle(service, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
