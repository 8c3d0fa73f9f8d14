//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod data;
pub mod events;
pub mod link;
pub mod session;
pub mod version;

use crate::cli::args::{
    Cli, Commands, DataSubcommand, EventsSubcommand, LinkSubcommand, SessionSubcommand,
};
use crate::error::FormWardenError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), FormWardenError> {
    match cli.command {
        Commands::Link(cmd) => match cmd.subcommand {
            LinkSubcommand::Create(args) => link::create(&args),
            LinkSubcommand::List(args) => link::list(&args),
            LinkSubcommand::Delete(args) => link::delete(&args),
            LinkSubcommand::Decode(args) => link::decode(&args),
        },
        Commands::Session(cmd) => match cmd.subcommand {
            SessionSubcommand::Run(args) => session::run(&args).await,
        },
        Commands::Events(cmd) => match cmd.subcommand {
            EventsSubcommand::List(args) => events::list(&args),
            EventsSubcommand::Stats(args) => events::stats(&args),
            EventsSubcommand::Export(args) => events::export(&args),
        },
        Commands::Data(cmd) => match cmd.subcommand {
            DataSubcommand::Clear(args) => data::clear(&args),
        },
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
