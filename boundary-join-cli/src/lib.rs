//! Command-line interface joining point records to boundary regions.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod join;

pub use error::CliError;

use join::JoinArgs;

pub(crate) const ARG_BOUNDARIES: &str = "boundaries";
pub(crate) const ARG_RECORDS: &str = "records";
pub(crate) const ARG_ID_FIELD: &str = "id-field";
pub(crate) const ARG_OUTPUT_DIR: &str = "output-dir";
pub(crate) const ARG_LONGITUDE_FIELD: &str = "longitude-field";
pub(crate) const ARG_LATITUDE_FIELD: &str = "latitude-field";
pub(crate) const ARG_REGION_ATTRIBUTE: &str = "region-attribute";
pub(crate) const ARG_PAGE_SIZE: &str = "page-size";
pub(crate) const ENV_BOUNDARIES: &str = "BOUNDARY_JOIN_CMDS_JOIN_BOUNDARIES";
pub(crate) const ENV_RECORDS: &str = "BOUNDARY_JOIN_CMDS_JOIN_RECORDS";
pub(crate) const ENV_ID_FIELD: &str = "BOUNDARY_JOIN_CMDS_JOIN_ID_FIELD";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments are invalid, configuration cannot be
/// resolved, or the join pipeline fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Join(args) => {
            join::run_join(args)?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "boundary-join",
    about = "Assign point records to the boundary region that contains them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Join point records against boundary polygons and write result sets.
    Join(JoinArgs),
}

#[cfg(test)]
mod tests;
