//! Error display for the CLI.

use colored::Colorize;
use trove_core::CoreError;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let Some(core_err) = err.downcast_ref::<CoreError>() else {
        return;
    };

    match core_err {
        CoreError::MissingEventStorageConfig => {
            eprintln!(
                "\n{}",
                "Hint: add a [storage.events] table naming a storage plugin.".yellow()
            );
        }
        CoreError::PluginResolutionFailed { plugin, .. } => {
            eprintln!(
                "\n{}",
                format!("Hint: make sure \"{plugin}\" is listed in [plugins] sources.").yellow()
            );
        }
        _ => {}
    }
}
