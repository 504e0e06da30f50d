//! `rw-towncrier fragments` command implementation.

use clap::Args;
use towncrier_draft::FragmentLocator;

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the fragments command.
#[derive(Args)]
pub(crate) struct FragmentsArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

impl FragmentsArgs {
    /// Print every pending fragment path, one per line.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = self.project.load()?;
        let towncrier = &settings.towncrier_resolved;

        let fragments = FragmentLocator::native().locate(
            towncrier.working_directory.as_deref(),
            towncrier.config_path.as_deref(),
        );

        if fragments.is_empty() {
            output.note("No pending changelog fragments");
            return Ok(());
        }
        for path in &fragments {
            output.result(&path.display().to_string());
        }
        Ok(())
    }
}
