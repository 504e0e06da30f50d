//! `rw-towncrier draft` command implementation.

use clap::Args;
use rw_towncrier::{AutoversionMode, DirectiveError, PageEnvironment};
use towncrier_draft::{DraftError, DraftRenderer, DraftRequest};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the draft command.
#[derive(Args)]
pub(crate) struct DraftArgs {
    /// Version label for the draft (default: from autoversion mode).
    #[arg(value_name = "VERSION")]
    target_version: Option<String>,

    #[command(flatten)]
    project: ProjectArgs,
}

impl DraftArgs {
    /// Render the draft to stdout.
    ///
    /// An empty draft is reported on stderr and is not an error.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = self.project.load()?;
        let towncrier = &settings.towncrier_resolved;

        let version = match self.target_version {
            Some(version) => version,
            None => {
                let env = PageEnvironment::new("")
                    .with_labels(&settings.project.release, &settings.project.version);
                towncrier
                    .autoversion_mode
                    .parse::<AutoversionMode>()
                    .map_err(DirectiveError::from)?
                    .fallback_version(&env)
            }
        };

        let request = DraftRequest::new(version)
            .with_allow_empty(towncrier.include_empty)
            .with_working_dir(towncrier.working_directory.clone())
            .with_config_path(towncrier.config_path.clone());

        match DraftRenderer::default().render(&request) {
            Ok(draft) => {
                output.result_block(&draft);
                Ok(())
            }
            Err(DraftError::Empty) => {
                output.warning(&DraftError::Empty.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
