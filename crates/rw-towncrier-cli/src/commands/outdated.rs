//! `rw-towncrier outdated` command implementation.

use std::collections::BTreeSet;

use clap::Args;
use rw_towncrier::{FileSessionCache, SessionCache, TowncrierExtension};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the outdated command.
#[derive(Args)]
pub(crate) struct OutdatedArgs {
    /// Page already scheduled for rebuilding (repeatable).
    #[arg(long = "changed", value_name = "PAGE")]
    changed: Vec<String>,

    #[command(flatten)]
    project: ProjectArgs,
}

impl OutdatedArgs {
    /// Print pages whose fragment dependencies changed since the stored
    /// session was recorded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = self.project.load()?;

        let Some(session) = FileSessionCache::new(settings.cache_dir()).get() else {
            output.note("No recorded build session");
            return Ok(());
        };

        let changed: BTreeSet<String> = self.changed.into_iter().collect();
        let extension = TowncrierExtension::new(settings.towncrier_resolved);

        for page in extension.outdated_pages(&session, &changed) {
            output.result(&page);
        }
        Ok(())
    }
}
