//! `rw-towncrier render` command implementation.

use std::path::PathBuf;

use clap::Args;
use rw_towncrier::{
    FileSessionCache, NullSessionCache, PageEnvironment, SessionCache, TowncrierExtension,
};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Path to the markdown file.
    markdown_file: PathBuf,

    /// Page identifier recorded in the build session (default: file path
    /// without extension).
    #[arg(long)]
    page: Option<String>,

    /// Do not read or update the stored build session.
    #[arg(long)]
    no_cache: bool,

    #[command(flatten)]
    project: ProjectArgs,
}

impl RenderArgs {
    /// Expand directives in the page and print the result to stdout.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = self.project.load()?;

        let cache: Box<dyn SessionCache> = if self.no_cache {
            Box::new(NullSessionCache)
        } else {
            Box::new(FileSessionCache::new(settings.cache_dir()))
        };
        let mut session = cache.get().unwrap_or_default();

        let source = std::fs::read_to_string(&self.markdown_file)?;
        let page = self
            .page
            .unwrap_or_else(|| self.markdown_file.with_extension("").display().to_string());

        let extension = TowncrierExtension::new(settings.towncrier_resolved.clone());
        let mut env = PageEnvironment::new(page)
            .with_labels(&settings.project.release, &settings.project.version);

        let rendered = extension.expand_page(&source, &mut session, &mut env)?;
        cache.set(&session);

        tracing::info!(
            page = %self.markdown_file.display(),
            dependencies = env.dependencies().len(),
            "Rendered page"
        );
        output.result_block(&rendered);
        Ok(())
    }
}
