//! `rw-towncrier lock` command implementations.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::error::CliError;
use crate::lockfile::{self, PythonRuntime};
use crate::output::Output;

/// Pip lock file subcommands.
#[derive(Subcommand)]
pub(crate) enum LockCommand {
    /// Print the platform-specific lock file base name for an env.
    Name(NameArgs),
    /// Run pip constrained by the env's lock file.
    Pip(PipArgs),
    /// Compile the env's lock file with pip-tools.
    Compile(CompileArgs),
}

impl LockCommand {
    /// Execute the lock subcommand.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        match self {
            Self::Name(args) => args.execute(),
            Self::Pip(args) => args.execute(),
            Self::Compile(args) => args.execute(),
        }
    }
}

/// Python interpreter selection.
#[derive(Args)]
struct InterpreterArgs {
    /// Python interpreter whose identity names the lock file.
    #[arg(long, default_value = "python3", env = "RW_TOWNCRIER_PYTHON")]
    python: String,
}

/// Arguments for the lock name command.
#[derive(Args)]
pub(crate) struct NameArgs {
    /// Env name, e.g. `docs` or `py`.
    env: String,

    #[command(flatten)]
    interpreter: InterpreterArgs,
}

impl NameArgs {
    fn execute(self) -> Result<(), CliError> {
        let runtime = PythonRuntime::probe(&self.interpreter.python)?;
        Output::new().result(&lockfile::lock_base_name(&runtime, &self.env));
        Ok(())
    }
}

/// Arguments for the lock pip command.
#[derive(Args)]
pub(crate) struct PipArgs {
    /// Directory holding the lock files.
    req_dir: PathBuf,

    /// Env name, e.g. `docs` or `py`.
    env: String,

    /// Arguments passed to pip.
    #[arg(last = true)]
    pip_args: Vec<String>,

    #[command(flatten)]
    interpreter: InterpreterArgs,
}

impl PipArgs {
    fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let python = &self.interpreter.python;
        let runtime = PythonRuntime::probe(python)?;

        let lock_file = lockfile::lock_file_path(&self.req_dir, &runtime, &self.env);
        let argv = lockfile::pip_command(python, &self.pip_args, &lock_file, &output);
        lockfile::run_command(&argv, &output)
    }
}

/// Arguments for the lock compile command.
#[derive(Args)]
pub(crate) struct CompileArgs {
    /// Directory receiving the lock file.
    req_dir: PathBuf,

    /// Env name, e.g. `docs` or `py`.
    env: String,

    /// Extra arguments passed to pip-compile.
    #[arg(last = true)]
    extra_args: Vec<String>,

    #[command(flatten)]
    interpreter: InterpreterArgs,
}

impl CompileArgs {
    fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let python = &self.interpreter.python;
        let runtime = PythonRuntime::probe(python)?;

        let lock_file = lockfile::lock_file_path(&self.req_dir, &runtime, &self.env);
        let argv = lockfile::compile_command(python, &lock_file, &self.env, &self.extra_args);
        lockfile::run_command(&argv, &output)
    }
}
