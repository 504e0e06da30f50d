//! Draft changelog rendering through the towncrier executable.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use crate::escape::escape_version_substitution;
use crate::memo::Memo;

/// Text towncrier prints when there are no fragments to render.
pub const NO_CHANGES_MARKER: &str = "No significant changes";

/// Placeholder shown for an empty output stream in failure reports.
const NO_OUTPUT: &str = "[No output]";

/// Distinct draft requests remembered by a renderer.
const DRAFT_CACHE_CAPACITY: usize = 32;

/// Base command line producing a draft on standard output.
///
/// The renderer appends `--version <version>` and, when configured,
/// `--config <path>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftCommand {
    program: String,
    args: Vec<String>,
}

impl Default for DraftCommand {
    fn default() -> Self {
        Self::new("towncrier", ["build", "--draft"])
    }
}

impl DraftCommand {
    /// Create a command from a program and its leading arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Full argument vector for a request, program first.
    fn argv(&self, request: &DraftRequest) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 5);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push("--version".to_owned());
        argv.push(escape_version_substitution(&request.target_version).into_owned());
        if let Some(config_path) = &request.config_path {
            argv.push("--config".to_owned());
            argv.push(config_path.clone());
        }
        argv
    }
}

/// Arguments of one draft rendering; also the memoization key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DraftRequest {
    /// Version label for the draft title (escaped before use).
    pub target_version: String,
    /// Whether a draft without pending entries is acceptable.
    pub allow_empty: bool,
    /// Directory to run towncrier in (current directory when `None`).
    pub working_dir: Option<PathBuf>,
    /// Explicit towncrier config file passed with `--config`.
    pub config_path: Option<String>,
}

impl DraftRequest {
    /// Request a draft for `target_version` with empty drafts disallowed.
    pub fn new(target_version: impl Into<String>) -> Self {
        Self {
            target_version: target_version.into(),
            allow_empty: false,
            working_dir: None,
            config_path: None,
        }
    }

    /// Set whether an empty draft is acceptable.
    #[must_use]
    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: Option<PathBuf>) -> Self {
        self.working_dir = working_dir;
        self
    }

    /// Set the explicit config path.
    #[must_use]
    pub fn with_config_path(mut self, config_path: Option<String>) -> Self {
        self.config_path = config_path;
        self
    }
}

/// Towncrier exited with a non-zero status.
#[derive(Clone, Debug)]
pub struct DraftRenderFailure {
    /// Shell-quoted command line.
    pub command: String,
    /// Exit code, or the negated signal number when killed by a signal.
    pub status: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl fmt::Display for DraftRenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Command exited unexpectedly.")?;
        writeln!(f)?;
        writeln!(f, "Command: {}", self.command)?;
        writeln!(f, "Return code: {}", self.status)?;
        writeln!(f)?;
        writeln!(f, "Standard output:\n{}", or_placeholder(&self.stdout))?;
        writeln!(f)?;
        write!(f, "Standard error:\n{}", or_placeholder(&self.stderr))
    }
}

impl std::error::Error for DraftRenderFailure {}

fn or_placeholder(stream: &str) -> &str {
    if stream.is_empty() { NO_OUTPUT } else { stream }
}

/// Draft rendering error.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// Towncrier ran and failed.
    #[error(transparent)]
    Failed(#[from] DraftRenderFailure),
    /// The configured working directory is missing.
    #[error("Towncrier working directory `{}` does not exist", dir.display())]
    MissingWorkingDir {
        /// Directory towncrier was to run in.
        dir: PathBuf,
    },
    /// Towncrier could not be started.
    #[error("Failed to run `{command}`: {source}")]
    Launch {
        /// Shell-quoted command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// No pending entries and empty drafts were not allowed.
    #[error("There are no unreleased changelog entries so far")]
    Empty,
}

impl DraftError {
    /// Whether the error only means "nothing to render".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Runs towncrier in draft mode, memoizing successful renders per request.
#[derive(Debug)]
pub struct DraftRenderer {
    command: DraftCommand,
    cache: Memo<DraftRequest, String>,
}

impl Default for DraftRenderer {
    fn default() -> Self {
        Self::new(DraftCommand::default())
    }
}

impl DraftRenderer {
    /// Create a renderer invoking `command`.
    #[must_use]
    pub fn new(command: DraftCommand) -> Self {
        Self {
            command,
            cache: Memo::new(DRAFT_CACHE_CAPACITY),
        }
    }

    /// The base command this renderer invokes.
    #[must_use]
    pub fn command(&self) -> &DraftCommand {
        &self.command
    }

    /// Render the draft changelog for a request.
    ///
    /// # Errors
    ///
    /// - [`DraftError::Failed`] if towncrier exits with a non-zero status
    /// - [`DraftError::MissingWorkingDir`] if the working directory is absent
    /// - [`DraftError::Launch`] if towncrier cannot be started
    /// - [`DraftError::Empty`] if nothing is pending and
    ///   [`allow_empty`](DraftRequest::allow_empty) is false
    pub fn render(&self, request: &DraftRequest) -> Result<String, DraftError> {
        if let Some(cached) = self.cache.get(request) {
            tracing::debug!(version = %request.target_version, "Draft cache hit");
            return Ok(cached);
        }

        let draft = self.run(request)?;
        self.cache.insert(request.clone(), draft.clone());
        Ok(draft)
    }

    /// Forget all memoized drafts.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn run(&self, request: &DraftRequest) -> Result<String, DraftError> {
        let argv = self.command.argv(request);
        let quoted = shell_join(&argv);
        tracing::debug!(command = %quoted, "Rendering changelog draft");

        let mut command = Command::new(&self.command.program);
        command.args(&argv[1..]).stdin(Stdio::null());
        if let Some(dir) = &request.working_dir {
            if !dir.is_dir() {
                return Err(DraftError::MissingWorkingDir { dir: dir.clone() });
            }
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| DraftError::Launch {
            command: quoted.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(DraftRenderFailure {
                command: quoted,
                status: return_code(output.status),
                stdout,
                stderr,
            }
            .into());
        }

        let draft = stdout.trim();
        if !request.allow_empty && draft.contains(NO_CHANGES_MARKER) {
            return Err(DraftError::Empty);
        }

        Ok(draft.to_owned())
    }
}

/// Exit code of a finished process, with signals reported as negative codes.
fn return_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Join arguments into a command line a POSIX shell would split back.
pub(crate) fn shell_join(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use super::*;
    use pretty_assertions::assert_eq;

    fn sh(script: &str) -> DraftRenderer {
        DraftRenderer::new(DraftCommand::new("sh", ["-c", script, "sh"]))
    }

    fn failure(renderer: &DraftRenderer, request: &DraftRequest) -> DraftRenderFailure {
        match renderer.render(request) {
            Err(DraftError::Failed(failure)) => failure,
            other => panic!("expected a render failure, got {other:?}"),
        }
    }

    #[test]
    fn test_default_command() {
        let argv = DraftCommand::default().argv(&DraftRequest::new("1.0"));
        assert_eq!(argv, ["towncrier", "build", "--draft", "--version", "1.0"]);
    }

    #[test]
    fn test_argv_with_config_and_escaped_version() {
        let request = DraftRequest::new("|release|").with_config_path(Some("changes.toml".to_owned()));
        let argv = DraftCommand::default().argv(&request);
        assert_eq!(
            argv,
            [
                "towncrier",
                "build",
                "--draft",
                "--version",
                r"\ |release|",
                "--config",
                "changes.toml"
            ]
        );
    }

    #[test]
    fn test_failure_without_output() {
        let renderer = DraftRenderer::new(DraftCommand::new("false", Vec::<String>::new()));
        let failure = failure(&renderer, &DraftRequest::new("1.0.0"));

        assert_eq!(
            failure.to_string(),
            "Command exited unexpectedly.\n\n\
             Command: false --version 1.0.0\n\
             Return code: 1\n\n\
             Standard output:\n[No output]\n\n\
             Standard error:\n[No output]"
        );
    }

    #[test]
    fn test_failure_with_stdout() {
        let renderer = sh("printf 'test standard output\\nsecond line\\n'; exit 1");
        let request = DraftRequest::new("test version");
        let failure = failure(&renderer, &request);

        let expected_command = shell_join(&renderer.command().argv(&request));
        assert_eq!(failure.command, expected_command);
        assert!(expected_command.ends_with("--version 'test version'"));
        assert_eq!(failure.status, 1);
        assert_eq!(
            failure.to_string(),
            format!(
                "Command exited unexpectedly.\n\n\
                 Command: {expected_command}\n\
                 Return code: 1\n\n\
                 Standard output:\ntest standard output\nsecond line\n\n\n\
                 Standard error:\n[No output]"
            )
        );
    }

    #[test]
    fn test_failure_with_stderr() {
        let renderer = sh("printf 'test standard error\\nsecond line' >&2; exit 3");
        let failure = failure(&renderer, &DraftRequest::new("1.0"));

        assert_eq!(failure.status, 3);
        let message = failure.to_string();
        assert!(message.contains("Return code: 3\n"));
        assert!(message.contains("Standard output:\n[No output]\n\n"));
        assert!(message.ends_with("Standard error:\ntest standard error\nsecond line"));
    }

    #[test]
    fn test_failure_with_both_streams() {
        let renderer = sh("printf 'out'; printf 'err' >&2; exit 1");
        let failure = failure(&renderer, &DraftRequest::new("1.0"));

        assert_eq!(failure.stdout, "out");
        assert_eq!(failure.stderr, "err");
        assert!(failure.to_string().ends_with("Standard output:\nout\n\nStandard error:\nerr"));
    }

    #[test]
    fn test_config_path_is_passed() {
        let renderer = sh("printf '%s\\n' \"$@\"");
        let request =
            DraftRequest::new("test version").with_config_path(Some("sentinel-config-path".to_owned()));

        let draft = renderer.render(&request).unwrap();

        assert_eq!(
            draft.lines().collect::<Vec<_>>(),
            ["--version", "test version", "--config", "sentinel-config-path"]
        );
    }

    #[test]
    fn test_empty_draft_rejected() {
        let renderer = sh("echo 'No significant changes.'");
        let err = renderer
            .render(&DraftRequest::new("1.0").with_allow_empty(false))
            .unwrap_err();

        assert!(err.is_empty());
        assert_eq!(
            err.to_string(),
            "There are no unreleased changelog entries so far"
        );
    }

    #[test]
    fn test_empty_draft_allowed() {
        let renderer = sh("echo 'No significant changes.'");
        let draft = renderer
            .render(&DraftRequest::new("1.0").with_allow_empty(true))
            .unwrap();
        assert_eq!(draft, "No significant changes.");
    }

    #[test]
    fn test_output_is_trimmed() {
        let renderer = sh("printf '\\n1.0 (draft)\\n==========\\n\\n- Added things\\n\\n'");
        let draft = renderer.render(&DraftRequest::new("1.0")).unwrap();
        assert_eq!(draft, "1.0 (draft)\n==========\n\n- Added things");
    }

    #[test]
    fn test_runs_in_working_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = sh("pwd");

        let draft = renderer
            .render(&DraftRequest::new("1.0").with_working_dir(Some(temp_dir.path().to_path_buf())))
            .unwrap();

        assert_eq!(
            fs::canonicalize(draft).unwrap(),
            fs::canonicalize(temp_dir.path()).unwrap()
        );
    }

    #[test]
    fn test_successful_renders_are_memoized() {
        let temp_dir = tempfile::tempdir().unwrap();
        let counter = temp_dir.path().join("calls");
        let renderer = DraftRenderer::new(DraftCommand::new(
            "sh",
            [
                "-c".to_owned(),
                "echo x >> \"$0\"; echo draft".to_owned(),
                counter.display().to_string(),
            ],
        ));
        let request = DraftRequest::new("1.0");
        let calls = || fs::read_to_string(&counter).unwrap().lines().count();

        assert_eq!(renderer.render(&request).unwrap(), "draft");
        assert_eq!(renderer.render(&request).unwrap(), "draft");
        assert_eq!(calls(), 1);

        renderer.render(&request.clone().with_allow_empty(true)).unwrap();
        assert_eq!(calls(), 2);

        renderer.clear_cache();
        renderer.render(&request).unwrap();
        assert_eq!(calls(), 3);
    }

    #[test]
    fn test_launch_failure() {
        let renderer = DraftRenderer::new(DraftCommand::new(
            "rw-towncrier-test-missing-executable",
            Vec::<String>::new(),
        ));
        let err = renderer.render(&DraftRequest::new("1.0")).unwrap_err();

        assert!(matches!(err, DraftError::Launch { .. }));
        assert!(err.to_string().starts_with(
            "Failed to run `rw-towncrier-test-missing-executable --version 1.0`"
        ));
    }

    #[test]
    fn test_failure_reports_signal_as_negative_code() {
        let renderer = sh("kill -TERM $$");
        let failure = failure(&renderer, &DraftRequest::new("1.0"));

        assert_eq!(failure.status, -15);
        assert!(failure.to_string().contains("Return code: -15\n"));
    }

    #[test]
    fn test_missing_working_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("absent");
        let renderer = sh("echo unused");

        let err = renderer
            .render(&DraftRequest::new("1.0").with_working_dir(Some(missing.clone())))
            .unwrap_err();

        assert!(matches!(err, DraftError::MissingWorkingDir { ref dir } if *dir == missing));
        assert_eq!(
            err.to_string(),
            format!("Towncrier working directory `{}` does not exist", missing.display())
        );
    }
}
