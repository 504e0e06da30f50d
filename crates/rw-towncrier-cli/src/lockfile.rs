//! Platform-specific pip lock files.
//!
//! Lock files are named `<env>-<python tag>-<platform>-<machine>.txt`, e.g.
//! `py311-cp311-linux-x86_64.txt`, and live in a requirements directory whose
//! sibling `direct/` directory holds the unpinned `<env>.in` inputs.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CliError;
use crate::output::Output;

/// Prints the interpreter facts a lock file name depends on.
const PROBE_SCRIPT: &str = "import platform, sys; \
    print(sys.implementation.name, sys.version_info[0], sys.version_info[1], \
    sys.platform, platform.machine())";

/// Python interpreter identity relevant to lock file naming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PythonRuntime {
    /// `sys.implementation.name`, e.g. `cpython`.
    pub implementation: String,
    pub major: u32,
    pub minor: u32,
    /// `sys.platform`, e.g. `linux`, `darwin`, `win32`.
    pub platform: String,
    /// Lowercased `platform.machine()`, e.g. `x86_64`, `arm64`.
    pub machine: String,
}

impl PythonRuntime {
    /// Ask `python` about itself.
    pub(crate) fn probe(python: &str) -> Result<Self, CliError> {
        let probe_error = |message: String| CliError::Probe {
            python: python.to_owned(),
            message,
        };

        let output = Command::new(python)
            .args(["-c", PROBE_SCRIPT])
            .output()
            .map_err(|e| probe_error(e.to_string()))?;
        if !output.status.success() {
            return Err(probe_error(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe(&stdout)
            .ok_or_else(|| probe_error(format!("unexpected output {:?}", stdout.trim())))
    }

    fn parse_probe(stdout: &str) -> Option<Self> {
        let mut fields = stdout.split_whitespace();
        let runtime = Self {
            implementation: fields.next()?.to_owned(),
            major: fields.next()?.parse().ok()?,
            minor: fields.next()?.parse().ok()?,
            platform: normalize_platform(fields.next()?).to_owned(),
            machine: fields.next()?.to_lowercase(),
        };
        fields.next().is_none().then_some(runtime)
    }

    /// Wheel-style Python tag, e.g. `cp311` or `pp310`.
    pub(crate) fn python_tag(&self) -> String {
        let prefix = match self.implementation.as_str() {
            "cpython" => "cp",
            "ironpython" => "ip",
            "jython" => "jy",
            "python" => "py",
            "pypy" => "pp",
            other => other,
        };
        format!("{prefix}{}{}", self.major, self.minor)
    }

    fn is_pypy(&self) -> bool {
        self.implementation == "pypy"
    }
}

/// Python 2 reported Linux as `linux2`.
fn normalize_platform(platform: &str) -> &str {
    if platform == "linux2" { "linux" } else { platform }
}

/// Lock file name without directory or extension.
///
/// The generic env names `py` and `python` are replaced by the interpreter
/// version, e.g. `py311` or `pypy310`.
pub(crate) fn lock_base_name(runtime: &PythonRuntime, env: &str) -> String {
    let tag = runtime.python_tag();
    let env = if matches!(env, "py" | "python") {
        let prefix = if runtime.is_pypy() { "pypy" } else { "py" };
        let version = tag.get(2..).unwrap_or_default();
        format!("{prefix}{version}")
    } else {
        env.to_owned()
    };
    format!("{env}-{tag}-{}-{}", runtime.platform, runtime.machine)
}

/// Lock file path for `env` inside `req_dir`.
pub(crate) fn lock_file_path(req_dir: &Path, runtime: &PythonRuntime, env: &str) -> PathBuf {
    req_dir
        .join(lock_base_name(runtime, env))
        .with_extension("txt")
}

/// `python -Im pip <args>`, constrained by `lock_file` when it exists.
pub(crate) fn pip_command(
    python: &str,
    pip_args: &[String],
    lock_file: &Path,
    output: &Output,
) -> Vec<String> {
    let mut argv = vec![python.to_owned(), "-Im".to_owned(), "pip".to_owned()];
    argv.extend(pip_args.iter().cloned());
    if lock_file.is_file() {
        argv.push("--constraint".to_owned());
        argv.push(lock_file.display().to_string());
    } else {
        output.warning(&format!(
            "WARNING: The expected pinned constraints file for the current env does not exist (should be \"{}\").",
            lock_file.display()
        ));
    }
    argv
}

/// `python -Im piptools compile` producing `lock_file` from the env's
/// direct dependencies.
pub(crate) fn compile_command(
    python: &str,
    lock_file: &Path,
    env: &str,
    extra_args: &[String],
) -> Vec<String> {
    let requirements_root = lock_file
        .parent()
        .and_then(Path::parent)
        .unwrap_or(Path::new(""));
    let direct = requirements_root.join("direct").join(format!("{env}.in"));

    let mut argv = vec![
        python.to_owned(),
        "-Im".to_owned(),
        "piptools".to_owned(),
        "compile".to_owned(),
        format!("--output-file={}", lock_file.display()),
        direct.display().to_string(),
    ];
    argv.extend(extra_args.iter().cloned());
    argv
}

/// Log `argv` in shell-quoted form, then run it to completion.
pub(crate) fn run_command(argv: &[String], output: &Output) -> Result<(), CliError> {
    let quoted = shlex::try_join(argv.iter().map(String::as_str))
        .unwrap_or_else(|_| argv.join(" "));
    output.info(&format!("Invoking the following command: {quoted}"));

    let Some((program, args)) = argv.split_first() else {
        return Ok(());
    };
    let status = Command::new(program).args(args).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::CommandFailed {
            command: quoted,
            status: status.to_string(),
        })
    }
}
