/*
* Lifecycle scripts bringing the overlay interfaces up and down.
*
* Scripts live in a single directory as `<iface>-setup.sh` and
* `<iface>-down.sh` for fpn0 and fpn1. They are run with argument vector
* semantics (no shell) and are considered successful only when they wrote
* nothing to stderr and printed the literal success marker on stdout.
*/

use crate::network::{Iface, InterfaceState};
use crate::retry::RetryPolicy;

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use strum::IntoEnumIterator;

// Error handling
use fpnd_error::NetError;
use log::{error, info, trace};

/// Literal the external scripts print on success.
pub const SUCCESS_MARKER: &str = "Success";

/// Resolve lifecycle scripts in `bin_dir`.
///
/// - With an interface: the single script for that interface and state,
///   or `None` if it is missing.
/// - Without: all four scripts (fpn0 up/down, fpn1 up/down), or `None`
///   if any of them is missing.
pub fn get_net_cmds(
    bin_dir: &Path,
    iface: Option<Iface>,
    state: InterfaceState,
) -> Option<Vec<PathBuf>> {
    if !bin_dir.is_dir() {
        error!("No such path: {}", bin_dir.display());
        return None;
    }

    match iface {
        Some(iface) => {
            let cmd = bin_dir.join(iface.script(state));
            if cmd.is_file() {
                Some(vec![cmd])
            } else {
                None
            }
        }
        None => {
            let mut cmds = vec![];
            for iface in Iface::iter() {
                for state in [InterfaceState::Up, InterfaceState::Down] {
                    let cmd = bin_dir.join(iface.script(state));
                    if !cmd.is_file() {
                        trace!("missing lifecycle script: {}", cmd.display());
                        return None;
                    }
                    cmds.push(cmd);
                }
            }
            Some(cmds)
        }
    }
}

/// Exit status of a command, or the error that kept it from running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnCode {
    /// `None` when killed by a signal.
    Exited(Option<i32>),
    Error(String),
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReturnCode::Exited(Some(code)) => write!(f, "exit status {}", code),
            ReturnCode::Exited(None) => write!(f, "killed by signal"),
            ReturnCode::Error(e) => write!(f, "{}", e),
        }
    }
}

/// What a lifecycle command run amounts to.
/// `output` holds stderr on error output, stdout on success, nothing otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub succeeded: bool,
    pub output: Vec<u8>,
    pub code: ReturnCode,
}

impl CommandOutcome {
    fn error(reason: &str) -> Self {
        Self {
            succeeded: false,
            output: vec![],
            code: ReturnCode::Error(reason.to_owned()),
        }
    }
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).trim().to_owned()
    }
}

fn basename(cmd: &Path) -> String {
    cmd.file_name()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Run `cmd` once: first element is the program, the rest its arguments.
pub fn run_net_cmd<S: AsRef<OsStr>>(cmd: &[S]) -> CommandOutcome {
    let program = match cmd.first() {
        Some(program) => Path::new(program.as_ref()),
        None => {
            error!("Bad cmd or path: empty command");
            return CommandOutcome::error("empty command");
        }
    };
    let tail = basename(program);
    if tail.is_empty() {
        error!("Bad cmd or path: {}", program.display());
    }

    let res = Command::new(program)
        .args(&cmd[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match res {
        Err(e) => {
            error!("net cmd {} exception: {}", tail, e);
            CommandOutcome::error(&e.to_string())
        }
        Ok(out) => {
            let code = ReturnCode::Exited(out.status.code());
            let stdout = String::from_utf8_lossy(&out.stdout);
            if !out.stderr.is_empty() {
                error!(
                    "net cmd {} err: {}",
                    tail,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                CommandOutcome {
                    succeeded: false,
                    output: out.stderr,
                    code,
                }
            } else if stdout.trim().contains(SUCCESS_MARKER) {
                info!("net cmd {} result: {}", tail, stdout.trim());
                CommandOutcome {
                    succeeded: true,
                    output: out.stdout,
                    code,
                }
            } else {
                error!("net cmd {} gave no success marker ({})", tail, code);
                CommandOutcome {
                    succeeded: false,
                    output: vec![],
                    code,
                }
            }
        }
    }
}

/// Runs lifecycle scripts under a retry policy.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    pub bin_dir: PathBuf,
    pub policy: RetryPolicy,
}

impl CommandRunner {
    pub fn new(bin_dir: &Path, policy: RetryPolicy) -> Self {
        Self {
            bin_dir: bin_dir.to_owned(),
            policy,
        }
    }

    /// Script bringing `iface` to `state`, if present.
    pub fn resolve(&self, iface: Iface, state: InterfaceState) -> Option<PathBuf> {
        get_net_cmds(&self.bin_dir, Some(iface), state).and_then(|mut e| e.pop())
    }

    /// Run `cmd` until it succeeds or the attempt budget is spent.
    /// The last outcome is returned either way.
    pub fn run<S: AsRef<OsStr>>(&self, cmd: &[S]) -> CommandOutcome {
        let tail = cmd
            .first()
            .map(|e| basename(Path::new(e.as_ref())))
            .unwrap_or_default();

        let mut last: Option<CommandOutcome> = None;
        let res = self.policy.retry(|attempt| {
            trace!("{} {} attempt {}", "[exec]".yellow(), tail, attempt);
            let outcome = run_net_cmd(cmd);
            if outcome.succeeded {
                Ok(outcome)
            } else {
                let err = NetError::CommandFailure {
                    cmd: tail.clone(),
                    reason: outcome.code.to_string(),
                };
                last = Some(outcome);
                Err(err)
            }
        });
        match res {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} {}", "[exec]".red(), e);
                last.unwrap_or_else(|| CommandOutcome::error(&e.to_string()))
            }
        }
    }

    /// Resolve and run the script bringing `iface` to `state`.
    pub fn set_iface(&self, iface: Iface, state: InterfaceState) -> Result<CommandOutcome, NetError> {
        let cmd = self.resolve(iface, state).ok_or_else(|| NetError::CommandFailure {
            cmd: iface.script(state),
            reason: format!("not found in {}", self.bin_dir.display()),
        })?;
        Ok(self.run(&[cmd]))
    }
}
