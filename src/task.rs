//! Toolchain command execution.  Unaware of rules, staleness, or platforms;
//! commands are opaque strings that either succeed or fail, run one at a
//! time with the engine blocking until each exits.

use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;

/// The result of one executed command.
pub struct TaskResult {
    pub success: bool,
    /// Merged stdout/stderr capture.
    pub output: Vec<u8>,
}

/// Executes the commands the build engine decides to run.  The engine also
/// passes the artifact a command is expected to produce, which lets test
/// doubles fake the command's effect on disk.
pub trait Runner {
    fn run(&mut self, cmdline: &str, produces: &Path) -> anyhow::Result<TaskResult>;
}

/// Runs commands through the shell.
pub struct Subprocess;

impl Runner for Subprocess {
    fn run(&mut self, cmdline: &str, _produces: &Path) -> anyhow::Result<TaskResult> {
        let cmd = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(cmdline)
            .output()?;
        let mut output = Vec::new();
        output.extend_from_slice(&cmd.stdout);
        output.extend_from_slice(&cmd.stderr);
        let success = cmd.status.success();
        if !success {
            if let Some(sig) = cmd.status.signal() {
                match sig {
                    libc::SIGINT => write!(output, "interrupted").unwrap(),
                    _ => write!(output, "signal {}", sig).unwrap(),
                }
            }
        }
        Ok(TaskResult { success, output })
    }
}
