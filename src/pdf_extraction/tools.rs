// Thin wrappers around the poppler / tesseract command-line tools
use crate::types::{FaultError, Result};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::Command;

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Runs `program` to completion and returns its stdout.
pub fn run_tool<I, S>(program: &str, args: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            FaultError::ToolMissing(program.to_string())
        } else {
            FaultError::Io(e)
        }
    })?;

    if !output.status.success() {
        return Err(FaultError::ToolFailed {
            tool: program.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
