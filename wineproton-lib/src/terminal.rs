//! Terminal emulator used to show native installer output

use crate::error::{ManagerError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

/// How the terminal window behaves once the command exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldMode {
    /// `--noclose`: used for installer packages
    NoClose,
    /// `--hold`: used for component installs
    Hold,
}

impl HoldMode {
    pub fn flag(&self) -> &'static str {
        match self {
            HoldMode::NoClose => "--noclose",
            HoldMode::Hold => "--hold",
        }
    }
}

/// A terminal emulator accepting `<flag> -e <cmd...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    program: PathBuf,
}

impl Terminal {
    /// Use `program` as-is, without checking that it exists
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the terminal: an explicit path must exist, a bare name is
    /// looked up on `PATH`.
    pub fn detect(program: &str) -> Result<Self> {
        let missing = || ManagerError::MissingTool {
            tool: program.to_string(),
            hint: "a terminal emulator is needed to show installer output".into(),
        };

        if program.contains('/') {
            let path = Path::new(program);
            if path.is_file() {
                Ok(Self::new(path))
            } else {
                Err(missing())
            }
        } else {
            which(program).map(Self::new).map_err(|_| missing())
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `<terminal> <hold flag> -e <argv...>`
    pub fn command<I, S>(&self, mode: HoldMode, argv: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.arg(mode.flag()).arg("-e").args(argv);
        cmd
    }

    /// A bare terminal window running the user's shell
    pub fn interactive(&self) -> Command {
        Command::new(&self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_hold_command_line() {
        let terminal = Terminal::new("konsole");
        let cmd = terminal.command(HoldMode::Hold, ["winetricks", "--force", "d3dx9"]);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(cmd.get_program(), "konsole");
        assert_eq!(args, ["--hold", "-e", "winetricks", "--force", "d3dx9"]);
    }

    #[test]
    fn builds_noclose_command_line() {
        let terminal = Terminal::new("/usr/bin/konsole");
        let cmd = terminal.command(HoldMode::NoClose, ["wine", "/tmp/setup.exe"]);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["--noclose", "-e", "wine", "/tmp/setup.exe"]);
    }

    #[test]
    fn missing_terminal_is_reported() {
        let err = Terminal::detect("/nonexistent/bin/konsole").unwrap_err();
        assert!(matches!(err, ManagerError::MissingTool { .. }));

        let err = Terminal::detect("no-such-terminal-emulator-xyz").unwrap_err();
        assert!(matches!(err, ManagerError::MissingTool { .. }));
    }
}
