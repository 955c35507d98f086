//! Wine interface for querying the binaries of a resolved environment

use crate::error::{ManagerError, Result};
use crate::launch::LaunchEnvironment;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// The `wine` binary of one environment
#[derive(Debug, Clone)]
pub struct Wine {
    pub wine_bin: PathBuf,
}

impl Wine {
    pub fn from_environment(env: &LaunchEnvironment) -> Self {
        Self {
            wine_bin: PathBuf::from(env.wine()),
        }
    }

    /// `wine` command with the environment's variables applied
    pub fn command(&self, env: &LaunchEnvironment) -> Command {
        let mut cmd = Command::new(&self.wine_bin);
        env.apply(&mut cmd);
        cmd
    }

    /// Get wine version; any failure is an error
    pub fn version(&self, env: &LaunchEnvironment) -> Result<String> {
        let output = self
            .command(env)
            .arg("--version")
            .output()
            .map_err(|e| ManagerError::CommandExecution {
                command: format!("{:?} --version", self.wine_bin),
                error: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Err(ManagerError::CommandFailed {
                code: output.status.code(),
                output: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if version.is_empty() {
            return Err(ManagerError::CommandFailed {
                code: output.status.code(),
                output: "wine --version returned empty".into(),
            });
        }

        Ok(version)
    }

    /// Version string when obtainable, `None` otherwise
    pub fn probe_version(&self, env: &LaunchEnvironment) -> Option<String> {
        match self.version(env) {
            Ok(version) => {
                debug!("{:?} reports {}", self.wine_bin, version);
                Some(version)
            }
            Err(e) => {
                warn!("Could not query version of {:?}: {}", self.wine_bin, e);
                None
            }
        }
    }
}
