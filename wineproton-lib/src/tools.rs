//! One-shot launches inside an environment: testing it, creating its prefix,
//! and opening a shell, file manager or the component installer's own GUI

use crate::error::{ManagerError, Result};
use crate::launch::LaunchEnvironment;
use crate::terminal::{HoldMode, Terminal};
use crate::wine::Wine;
use std::fs::DirBuilder;
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Run `wine --version` in the environment; any failure is reported
pub fn test_environment(env: &LaunchEnvironment) -> Result<String> {
    let version = Wine::from_environment(env).version(env)?;
    info!("Environment {} is usable: {}", env.name(), version);
    Ok(version)
}

/// Create the prefix directory and let `wineboot` populate it in a terminal
pub fn create_prefix(env: &LaunchEnvironment, terminal: &Terminal) -> Result<()> {
    let prefix = env.prefix();
    info!("Creating prefix {:?}", prefix);

    DirBuilder::new().recursive(true).mode(0o755).create(prefix)?;

    let mut cmd = terminal.command(HoldMode::NoClose, [env.wine(), "wineboot"]);
    env.apply(&mut cmd);

    let status = cmd.status().map_err(|e| ManagerError::CommandExecution {
        command: format!("{:?}", cmd),
        error: e.to_string(),
    })?;

    if !status.success() {
        return Err(ManagerError::CommandFailed {
            code: status.code(),
            output: format!("wineboot did not initialise {}", prefix.display()),
        });
    }
    Ok(())
}

/// Reveal the prefix in the desktop file manager
pub fn open_prefix_folder(prefix: &Path) -> Result<()> {
    if !prefix.exists() {
        return Err(ManagerError::MissingFile(prefix.to_path_buf()));
    }
    let mut cmd = Command::new("xdg-open");
    cmd.arg(prefix);
    spawn_detached(cmd, "xdg-open")
}

/// Open a terminal whose shell inherits the environment's variables
pub fn open_shell(env: &LaunchEnvironment, terminal: &Terminal) -> Result<()> {
    let mut cmd = terminal.interactive();
    env.apply(&mut cmd);
    spawn_detached(cmd, &terminal.program().to_string_lossy())
}

/// Start the component installer's own interface
pub fn open_installer_gui(env: &LaunchEnvironment, installer: &Path) -> Result<()> {
    let mut cmd = Command::new(installer);
    cmd.arg("--gui");
    env.apply(&mut cmd);
    spawn_detached(cmd, &installer.to_string_lossy())
}

fn spawn_detached(mut cmd: Command, tool: &str) -> Result<()> {
    match cmd.spawn() {
        Ok(child) => {
            info!("Started {} (pid {})", tool, child.id());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ManagerError::MissingTool {
            tool: tool.to_string(),
            hint: "install it or adjust the settings".into(),
        }),
        Err(e) => Err(ManagerError::CommandExecution {
            command: format!("{:?}", cmd),
            error: e.to_string(),
        }),
    }
}
