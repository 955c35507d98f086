//! WineProtonManager CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wineproton_lib::catalog::{self, COMPONENT_GROUPS};
use wineproton_lib::programs::is_installer_path;
use wineproton_lib::{
    tools, Architecture, CustomProgram, Descriptor, EnvironmentKind, EnvironmentRegistry,
    InstallQueue, ItemStatus, JobEvent, JobRunner, LaunchEnvironment, ManagerError, ProgramType,
    RunHandle, RunOutcome, RunnerOptions, Store, Terminal, Theme,
};

#[derive(Parser)]
#[command(name = "wineprotonmanager")]
#[command(about = "Manage Wine and Proton environments and install software into them")]
#[command(version)]
struct Cli {
    /// Use this store file instead of the one in the config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage environments
    #[command(subcommand)]
    Env(EnvCommand),

    /// Manage saved custom programs
    #[command(subcommand)]
    Program(ProgramCommand),

    /// List well-known components
    Components {
        /// Only show this group
        #[arg(long)]
        group: Option<String>,
    },

    /// List components recorded in an environment's prefix
    Installed {
        #[arg(long)]
        env: Option<String>,
    },

    /// Install components, installer files or saved programs, in order
    Install {
        #[arg(long)]
        env: Option<String>,

        /// Run the component installer unattended
        #[arg(short = 'q', long)]
        silent: bool,

        /// Queue components even when the prefix already lists them
        #[arg(long)]
        reinstall: bool,

        /// Program names, .exe/.msi paths or component names
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Create the prefix and initialise it with wineboot
    InitPrefix {
        #[arg(long)]
        env: Option<String>,
    },

    /// Open the prefix in the file manager
    Folder {
        #[arg(long)]
        env: Option<String>,
    },

    /// Open a terminal with the environment's variables set
    Shell {
        #[arg(long)]
        env: Option<String>,
    },

    /// Start the component installer's own interface
    InstallerGui {
        #[arg(long)]
        env: Option<String>,
    },

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
enum EnvCommand {
    /// List environments
    List,

    /// Show one environment and the variables it runs with
    Show { name: String },

    /// Add or replace an environment
    Add {
        name: String,

        /// wine or proton
        #[arg(long, default_value = "wine")]
        kind: EnvironmentKind,

        /// Prefix directory (defaults to <prefix root>/<name>)
        #[arg(long)]
        prefix: Option<PathBuf>,

        /// win32 or win64
        #[arg(long, default_value = "win64")]
        arch: Architecture,

        /// Alternate Wine installation (wine only)
        #[arg(long)]
        wine_dir: Option<PathBuf>,

        /// Proton distribution root (proton only)
        #[arg(long)]
        proton_dir: Option<PathBuf>,
    },

    /// Remove an environment
    Remove { name: String },

    /// Show or set the default environment
    Default { name: Option<String> },

    /// Check that the environment's Wine runs
    Test { name: Option<String> },
}

#[derive(Subcommand)]
enum ProgramCommand {
    List,

    /// Save a component name or installer path under a name
    Add { name: String, path: String },

    Remove { name: String },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,

    /// Change one setting
    Set {
        #[command(subcommand)]
        setting: Setting,
    },
}

#[derive(Subcommand)]
enum Setting {
    /// Component installer executable
    ComponentInstaller { path: String },
    /// light or dark
    Theme { theme: Theme },
    /// Root directory for new prefixes
    PrefixPath { path: PathBuf },
    /// Terminal emulator; empty resets to the default
    Terminal { program: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wineproton_lib={level},wineprotonmanager={level}",
            level = log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut store = match &cli.config {
        Some(path) => Store::open(path),
        None => Store::open_default(),
    }
    .context("Failed to open the configuration store")?;

    match cli.command {
        Command::Env(cmd) => env_command(&mut store, cmd)?,
        Command::Program(cmd) => program_command(&mut store, cmd)?,
        Command::Components { group } => list_components(group.as_deref())?,
        Command::Installed { env } => {
            let env = launch_environment(&mut store, env.as_deref())?;
            let installed = catalog::installed_components(env.prefix());
            if installed.is_empty() {
                println!("Nothing recorded in {}", env.prefix().display());
            }
            for component in installed {
                println!("{}", component);
            }
        }
        Command::Install {
            env,
            silent,
            reinstall,
            items,
        } => {
            return install(&mut store, env.as_deref(), silent, reinstall, &items).await;
        }
        Command::InitPrefix { env } => {
            let (terminal, env) = terminal_and_environment(&mut store, env.as_deref())?;
            tools::create_prefix(&env, &terminal)?;
            println!("Prefix ready: {}", env.prefix().display());
        }
        Command::Folder { env } => {
            let env = launch_environment(&mut store, env.as_deref())?;
            tools::open_prefix_folder(env.prefix())?;
        }
        Command::Shell { env } => {
            let (terminal, env) = terminal_and_environment(&mut store, env.as_deref())?;
            tools::open_shell(&env, &terminal)?;
        }
        Command::InstallerGui { env } => {
            let env = launch_environment(&mut store, env.as_deref())?;
            tools::open_installer_gui(&env, &store.component_installer())?;
        }
        Command::Settings(cmd) => settings_command(&mut store, cmd)?,
    }

    Ok(0)
}

/// Resolve `--env`, falling back to the last-used environment
fn launch_environment(store: &mut Store, name: Option<&str>) -> Result<LaunchEnvironment> {
    let registry = EnvironmentRegistry::new(store);
    let name = match name {
        Some(name) => name.to_string(),
        None => registry.default_name().to_string(),
    };
    if name.is_empty() {
        bail!("No environment selected. Pass --env NAME or run `env default NAME`.");
    }

    registry
        .resolve_environment(&name)
        .ok_or_else(|| ManagerError::EnvironmentNotFound(name).into())
}

/// Detect the terminal, then resolve the environment. Resolving runs
/// `wine --version`, so a missing terminal must be reported first.
fn terminal_and_environment(
    store: &mut Store,
    name: Option<&str>,
) -> Result<(Terminal, LaunchEnvironment)> {
    let terminal = Terminal::detect(store.settings().terminal_program())?;
    let env = launch_environment(store, name)?;
    Ok((terminal, env))
}

fn env_command(store: &mut Store, cmd: EnvCommand) -> Result<()> {
    match cmd {
        EnvCommand::List => {
            let registry = EnvironmentRegistry::new(store);
            let default = registry.default_name().to_string();
            for desc in registry.list() {
                let marker = if desc.name == default { "*" } else { " " };
                println!(
                    "{} {:<24} {:<7} {:<6} {}",
                    marker,
                    desc.name,
                    desc.kind,
                    desc.architecture,
                    desc.prefix.display()
                );
            }
        }
        EnvCommand::Show { name } => {
            let registry = EnvironmentRegistry::new(store);
            let desc = registry
                .get(&name)
                .ok_or_else(|| ManagerError::EnvironmentNotFound(name.clone()))?;
            println!("Name:         {}", desc.name);
            println!("Type:         {}", desc.kind);
            println!("Architecture: {}", desc.architecture);
            println!("Prefix:       {}", desc.prefix.display());
            if let Some(dir) = &desc.runtime_dir {
                println!("Wine dir:     {}", dir.display());
            }
            if let Some(dir) = &desc.proton_dir {
                println!("Proton dir:   {}", dir.display());
            }

            if let Some(env) = registry.resolve_environment(&name) {
                println!(
                    "Wine version: {}",
                    env.wine_version().unwrap_or("unknown")
                );
                println!("Variables:");
                for (key, value) in env.vars() {
                    println!("  {}={}", key, value);
                }
            }
        }
        EnvCommand::Add {
            name,
            kind,
            prefix,
            arch,
            wine_dir,
            proton_dir,
        } => {
            let prefix = match prefix {
                Some(prefix) => prefix,
                None => store.settings().prefix_path.join(name.trim()),
            };
            let descriptor = match kind {
                EnvironmentKind::Wine => {
                    if proton_dir.is_some() {
                        bail!("--proton-dir only applies to proton environments");
                    }
                    Descriptor::wine(name, prefix, arch, wine_dir)
                }
                EnvironmentKind::Proton => {
                    if wine_dir.is_some() {
                        bail!("--wine-dir only applies to wine environments");
                    }
                    let proton_dir =
                        proton_dir.context("proton environments need --proton-dir")?;
                    Descriptor::proton(name, prefix, arch, proton_dir)
                }
            };

            let label = descriptor.name.trim().to_string();
            EnvironmentRegistry::new(store).upsert(descriptor)?;
            println!("Saved environment {}", label);
        }
        EnvCommand::Remove { name } => {
            EnvironmentRegistry::new(store).remove(&name)?;
            println!("Removed environment {}", name);
        }
        EnvCommand::Default { name } => {
            let mut registry = EnvironmentRegistry::new(store);
            match name {
                Some(name) => {
                    registry.set_default(&name)?;
                    println!("Default environment: {}", name);
                }
                None if registry.default_name().is_empty() => println!("No default environment"),
                None => println!("{}", registry.default_name()),
            }
        }
        EnvCommand::Test { name } => {
            let env = launch_environment(store, name.as_deref())?;
            let version = tools::test_environment(&env)
                .with_context(|| format!("Environment {} does not work", env.name()))?;
            println!("{}: {}", env.name(), version);
        }
    }
    Ok(())
}

fn program_command(store: &mut Store, cmd: ProgramCommand) -> Result<()> {
    match cmd {
        ProgramCommand::List => {
            for program in store.custom_programs() {
                println!("{:<24} {:<10} {}", program.name, program.kind, program.path);
            }
        }
        ProgramCommand::Add { name, path } => {
            let program = CustomProgram::new(&name, &path)?;
            let label = format!("{} ({})", program.name, program.kind);
            store.add_custom_program(program)?;
            println!("Saved {}", label);
        }
        ProgramCommand::Remove { name } => {
            if !store.remove_custom_program(&name)? {
                bail!("No custom program named {}", name);
            }
            println!("Removed {}", name);
        }
    }
    Ok(())
}

fn list_components(group: Option<&str>) -> Result<()> {
    let groups: Vec<_> = match group {
        Some(title) => vec![catalog::find_group(title)
            .with_context(|| format!("Unknown component group: {}", title))?],
        None => COMPONENT_GROUPS.iter().collect(),
    };

    for group in groups {
        println!("{}:", group.title);
        for component in group.components {
            println!("  {}", component);
        }
    }
    Ok(())
}

fn settings_command(store: &mut Store, cmd: SettingsCommand) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            let settings = store.settings();
            println!("Store:               {}", store.path().display());
            println!("Component installer: {}", settings.component_installer_path);
            println!("Prefix root:         {}", settings.prefix_path.display());
            println!("Terminal:            {}", settings.terminal_program());
            println!("Theme:               {}", settings.theme);
        }
        SettingsCommand::Set { setting } => match setting {
            Setting::ComponentInstaller { path } => store.set_component_installer_path(&path)?,
            Setting::Theme { theme } => store.set_theme(theme)?,
            Setting::PrefixPath { path } => store.set_prefix_root(path)?,
            Setting::Terminal { program } => store.set_terminal(Some(program))?,
        },
    }
    Ok(())
}

/// Turn command-line items into queue rows: a saved program name first,
/// then an installer path, otherwise a component name. Components the
/// prefix already lists are skipped unless `reinstall` is set.
fn build_queue(
    store: &Store,
    items: &[String],
    prefix: &Path,
    reinstall: bool,
) -> Result<InstallQueue> {
    let mut queue = InstallQueue::new();
    for item in items {
        if let Some(program) = store.custom_program(item) {
            if program.kind == ProgramType::Component
                && skip_installed(prefix, &program.path, reinstall)
            {
                continue;
            }
            queue.push_program(program);
        } else if is_installer_path(item) {
            queue.push_package(Path::new(item))?;
        } else {
            if !catalog::is_known_component(item) {
                warn!("{} is not a well-known component, passing it on anyway", item);
            }
            if skip_installed(prefix, item, reinstall) {
                continue;
            }
            queue.push_component(item)?;
        }
    }
    Ok(queue)
}

fn skip_installed(prefix: &Path, component: &str, reinstall: bool) -> bool {
    if reinstall || !catalog::is_installed(prefix, component) {
        return false;
    }
    warn!(
        "{} is already installed in {}, skipping it (pass --reinstall to install it again)",
        component,
        prefix.display()
    );
    true
}

async fn install(
    store: &mut Store,
    env_name: Option<&str>,
    silent: bool,
    reinstall: bool,
    items: &[String],
) -> Result<i32> {
    let (terminal, env) = terminal_and_environment(store, env_name)?;
    let queue = build_queue(store, items, env.prefix(), reinstall)?;
    if queue.is_empty() {
        println!("Nothing to install");
        return Ok(0);
    }

    if !env.prefix().exists() {
        info!("Prefix {} does not exist yet", env.prefix().display());
        tools::create_prefix(&env, &terminal).context("Failed to create the prefix")?;
    }

    let options = RunnerOptions {
        silent,
        component_installer: store.component_installer(),
        terminal,
    };
    let handle = JobRunner::new(queue.items().to_vec(), env, options).start()?;

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current item");
            cancel.cancel();
        }
    });

    let (queue, outcome) = tokio::task::spawn_blocking(move || follow(handle, queue))
        .await
        .context("Progress reporting stopped unexpectedly")?;

    for item in queue.items() {
        match &item.status {
            ItemStatus::Failed(output) => println!(
                "{:<12} {:<9} {}: {}",
                item.status,
                item.kind.label(),
                item.display_name,
                output
            ),
            status => println!("{:<12} {:<9} {}", status, item.kind.label(), item.display_name),
        }
    }

    Ok(match outcome {
        RunOutcome::Completed => 0,
        RunOutcome::Failed => 1,
        RunOutcome::Cancelled => 130,
    })
}

/// Drain runner events into the queue rows and a progress bar
fn follow(handle: RunHandle, mut queue: InstallQueue) -> (InstallQueue, RunOutcome) {
    let total = queue.len();
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);

    for event in handle.events().iter() {
        queue.apply(&event);
        match event {
            JobEvent::Started { index, name } => {
                pb.println(format!("[{}/{}] Installing {}", index + 1, total, name));
                pb.set_message(name);
            }
            JobEvent::Completed { name, .. } => {
                pb.inc(1);
                pb.println(format!("Done: {}", name));
            }
            JobEvent::Failed { name, output, .. } => {
                pb.println(format!("Failed: {}: {}", name, output));
            }
            JobEvent::Finished(outcome) => {
                match outcome {
                    RunOutcome::Completed => pb.println("All items installed"),
                    RunOutcome::Failed => pb.println("Installation stopped after a failure"),
                    RunOutcome::Cancelled => pb.println("Installation cancelled"),
                }
                break;
            }
        }
    }
    pb.finish_and_clear();

    let outcome = handle.join();
    (queue, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(path: &Path, body: &str) {
        fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Store with a `Games` environment whose `wine` leaves a marker when run
    fn scratch_store(dir: &Path) -> Store {
        let bin = dir.join("wine/bin");
        fs::create_dir_all(&bin).unwrap();
        write_script(
            &bin.join("wine"),
            &format!("echo spawned >> {}", dir.join("marker").display()),
        );

        let mut store = Store::load(dir.join("config.json")).unwrap();
        store.ensure_defaults().unwrap();
        EnvironmentRegistry::new(&mut store)
            .upsert(Descriptor::wine(
                "Games",
                dir.join("pfx"),
                Architecture::Win64,
                Some(dir.join("wine")),
            ))
            .unwrap();
        store
    }

    fn names(queue: &InstallQueue) -> Vec<&str> {
        queue.items().iter().map(|i| i.display_name.as_str()).collect()
    }

    #[tokio::test]
    async fn missing_terminal_stops_install_before_wine_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        store
            .set_terminal(Some("/nonexistent/konsole".into()))
            .unwrap();

        let items = ["vcrun2019".to_string()];
        let err = install(&mut store, Some("Games"), false, false, &items)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ManagerError>(),
            Some(ManagerError::MissingTool { .. })
        ));
        assert!(!dir.path().join("marker").exists());
    }

    #[test]
    fn terminal_is_checked_before_environment_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        store
            .set_terminal(Some("/nonexistent/konsole".into()))
            .unwrap();

        assert!(terminal_and_environment(&mut store, Some("Games")).is_err());
        assert!(!dir.path().join("marker").exists());

        let term = dir.path().join("term");
        write_script(&term, "exit 0");
        store
            .set_terminal(Some(term.to_string_lossy().into_owned()))
            .unwrap();
        let (terminal, env) = terminal_and_environment(&mut store, Some("Games")).unwrap();
        assert_eq!(terminal.program(), term.as_path());
        assert_eq!(env.name(), "Games");
    }

    #[test]
    fn installed_components_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        store
            .add_custom_program(CustomProgram::new("Runtime", "vcrun2019").unwrap())
            .unwrap();

        let prefix = dir.path().join("pfx");
        fs::create_dir_all(&prefix).unwrap();
        fs::write(prefix.join(catalog::INSTALL_LOG), "vcrun2019\n").unwrap();

        let items = ["vcrun2019".to_string(), "d3dx9".into(), "Runtime".into()];
        let queue = build_queue(&store, &items, &prefix, false).unwrap();
        assert_eq!(names(&queue), ["d3dx9"]);
    }

    #[test]
    fn reinstall_queues_installed_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = scratch_store(dir.path());

        let prefix = dir.path().join("pfx");
        fs::create_dir_all(&prefix).unwrap();
        fs::write(prefix.join(catalog::INSTALL_LOG), "vcrun2019\n").unwrap();

        let items = ["vcrun2019".to_string(), "d3dx9".into()];
        let queue = build_queue(&store, &items, &prefix, true).unwrap();
        assert_eq!(names(&queue), ["vcrun2019", "d3dx9"]);
        assert_eq!(queue.items()[0].kind.label(), "component");
    }
}
