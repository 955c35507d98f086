//! WineProtonManager Library
//!
//! Core library for managing named Wine and Proton environments and
//! running queued component and installer jobs inside them.

pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod launch;
pub mod programs;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod store;
pub mod terminal;
pub mod tools;
pub mod wine;

pub use config::{Settings, Theme};
pub use environment::{Architecture, Descriptor, EnvironmentKind, BUILTIN_ENVIRONMENT};
pub use error::{ManagerError, Result};
pub use launch::LaunchEnvironment;
pub use programs::{CustomProgram, ProgramType};
pub use queue::{InstallQueue, ItemKind, ItemStatus, QueuedItem};
pub use registry::EnvironmentRegistry;
pub use runner::{CancelToken, JobEvent, JobRunner, RunHandle, RunOutcome, RunnerOptions};
pub use store::{Store, StoreDocument};
pub use terminal::{HoldMode, Terminal};
pub use wine::Wine;
