//! Ordered list of things to install and their per-row status

use crate::error::{ManagerError, Result};
use crate::programs::{absolutize, CustomProgram, ProgramType};
use crate::runner::JobEvent;
use std::fmt;
use std::path::{Path, PathBuf};

/// What a queued item installs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Name understood by the component installer
    Component(String),
    /// Absolute path of an installer file
    Package(PathBuf),
}

impl ItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Component(_) => "component",
            ItemKind::Package(_) => "package",
        }
    }
}

/// Row status shown next to a queued item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemStatus {
    #[default]
    Pending,
    Installing,
    Completed,
    Failed(String),
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Pending => f.pad("Pending"),
            ItemStatus::Installing => f.pad("Installing..."),
            ItemStatus::Completed => f.pad("Done"),
            ItemStatus::Failed(_) => f.pad("Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedItem {
    pub display_name: String,
    pub kind: ItemKind,
    pub status: ItemStatus,
}

impl QueuedItem {
    pub fn component(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            kind: ItemKind::Component(name),
            status: ItemStatus::Pending,
        }
    }

    /// Package item displayed by its file name. The file is only checked
    /// when the runner reaches it.
    pub fn package(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            display_name,
            kind: ItemKind::Package(path),
            status: ItemStatus::Pending,
        }
    }

    pub fn from_program(program: &CustomProgram) -> Self {
        match program.kind {
            ProgramType::Package => Self::package(&program.path),
            ProgramType::Component => Self::component(program.path.clone()),
        }
    }
}

/// Items waiting for the next run
#[derive(Debug, Clone, Default)]
pub struct InstallQueue {
    items: Vec<QueuedItem>,
}

impl InstallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[QueuedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: QueuedItem) {
        self.items.push(item);
    }

    pub fn push_component(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ManagerError::Validation("component name must not be empty".into()));
        }
        self.items.push(QueuedItem::component(name));
        Ok(())
    }

    /// Queue an installer file; it must exist now and is stored absolute
    pub fn push_package(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ManagerError::MissingFile(path.to_path_buf()));
        }
        self.items.push(QueuedItem::package(absolutize(path)?));
        Ok(())
    }

    pub fn push_program(&mut self, program: &CustomProgram) {
        self.items.push(QueuedItem::from_program(program));
    }

    pub fn remove(&mut self, index: usize) -> Option<QueuedItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Swap with the previous row; returns whether anything moved
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.items.swap(index, index - 1);
        true
    }

    /// Swap with the next row; returns whether anything moved
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.items.len() {
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Mark every row pending again before a new run
    pub fn reset_statuses(&mut self) {
        for item in &mut self.items {
            item.status = ItemStatus::Pending;
        }
    }

    /// Update the row a runner event refers to
    pub fn apply(&mut self, event: &JobEvent) {
        let (index, status) = match event {
            JobEvent::Started { index, .. } => (*index, ItemStatus::Installing),
            JobEvent::Completed { index, .. } => (*index, ItemStatus::Completed),
            JobEvent::Failed { index, output, .. } => (*index, ItemStatus::Failed(output.clone())),
            JobEvent::Finished(_) => return,
        };
        if let Some(item) = self.items.get_mut(index) {
            item.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOutcome;

    fn names(queue: &InstallQueue) -> Vec<&str> {
        queue.items().iter().map(|i| i.display_name.as_str()).collect()
    }

    #[test]
    fn package_displays_file_name() {
        let item = QueuedItem::package("/games/setup/Installer.msi");
        assert_eq!(item.display_name, "Installer.msi");
        assert_eq!(item.kind.label(), "package");
    }

    #[test]
    fn reorder_keeps_items() {
        let mut queue = InstallQueue::new();
        for c in ["vcrun2019", "d3dx9", "dxvk"] {
            queue.push_component(c).unwrap();
        }

        assert!(queue.move_up(2));
        assert_eq!(names(&queue), ["vcrun2019", "dxvk", "d3dx9"]);
        assert!(!queue.move_up(0));
        assert!(queue.move_down(0));
        assert_eq!(names(&queue), ["dxvk", "vcrun2019", "d3dx9"]);
        assert!(!queue.move_down(2));

        let removed = queue.remove(1).unwrap();
        assert_eq!(removed.kind, ItemKind::Component("vcrun2019".into()));
        assert!(queue.remove(5).is_none());
        assert_eq!(queue.len(), 2);

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn missing_package_is_not_queued() {
        let mut queue = InstallQueue::new();
        let err = queue.push_package(Path::new("/nonexistent/setup.exe")).unwrap_err();
        assert!(matches!(err, ManagerError::MissingFile(_)));
        assert!(queue.is_empty());
    }

    #[test]
    fn programs_map_to_item_kinds() {
        let mut queue = InstallQueue::new();
        queue.push_program(&CustomProgram {
            name: "Game".into(),
            path: "/games/setup.exe".into(),
            kind: ProgramType::Package,
        });
        queue.push_program(&CustomProgram {
            name: "Fonts".into(),
            path: "corefonts".into(),
            kind: ProgramType::Component,
        });

        assert_eq!(
            queue.items()[0].kind,
            ItemKind::Package("/games/setup.exe".into())
        );
        assert_eq!(queue.items()[1].kind, ItemKind::Component("corefonts".into()));
    }

    #[test]
    fn events_update_rows() {
        let mut queue = InstallQueue::new();
        queue.push_component("xact").unwrap();
        queue.push_component("xinput").unwrap();

        queue.apply(&JobEvent::Started { index: 0, name: "xact".into() });
        assert_eq!(queue.items()[0].status, ItemStatus::Installing);
        queue.apply(&JobEvent::Completed { index: 0, name: "xact".into() });
        queue.apply(&JobEvent::Failed {
            index: 1,
            name: "xinput".into(),
            output: "checksum mismatch".into(),
        });
        queue.apply(&JobEvent::Finished(RunOutcome::Failed));

        assert_eq!(queue.items()[0].status.to_string(), "Done");
        assert_eq!(
            queue.items()[1].status,
            ItemStatus::Failed("checksum mismatch".into())
        );

        queue.reset_statuses();
        assert!(queue.items().iter().all(|i| i.status == ItemStatus::Pending));
    }
}
