use std::io;
use std::path::{Path, PathBuf};

use common::Language;
use tempfile::TempDir;
use tokio::process::Command;

/// A private scratch directory for one execution.
///
/// Every workspace is freshly created with a unique name and is removed
/// recursively when dropped, whichever way the pipeline exits.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create(language: Language) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("learncode-{}-", language.as_str()))
            .tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub async fn write_file(&self, name: &str, contents: &str) -> io::Result<()> {
        tokio::fs::write(self.file(name), contents).await
    }

    /// Command running inside the workspace with a minimal environment.
    pub fn command(&self, program: impl AsRef<std::ffi::OsStr>) -> Command {
        let mut command = Command::new(program);
        command
            .current_dir(self.path())
            .env_clear()
            .env("HOME", self.path())
            .env("LANG", "C.UTF-8");
        if let Some(path) = std::env::var_os("PATH") {
            command.env("PATH", path);
        }
        command
    }

    /// Strip the workspace location from text that may be shown to users.
    pub fn scrub(&self, text: &str) -> String {
        let root = self.path().to_string_lossy();
        text.replace(&format!("{root}/"), "").replace(&*root, ".")
    }
}
