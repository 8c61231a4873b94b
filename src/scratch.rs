#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::constants::{RESPONSE_ARTIFACT, TASK_ARTIFACT};

/// How concurrent grading calls share the scratch directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScratchMode {
    /// One `task.txt`/`resp.json` slot at the scratch root; grading calls
    /// take turns holding it.
    #[default]
    Serialized,
    /// Every grading call writes into its own `<scratch>/<uuid>/` directory.
    /// Call directories are kept until the next [`ScratchSpace::reset`], so
    /// the scratch root grows by one directory per call.
    PerCall,
}

impl FromStr for ScratchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialized" | "shared" => Ok(Self::Serialized),
            "per-call" | "per_call" | "percall" => Ok(Self::PerCall),
            other => Err(format!("unknown scratch mode `{other}`")),
        }
    }
}

/// Errors while preparing or writing scratch artifacts.
#[derive(thiserror::Error, Debug)]
pub enum ScratchError {
    /// The scratch directory could not be removed or created.
    #[error("Could not prepare scratch directory `{}`", .path.display())]
    Prepare {
        /// Directory being prepared
        path:   PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// An artifact could not be written.
    #[error("Could not write scratch artifact `{}`", .path.display())]
    Write {
        /// Artifact path
        path:   PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Owner of the scratch directory that grading calls write their prompt and
/// raw model reply into.
#[derive(Debug)]
pub struct ScratchSpace {
    /// Scratch root
    root: PathBuf,
    /// Sharing strategy
    mode: ScratchMode,
    /// Guards the single slot in [`ScratchMode::Serialized`]
    slot: Mutex<()>,
}

impl ScratchSpace {
    /// Creates a handle on `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>, mode: ScratchMode) -> Self {
        Self {
            root: root.into(),
            mode,
            slot: Mutex::new(()),
        }
    }

    /// Deletes `root` if it exists and recreates it empty. Meant to run once
    /// at process start.
    pub fn reset(root: impl Into<PathBuf>, mode: ScratchMode) -> Result<Self, ScratchError> {
        let root = root.into();
        if root.exists() {
            std::fs::remove_dir_all(&root).map_err(|e| ScratchError::Prepare {
                path:   root.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&root).map_err(|e| ScratchError::Prepare {
            path:   root.clone(),
            source: e,
        })?;
        tracing::debug!("Scratch directory reset: {}", root.display());

        Ok(Self::new(root, mode))
    }

    /// Returns the scratch root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the sharing strategy.
    pub fn mode(&self) -> ScratchMode {
        self.mode
    }

    /// Reserves artifact storage for one grading call.
    ///
    /// In [`ScratchMode::Serialized`] this waits until no other lease is
    /// alive; the lease must be held for the whole call.
    pub async fn lease(&self) -> Result<ScratchLease<'_>, ScratchError> {
        let (dir, guard) = match self.mode {
            ScratchMode::Serialized => (self.root.clone(), Some(self.slot.lock().await)),
            ScratchMode::PerCall => (self.root.join(Uuid::new_v4().to_string()), None),
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ScratchError::Prepare {
                path:   dir.clone(),
                source: e,
            })?;

        Ok(ScratchLease {
            dir,
            _guard: guard,
        })
    }
}

/// Artifact storage reserved for a single grading call.
#[derive(Debug)]
pub struct ScratchLease<'a> {
    /// Directory the artifacts go to
    dir:    PathBuf,
    /// Held for the lease lifetime in serialized mode
    _guard: Option<MutexGuard<'a, ()>>,
}

impl ScratchLease<'_> {
    /// Directory holding this call's artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the prompt artifact.
    pub fn task_path(&self) -> PathBuf {
        self.dir.join(TASK_ARTIFACT)
    }

    /// Path of the raw reply artifact.
    pub fn response_path(&self) -> PathBuf {
        self.dir.join(RESPONSE_ARTIFACT)
    }

    /// Writes the rendered prompt, replacing any previous one. A reply left
    /// by an earlier call is removed first, so the slot never pairs a new
    /// prompt with an old reply.
    pub async fn write_task(&self, prompt: &str) -> Result<PathBuf, ScratchError> {
        let stale = self.response_path();
        match tokio::fs::remove_file(&stale).await {
            Ok(()) => tracing::debug!("Removed previous reply {}", stale.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ScratchError::Write {
                    path:   stale,
                    source: e,
                });
            }
        }
        write_artifact(self.task_path(), prompt).await
    }

    /// Writes the raw model reply exactly as received, replacing any previous
    /// one.
    pub async fn write_response(&self, reply: &str) -> Result<PathBuf, ScratchError> {
        write_artifact(self.response_path(), reply).await
    }
}

/// Overwrites `path` with `contents`.
async fn write_artifact(path: PathBuf, contents: &str) -> Result<PathBuf, ScratchError> {
    match tokio::fs::write(&path, contents).await {
        Ok(()) => Ok(path),
        Err(e) => Err(ScratchError::Write { path, source: e }),
    }
}
