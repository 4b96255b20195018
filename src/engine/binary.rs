//! Lookup of the merge helper the engine shells out to.
//!
//! Two strategies exist. A packaged app ships the helper inside its bundle at
//! `<bundle>/Contents/Resources/<name>`, one level above the directory that
//! holds the running executable. Everywhere else the helper comes from `PATH`.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Name of the merge helper looked up by default.
pub const DEFAULT_HELPER_NAME: &str = "ffmpeg";

/// Where to look for an external helper binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPathStrategy {
    /// Shipped next to the executable in a packaged bundle.
    Bundled,
    /// Installed on the system `PATH`.
    System,
}

impl BinaryPathStrategy {
    /// Picks [`BinaryPathStrategy::Bundled`] when the running executable has
    /// a bundled copy of `name`, otherwise [`BinaryPathStrategy::System`].
    #[must_use]
    pub fn detect(name: &str) -> Self {
        match current_exe_bundled(name) {
            Some(candidate) if candidate.is_file() => Self::Bundled,
            _ => Self::System,
        }
    }
}

/// Resolves the path of helper `name` using `strategy`.
///
/// Never fails: the system strategy falls back to the bare program name and
/// lets the engine report a launch error if it is missing.
#[must_use]
pub fn resolve_engine_binary_path(strategy: BinaryPathStrategy, name: &str) -> PathBuf {
    let resolved = match strategy {
        BinaryPathStrategy::Bundled => current_exe_bundled(name).unwrap_or_else(|| {
            warn!(name, "could not locate running executable; using system lookup");
            system_path(name)
        }),
        BinaryPathStrategy::System => system_path(name),
    };
    debug!(?strategy, name, path = %resolved.display(), "resolved engine helper");
    resolved
}

/// Returns the bundled location of `name` for an executable at `exe`.
#[must_use]
pub fn bundled_path_for(exe: &Path, name: &str) -> Option<PathBuf> {
    let contents = exe.parent()?.parent()?;
    Some(contents.join("Resources").join(name))
}

fn current_exe_bundled(name: &str) -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    bundled_path_for(&exe, name)
}

fn system_path(name: &str) -> PathBuf {
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}
