use std::{
    collections::HashSet,
    fmt, io,
    path::{Component, Path, PathBuf},
};

use fs_err as fs;
use log::{debug, info};
use thiserror::Error;

/// A downloaded file waiting to be written, addressed relative to the
/// writer's root directory.
#[derive(Debug, Clone)]
pub struct AvatarAsset {
    pub relative_path: PathBuf,
    pub contents: Vec<u8>,
}

impl AvatarAsset {
    pub fn new(relative_path: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            relative_path: relative_path.into(),
            contents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace files whose contents changed.
    Overwrite,

    /// Leave changed files alone and write next to them with a numbered
    /// suffix, e.g. `avatar_2.png`.
    KeepHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created(PathBuf),
    Replaced(PathBuf),
    Unchanged(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Created(path)
            | WriteOutcome::Replaced(path)
            | WriteOutcome::Unchanged(path) => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{} was already written during this run", .0.display())]
    AlreadyWritten(PathBuf),

    #[error("{} would be written outside the output directory", .0.display())]
    OutsideRoot(PathBuf),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub created: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

impl fmt::Display for WriteSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "{} new, {} replaced, {} unchanged",
            self.created, self.replaced, self.unchanged
        )
    }
}

#[derive(Debug)]
pub struct AssetWriter {
    root: PathBuf,
    mode: WriteMode,
    seen: HashSet<PathBuf>,
    outcomes: Vec<WriteOutcome>,
    planned: usize,
}

impl AssetWriter {
    pub fn new(root: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            root: root.into(),
            mode,
            seen: HashSet::new(),
            outcomes: Vec::new(),
            planned: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Announces `count` more assets that are about to be written, so log
    /// lines can show how far along the run is.
    pub fn plan(&mut self, count: usize) {
        self.planned += count;
    }

    /// Assets written so far and assets announced through [`AssetWriter::plan`].
    pub fn progress(&self) -> (usize, usize) {
        (self.outcomes.len(), self.planned.max(self.outcomes.len()))
    }

    pub fn outcomes(&self) -> &[WriteOutcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> WriteSummary {
        let mut summary = WriteSummary::default();
        for outcome in self.outcomes() {
            match outcome {
                WriteOutcome::Created(_) => summary.created += 1,
                WriteOutcome::Replaced(_) => summary.replaced += 1,
                WriteOutcome::Unchanged(_) => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Writes an asset below the root, creating directories as needed.
    pub fn write(&mut self, asset: AvatarAsset) -> Result<WriteOutcome, WriteError> {
        if !stays_below_root(&asset.relative_path) {
            return Err(WriteError::OutsideRoot(asset.relative_path));
        }

        if !self.seen.insert(asset.relative_path.clone()) {
            return Err(WriteError::AlreadyWritten(asset.relative_path));
        }

        let path = self.root.join(&asset.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let outcome = match self.mode {
            WriteMode::Overwrite => overwrite(path, &asset.contents)?,
            WriteMode::KeepHistory => write_next_available(path, &asset.contents)?,
        };

        self.outcomes.push(outcome.clone());

        let (done, planned) = self.progress();
        match &outcome {
            WriteOutcome::Unchanged(path) => {
                debug!("[{}/{}] Skipped (identical): {}", done, planned, path.display())
            }
            outcome => info!("[{}/{}] Downloaded: {}", done, planned, outcome.path().display()),
        }

        Ok(outcome)
    }
}

/// Only plain names are allowed: no root, prefix, `.` or `..` components.
fn stays_below_root(relative_path: &Path) -> bool {
    let mut components = relative_path.components().peekable();
    components.peek().is_some()
        && components.all(|component| matches!(component, Component::Normal(_)))
}

fn overwrite(path: PathBuf, contents: &[u8]) -> io::Result<WriteOutcome> {
    if !path.exists() {
        replace_contents(&path, contents)?;
        return Ok(WriteOutcome::Created(path));
    }

    if has_contents(&path, contents)? {
        return Ok(WriteOutcome::Unchanged(path));
    }

    replace_contents(&path, contents)?;
    Ok(WriteOutcome::Replaced(path))
}

fn write_next_available(path: PathBuf, contents: &[u8]) -> io::Result<WriteOutcome> {
    let mut candidate = path.clone();
    let mut suffix = 2;

    loop {
        if !candidate.exists() {
            replace_contents(&candidate, contents)?;
            return Ok(WriteOutcome::Created(candidate));
        }

        if has_contents(&candidate, contents)? {
            return Ok(WriteOutcome::Unchanged(candidate));
        }

        candidate = suffixed(&path, suffix);
        suffix += 1;
    }
}

/// `dir/name.png` with suffix 3 becomes `dir/name_3.png`.
fn suffixed(path: &Path, suffix: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(extension) => format!("{}_{}.{}", stem, suffix, extension.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };

    path.with_file_name(file_name)
}

fn has_contents(path: &Path, contents: &[u8]) -> io::Result<bool> {
    if fs::metadata(path)?.len() != contents.len() as u64 {
        return Ok(false);
    }

    Ok(fs::read(path)? == contents)
}

/// Writes through a sibling temporary file so an interrupted run never leaves
/// a truncated image behind.
fn replace_contents(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".part");
    let temp_path = path.with_file_name(temp_name);

    let result = fs::write(&temp_path, contents).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() && temp_path.exists() {
        if let Err(err) = fs::remove_file(&temp_path) {
            log::warn!("{}", err);
        }
    }

    result
}

/// Maps everything outside `[A-Za-z0-9_-]` to `-` so the result can be used
/// as a single file or directory name.
pub fn file_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
