//! Writing a downloaded release asset over an executable

use async_trait::async_trait;
use futures::StreamExt;
use selfupdate_utils::{ByteStream, HttpError};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_MODE: u32 = 0o755;

const STAGING_PREFIX: &str = ".selfupdate-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// File to replace; the running executable when unset
    pub target_path: Option<PathBuf>,
    /// Unix permission bits for the new file, `0o755` when unset
    pub target_mode: Option<u32>,
}

impl ApplyOptions {
    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn with_target_mode(mut self, mode: u32) -> Self {
        self.target_mode = Some(mode);
        self
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("failed to locate the running executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read update payload: {0}")]
    Stream(#[source] HttpError),
    #[error("update payload is empty")]
    EmptyPayload,
    #[error("failed to replace {}: {source}", path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A payload written to disk and ready to be swapped in.
#[async_trait]
pub trait Staged: Send {
    /// Swaps the staged payload in. Runs to completion once started.
    async fn commit(self: Box<Self>) -> Result<(), ApplyError>;
}

/// Consumes the downloaded asset and installs it in two steps.
///
/// [`Apply::stage`] may be abandoned at any await point and must leave the
/// target untouched when it is. [`Staged::commit`] is the only step that
/// modifies the target.
#[async_trait]
pub trait Apply: Send + Sync {
    async fn stage(
        &self,
        stream: ByteStream,
        options: &ApplyOptions,
    ) -> Result<Box<dyn Staged>, ApplyError>;

    async fn apply(&self, stream: ByteStream, options: &ApplyOptions) -> Result<(), ApplyError> {
        self.stage(stream, options).await?.commit().await
    }
}

/// Stages the payload next to the target, then swaps it in with a rename.
///
/// Nothing is replaced unless the whole stream was written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceExecutable;

#[async_trait]
impl Apply for ReplaceExecutable {
    async fn stage(
        &self,
        stream: ByteStream,
        options: &ApplyOptions,
    ) -> Result<Box<dyn Staged>, ApplyError> {
        let target = match &options.target_path {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(ApplyError::CurrentExe)?,
        };
        let dir = staging_dir(&target);

        let file = stage(stream, &dir).await?;
        set_mode(file.path(), options.target_mode.unwrap_or(DEFAULT_MODE)).await?;

        Ok(Box::new(StagedExecutable {
            file,
            target,
            replace_self: options.target_path.is_none(),
        }))
    }
}

struct StagedExecutable {
    file: NamedTempFile,
    target: PathBuf,
    replace_self: bool,
}

#[async_trait]
impl Staged for StagedExecutable {
    async fn commit(self: Box<Self>) -> Result<(), ApplyError> {
        let StagedExecutable {
            file,
            target,
            replace_self,
        } = *self;

        if !replace_self {
            return file
                .persist(&target)
                .map(|_| ())
                .map_err(|err| ApplyError::Replace {
                    path: target,
                    source: err.error,
                });
        }

        let path = target.clone();
        tokio::task::spawn_blocking(move || {
            let result = self_replace::self_replace(file.path());
            drop(file);
            result
        })
        .await
        .map_err(|err| ApplyError::Replace {
            path: path.clone(),
            source: io::Error::other(err),
        })?
        .map_err(|source| ApplyError::Replace { path, source })
    }
}

fn staging_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn stage(mut stream: ByteStream, dir: &Path) -> Result<NamedTempFile, ApplyError> {
    let staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map_err(|err| ApplyError::io("failed to create staging file in", dir, err))?;
    let handle = staged
        .reopen()
        .map_err(|err| ApplyError::io("failed to open", staged.path(), err))?;
    let mut file = tokio::fs::File::from_std(handle);

    let mut written = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApplyError::Stream)?;
        file.write_all(&chunk)
            .await
            .map_err(|err| ApplyError::io("failed to write", staged.path(), err))?;
        written += chunk.len();
    }
    if written == 0 {
        return Err(ApplyError::EmptyPayload);
    }

    file.flush()
        .await
        .map_err(|err| ApplyError::io("failed to flush", staged.path(), err))?;
    file.sync_all()
        .await
        .map_err(|err| ApplyError::io("failed to sync", staged.path(), err))?;
    Ok(staged)
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), ApplyError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|err| ApplyError::io("failed to set permissions on", path, err))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), ApplyError> {
    Ok(())
}
