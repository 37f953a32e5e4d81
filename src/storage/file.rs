use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::BytesMut;
use futures::stream::{self, TryStreamExt};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::content::Content;
use crate::error::{Error, Result};
use crate::key::Key;
use crate::storage::{Metadata, Storage};

/// Size of the chunks read when streaming a value from disk.
const READ_CHUNK: usize = 64 * 1024;

/// A [`Storage`] that keeps values as files under a root directory.
///
/// Each key maps 1:1 to the relative path formed by its segments. The
/// resolved path of every key must stay inside the root directory
/// (**sandboxing**): keys whose `..` segments would escape the root fail
/// with [`Error::OutOfSandbox`] before any filesystem mutation, since keys
/// may originate from untrusted input in layers above this one.
///
/// Saves stream into a staging sibling file (`<name>.<uuid>.tmp`) and rename
/// it into place, which is atomic for same-volume renames on POSIX
/// filesystems. Deletes prune now-empty parent directories up to, but never
/// including, the root.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`.
    ///
    /// The directory itself is created lazily on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    /// Resolve `key` to its path, enforcing the sandbox.
    fn path(&self, key: &Key) -> Result<PathBuf> {
        let mut path = self.dir.clone();
        for segment in key.segments() {
            path.push(segment);
        }
        if normalize(&path).starts_with(normalize(&self.dir)) {
            Ok(path)
        } else {
            Err(Error::OutOfSandbox(key.clone()))
        }
    }

    /// Remove now-empty directories from `start` up to, but not including,
    /// the storage root. Best-effort: any failure stops the walk without
    /// failing the surrounding operation.
    async fn prune_empty(&self, start: Option<&Path>) {
        let root = normalize(&self.dir);
        let mut current = match start {
            Some(dir) => dir.to_path_buf(),
            None => return,
        };
        loop {
            let normalized = normalize(&current);
            if normalized == root || !normalized.starts_with(&root) {
                break;
            }
            let empty = match fs::read_dir(&current).await {
                Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
                Err(_) => break,
            };
            if !empty || fs::remove_dir(&current).await.is_err() {
                break;
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn exists(&self, key: &Key) -> Result<bool> {
        let path = self.path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &Key, content: Content) -> Result<()> {
        if key.is_root() {
            return Err(Error::InvalidKey(String::from("unable to save to root")));
        }
        let path = self.path(key)?;
        let name = path
            .file_name()
            .ok_or_else(|| Error::InvalidKey(format!("key `{key}` names no file")))?
            .to_string_lossy()
            .into_owned();
        let staging = path.with_file_name(format!("{name}.{}.tmp", Uuid::new_v4()));
        let mut chunks = content.stream()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let written: Result<()> = async {
            let mut file = fs::File::create(&staging).await?;
            while let Some(chunk) = chunks.try_next().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        let moved = match written {
            Ok(()) => fs::rename(&staging, &path).await.map_err(Error::from),
            Err(err) => Err(err),
        };
        if let Err(err) = moved {
            // Leave no trace of the failed save, including directories
            // created for it.
            let _ = fs::remove_file(&staging).await;
            self.prune_empty(path.parent()).await;
            return Err(err);
        }
        Ok(())
    }

    async fn value(&self, key: &Key) -> Result<Content> {
        if key.is_root() {
            return Err(Error::InvalidKey(String::from("unable to load from root")));
        }
        let path = self.path(key)?;
        let size = self.metadata(key).await?.size();
        let file = fs::File::open(&path).await?;
        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buffer = BytesMut::with_capacity(READ_CHUNK);
            let read = file.read_buf(&mut buffer).await?;
            if read == 0 {
                Ok(None)
            } else {
                Ok(Some((buffer.freeze(), file)))
            }
        });
        Ok(Content::new(chunks, Some(size)))
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<Key>> {
        let path = self.path(prefix)?;
        let root = self.dir.clone();
        let keys = task::spawn_blocking(move || -> Result<Vec<Key>> {
            if !path.exists() {
                return Ok(Vec::new());
            }
            let mut keys = Vec::new();
            for entry in WalkDir::new(&path) {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(&root).map_err(|err| {
                    io::Error::new(io::ErrorKind::InvalidData, err.to_string())
                })?;
                let mut segments = Vec::new();
                for component in relative.components() {
                    match component {
                        Component::Normal(name) => {
                            let name = name.to_str().ok_or_else(|| {
                                io::Error::new(
                                    io::ErrorKind::InvalidData,
                                    "non-UTF-8 file name in storage",
                                )
                            })?;
                            segments.push(name.to_owned());
                        }
                        _ => continue,
                    }
                }
                keys.push(Key::from_parts(segments));
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))??;
        tracing::debug!(
            prefix = %prefix,
            count = keys.len(),
            dir = %self.dir.display(),
            "listed keys",
        );
        Ok(keys)
    }

    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()> {
        let src = self.path(source)?;
        let dst = self.path(destination)?;
        match fs::metadata(&src).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(Error::NotFound(source.clone())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(source.clone()))
            }
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&src, &dst).await?;
        self.prune_empty(src.parent()).await;
        Ok(())
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        let path = self.path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(Error::NotFound(key.clone())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(key.clone()))
            }
            Err(err) => return Err(err.into()),
        }
        fs::remove_file(&path).await?;
        self.prune_empty(path.parent()).await;
        Ok(())
    }

    async fn metadata(&self, key: &Key) -> Result<Metadata> {
        let path = self.path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                let mut result = Metadata::new(meta.len());
                if let Ok(modified) = meta.modified() {
                    result = result.with_modified(modified);
                }
                Ok(result)
            }
            Ok(_) => Err(Error::NotFound(key.clone())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::NotFound(key.clone())),
            Err(err) => Err(err.into()),
        }
    }

    fn identifier(&self) -> String {
        format!("file: {}", self.dir.display())
    }
}

/// Lexically normalize a path, folding `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(Component::ParentDir),
            },
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_relative_components() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), Path::new("/a/c/d"));
        assert_eq!(normalize(Path::new("a/../../b")), Path::new("../b"));
        assert_eq!(normalize(Path::new("/..")), Path::new("/"));
    }
}
