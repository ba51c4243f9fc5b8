//! Where asset bytes come from.

use bytes::{Bytes, BytesMut};
use futures::future::{BoxFuture, FutureExt};
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::io::AsyncReadExt;

const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Bytes received so far for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(self.loaded as f64 / total as f64 * 100.0),
            None => None,
        }
    }
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Fetches a whole asset by its manifest path.
pub trait AssetSource: Send + Sync + 'static {
    fn fetch(&self, path: &str, progress: ProgressFn) -> BoxFuture<'static, Result<Bytes, SourceError>>;
}

/// Reads assets from a directory tree, reporting progress per chunk.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FsAssetSource {
    fn fetch(&self, path: &str, progress: ProgressFn) -> BoxFuture<'static, Result<Bytes, SourceError>> {
        let full = self.root.join(path);
        let display = full.display().to_string();

        async move {
            let io_err = |source: io::Error| {
                if source.kind() == io::ErrorKind::NotFound {
                    SourceError::NotFound(display.clone())
                } else {
                    SourceError::Io {
                        path: display.clone(),
                        source,
                    }
                }
            };

            let mut file = tokio::fs::File::open(&full).await.map_err(io_err)?;
            let total = file.metadata().await.ok().map(|m| m.len());

            let mut buf = BytesMut::with_capacity(total.unwrap_or(0) as usize);
            let mut chunk = vec![0u8; READ_CHUNK_BYTES];
            loop {
                let n = file.read(&mut chunk).await.map_err(io_err)?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                progress(Progress {
                    loaded: buf.len() as u64,
                    total,
                });
            }

            Ok(buf.freeze())
        }
        .boxed()
    }
}

/// In-memory assets keyed by path. Handy for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    files: HashMap<String, Bytes>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Bytes>) -> &mut Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, path: &str, progress: ProgressFn) -> BoxFuture<'static, Result<Bytes, SourceError>> {
        let found = self.files.get(path).cloned();
        let path = path.to_owned();

        async move {
            let bytes = found.ok_or(SourceError::NotFound(path))?;
            let total = bytes.len() as u64;
            progress(Progress {
                loaded: total,
                total: Some(total),
            });
            Ok(bytes)
        }
        .boxed()
    }
}
