//! Binary snapshot format and the scoped file handle.
//!
//! Layout:
//!
//! ```text
//! b"CSH5" | u32 version (LE) | u64 payload length (LE) | bincode(root group)
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ContainerError, Result};
use crate::group::Group;

pub const MAGIC: &[u8; 4] = b"CSH5";
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 8;

/// The root of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Group,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_root(root: Group) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    pub fn into_root(self) -> Group {
        self.root
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&self.root).map_err(ContainerError::Encode)?;

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 || &bytes[0..4] != MAGIC {
            return Err(ContainerError::BadMagic);
        }
        if bytes.len() < HEADER_LEN {
            return Err(ContainerError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[8..16]);
        let payload_len = u64::from_le_bytes(len) as usize;
        let expected = HEADER_LEN.saturating_add(payload_len);
        if bytes.len() < expected {
            return Err(ContainerError::Truncated {
                expected,
                found: bytes.len(),
            });
        }

        let root: Group =
            bincode::deserialize(&bytes[HEADER_LEN..expected]).map_err(ContainerError::Decode)?;
        Ok(Self { root })
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// Exclusive write handle for one container file.
///
/// The handle reserves `<path>.tmp` when created. `commit` writes the document
/// there and renames it over `path`; dropping an uncommitted handle removes the
/// temp file so a failed export never leaves a partial container behind.
#[derive(Debug)]
pub struct ContainerFile {
    path: PathBuf,
    tmp: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl ContainerFile {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = temp_path(path);
        let file = File::create(&tmp)?;
        tracing::debug!(path = %path.display(), "opened container for writing");
        Ok(Self {
            path: path.to_path_buf(),
            tmp,
            file: Some(file),
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush `document` and atomically move it into place.
    pub fn commit(mut self, document: &Document) -> Result<PathBuf> {
        let bytes = document.to_bytes()?;
        let mut file = match self.file.take() {
            Some(file) => file,
            None => File::create(&self.tmp)?,
        };
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.tmp, &self.path)?;
        self.committed = true;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "committed container");
        Ok(self.path.clone())
    }
}

impl Drop for ContainerFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        match fs::remove_file(&self.tmp) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "discarded uncommitted container"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.tmp.display(), error = %err, "failed to remove temp container")
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
