use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    NoHandle,
    FileDescriptor,
    PipeRead,
    PipeWrite,
}

impl HandleKind {
    pub fn is_fd_backed(self) -> bool {
        !matches!(self, Self::NoHandle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoHandle => "no_handle",
            Self::FileDescriptor => "file_descriptor",
            Self::PipeRead => "pipe_read",
            Self::PipeWrite => "pipe_write",
        }
    }
}

/// How a process reaches a resource. The three fd-backed variants share one
/// integer namespace per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fd", rename_all = "snake_case")]
pub enum Handle {
    NoHandle,
    FileDescriptor(i32),
    PipeRead(i32),
    PipeWrite(i32),
}

impl Handle {
    pub fn kind(self) -> HandleKind {
        match self {
            Self::NoHandle => HandleKind::NoHandle,
            Self::FileDescriptor(_) => HandleKind::FileDescriptor,
            Self::PipeRead(_) => HandleKind::PipeRead,
            Self::PipeWrite(_) => HandleKind::PipeWrite,
        }
    }

    pub fn fd(self) -> Option<i32> {
        match self {
            Self::NoHandle => None,
            Self::FileDescriptor(fd) | Self::PipeRead(fd) | Self::PipeWrite(fd) => Some(fd),
        }
    }

    pub fn with_kind(kind: HandleKind, fd: i32) -> Self {
        match kind {
            HandleKind::NoHandle => Self::NoHandle,
            HandleKind::FileDescriptor => Self::FileDescriptor(fd),
            HandleKind::PipeRead => Self::PipeRead(fd),
            HandleKind::PipeWrite => Self::PipeWrite(fd),
        }
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHandle => write!(f, "-"),
            Self::FileDescriptor(fd) => write!(f, "fd {fd}"),
            Self::PipeRead(fd) => write!(f, "pipe-r {fd}"),
            Self::PipeWrite(fd) => write!(f, "pipe-w {fd}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("handle space exhausted (limit {limit})")]
    SpaceExhausted { limit: i32 },
    #[error("negative descriptor {0}")]
    NegativeDescriptor(i32),
}

/// Per-process descriptor allocator. Fresh values are one past the highest
/// claimed descriptor, so snapshot descriptors are never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleAllocator {
    claimed: BTreeSet<i32>,
}

impl HandleAllocator {
    pub const LIMIT: i32 = i32::MAX;

    pub fn claim(&mut self, handle: Handle) -> Result<(), HandleError> {
        let Some(fd) = handle.fd() else {
            return Ok(());
        };
        if fd < 0 {
            return Err(HandleError::NegativeDescriptor(fd));
        }
        self.claimed.insert(fd);
        Ok(())
    }

    pub fn is_claimed(&self, handle: Handle) -> bool {
        handle
            .fd()
            .is_some_and(|fd| self.claimed.contains(&fd))
    }

    pub fn next(&self, kind: HandleKind) -> Result<Handle, HandleError> {
        if !kind.is_fd_backed() {
            return Ok(Handle::NoHandle);
        }
        let fd = match self.claimed.last() {
            None => 0,
            Some(&max) if max >= Self::LIMIT => {
                return Err(HandleError::SpaceExhausted { limit: Self::LIMIT })
            }
            Some(&max) => max + 1,
        };
        Ok(Handle::with_kind(kind, fd))
    }

    pub fn claimed(&self) -> impl Iterator<Item = i32> + '_ {
        self.claimed.iter().copied()
    }
}

#[cfg(test)]
#[path = "handle_test.rs"]
mod tests;
