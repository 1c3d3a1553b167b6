use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Opaque identifier of a stored blob.
///
/// Ids are random (UUIDv4), generated once per successful write and never
/// reused. Two writes of identical bytes produce two distinct blobs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(Uuid);

impl BlobId {
    /// Generate a fresh blob id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a blob reference, e.g. one embedded in a previously issued URL.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StorageError::InvalidId(format!("{s:?}: {e}")))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// First 2 hex characters (shard directory for the filesystem layout).
    pub fn shard_prefix(&self) -> String {
        self.0.simple().to_string()[..2].to_string()
    }

    /// Remaining 30 hex characters (filename within the shard).
    pub fn shard_suffix(&self) -> String {
        self.0.simple().to_string()[2..].to_string()
    }
}

impl From<Uuid> for BlobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.0)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for BlobId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BlobId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
