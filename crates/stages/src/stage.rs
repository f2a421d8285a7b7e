//! Stage identifiers and stage-level errors.

use std::fmt;
use std::str::FromStr;

use allowlist_merkle::{Address, DumpError, LeafError, TreeError};
use thiserror::Error;

/// Errors from stage storage, builds and lookups.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Invalid stage id {0:?}: use 1-64 characters from [A-Za-z0-9_-]")]
    InvalidStageId(String),
    #[error("Unknown stage: {0}")]
    UnknownStage(StageId),
    #[error("Stage {0} is listed more than once in one batch")]
    DuplicateStage(StageId),
    #[error("{address} is not eligible for stage {stage}")]
    NotEligible { stage: StageId, address: Address },
    #[error("Stage {stage} tree is not keyed by address (leaf encoding {encoding})")]
    NotAddressKeyed { stage: StageId, encoding: String },
    #[error("Stage {stage} document is malformed: {source}")]
    Malformed {
        stage: StageId,
        #[source]
        source: DumpError,
    },
    #[error("Failed to build stage {stage}: {source}")]
    Build {
        stage: StageId,
        #[source]
        source: TreeError,
    },
    #[error("Proof generation failed in stage {stage}: {source}")]
    Proof {
        stage: StageId,
        #[source]
        source: TreeError,
    },
    #[error("Line {line}: {source}")]
    AddressList {
        line: usize,
        #[source]
        source: LeafError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const MAX_STAGE_ID_LEN: usize = 64;

/// Name of an allow-list snapshot, e.g. `guaranteed` or `whitelist`.
///
/// Restricted to `[A-Za-z0-9_-]` so it is always a safe file stem.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Result<Self, StageError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_STAGE_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(id))
        } else {
            Err(StageError::InvalidStageId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StageId {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for StageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
