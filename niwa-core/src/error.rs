use std::fmt;

/// Errors surfaced by the store, tree, and conflict engine.
///
/// Kept as a hand-rolled enum rather than `thiserror`, matching the style
/// of the teacher crate this one grew out of.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    NodeNotFound(String),
    ParentNotFound(String),
    VersionNotFound { node_id: String, version: u64 },

    DuplicateTitle { parent: String, title: String },
    InvalidTitle(String),
    DepthExceeded { max_depth: u32 },
    OrphanedHeading(String),

    /// `edit` was attempted without a prior `read`.
    UnreadEdit { node_id: String, agent: String },

    /// A write was quarantined because the author's observed version was stale.
    ConflictDetected {
        node_id: String,
        conflict_id: String,
        losing_content: String,
        winning_version: u64,
        winning_content: String,
    },

    NoPendingConflict(String),
    MergeContentRequired(String),

    StoreBusy(String),
    CorruptState(String),
    Io(String),
    Internal(String),
    Parse(String),
}

pub type CResult<T> = Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NodeNotFound(id) => write!(f, "node not found: {}", id),
            Error::ParentNotFound(id) => write!(f, "parent not found: {}", id),
            Error::VersionNotFound { node_id, version } => {
                write!(f, "version {} not found for node {}", version, node_id)
            }
            Error::DuplicateTitle { parent, title } => {
                write!(f, "title {:?} already exists under parent {}", title, parent)
            }
            Error::InvalidTitle(reason) => write!(f, "invalid title: {}", reason),
            Error::DepthExceeded { max_depth } => {
                write!(f, "depth exceeds maximum of {}", max_depth)
            }
            Error::OrphanedHeading(title) => {
                write!(f, "heading {:?} has no ancestor to attach to", title)
            }
            Error::UnreadEdit { node_id, agent } => {
                write!(f, "agent {} must read {} before editing it", agent, node_id)
            }
            Error::ConflictDetected { node_id, conflict_id, winning_version, .. } => {
                write!(
                    f,
                    "conflict {} on node {}: a newer version ({}) was committed since your read",
                    conflict_id, node_id, winning_version
                )
            }
            Error::NoPendingConflict(node_id) => {
                write!(f, "no pending conflict on node {}", node_id)
            }
            Error::MergeContentRequired(node_id) => {
                write!(f, "merge resolution on node {} requires merged content", node_id)
            }
            Error::StoreBusy(reason) => write!(f, "store busy: {}", reason),
            Error::CorruptState(reason) => write!(f, "corrupt state: {}", reason),
            Error::Io(reason) => write!(f, "io error: {}", reason),
            Error::Internal(reason) => write!(f, "internal error: {}", reason),
            Error::Parse(reason) => write!(f, "parse error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

/// The error kind, used for exit-code mapping at the CLI boundary (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    UserError,
    Conflict,
    InvariantViolation,
    InternalError,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NodeNotFound(_)
            | Error::ParentNotFound(_)
            | Error::VersionNotFound { .. }
            | Error::DuplicateTitle { .. }
            | Error::InvalidTitle(_)
            | Error::DepthExceeded { .. }
            | Error::OrphanedHeading(_)
            | Error::UnreadEdit { .. }
            | Error::NoPendingConflict(_)
            | Error::MergeContentRequired(_) => ErrorClass::UserError,

            Error::ConflictDetected { .. } => ErrorClass::Conflict,

            Error::CorruptState(_) => ErrorClass::InvariantViolation,

            Error::StoreBusy(_) | Error::Io(_) | Error::Internal(_) | Error::Parse(_) => {
                ErrorClass::InternalError
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::UserError => 1,
            ErrorClass::Conflict => 2,
            ErrorClass::InvariantViolation => 3,
            ErrorClass::InternalError => 4,
        }
    }
}
