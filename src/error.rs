use thiserror::Error;

/// Top-level error type for the polyweld editing kernel.
///
/// Every variant signals a broken caller contract (a stale index, a corrupted
/// partition). Recoverable "nothing happened" conditions are not errors; they
/// are reported through [`Outcome::Declined`].
#[derive(Debug, Error)]
pub enum PolyweldError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Errors related to the integrity of the mesh entity.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("{kind} index {index} is out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("shared group partition is broken: {0}")]
    BrokenPartition(String),

    #[error("malformed face {face}: {reason}")]
    MalformedFace { face: usize, reason: String },

    #[error("attribute array length mismatch: {0}")]
    AttributeMismatch(String),
}

/// Errors raised while executing a geometry operation.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Errors related to UV projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("UV channel {0} is not editable")]
    InvalidChannel(usize),

    #[error("projection failed: {0}")]
    Failed(String),
}

/// Errors related to render buffer compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("vertex ceiling must be at least 3, got {0}")]
    InvalidVertexCeiling(usize),

    #[error("compilation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`PolyweldError`].
pub type Result<T> = std::result::Result<T, PolyweldError>;

/// Reason an operation declined to modify the mesh.
///
/// Declines are expected, user-facing conditions: the mesh is left untouched
/// and the message is suitable for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Declined {
    #[error("nothing selected")]
    EmptySelection,

    #[error("nothing to do")]
    NothingToDo,

    #[error("no loop found")]
    NoLoop,

    #[error("edge already has two connected faces")]
    EdgeNotFree,

    #[error("edge is not on the outer perimeter")]
    NotOnPerimeter,

    #[error("edges must be distinct")]
    SameEdge,

    #[error("no valid split path found")]
    NoSplitPath,

    #[error("cannot detach every face to a submesh")]
    NothingToDetach,

    #[error("at least two meshes are required")]
    NotEnoughMeshes,
}

/// Result of a mutating operation or a query that may legitimately find
/// nothing.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation ran and produced `T`.
    Applied(T),
    /// The operation declined; the mesh is unchanged.
    Declined(Declined),
}

impl<T> Outcome<T> {
    /// Returns `true` if the operation was applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Returns the applied value, discarding the decline reason.
    #[must_use]
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Declined(_) => None,
        }
    }

    /// Returns the decline reason, if any.
    #[must_use]
    pub fn declined(&self) -> Option<&Declined> {
        match self {
            Self::Applied(_) => None,
            Self::Declined(reason) => Some(reason),
        }
    }

    /// Maps the applied value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Applied(value) => Outcome::Applied(f(value)),
            Self::Declined(reason) => Outcome::Declined(reason),
        }
    }
}

impl<T> From<Declined> for Outcome<T> {
    fn from(reason: Declined) -> Self {
        Self::Declined(reason)
    }
}
