use thiserror::Error;

/// Validation failures of graph mutations. The display text is what callers show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("ID is empty.")]
    EmptyId,
    #[error("Current node ID is required.")]
    MissingCurrentId,
    #[error("Note \"{0}\" already exists.")]
    DuplicateNote(String),
    #[error("Note \"{0}\" not found.")]
    NoteNotFound(String),
    #[error("Cannot rename to \"{0}\": ID already exists.")]
    RenameCollision(String),
    #[error("Source and target IDs are required.")]
    MissingEndpoints,
    #[error("Cannot link a note to itself.")]
    SelfLink,
    #[error("Source note \"{0}\" not found.")]
    SourceNotFound(String),
    #[error("Target note \"{0}\" not found.")]
    TargetNotFound(String),
    #[error("Link already exists.")]
    DuplicateLink,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("graph record could not be encoded or decoded: {0}")]
    Json(#[from] serde_json::Error),
}
