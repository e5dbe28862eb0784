//
// error.rs
//
// Errors surfaced by the workspace core
//

use thiserror::Error;
use tower_lsp::lsp_types::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("URI cannot be mapped to a filesystem path: {0}")]
    InvalidUri(Url),

    #[error("Document is not open: {0}")]
    UnknownDocument(Url),

    #[error("Edit position {line}:{character} is outside the content of {uri}")]
    OutOfRangeEdit {
        uri: Url,
        line: u32,
        character: u32,
    },

    #[error("Stale version {received} for {uri} (current version is {current})")]
    StaleVersion {
        uri: Url,
        current: i32,
        received: i32,
    },
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
