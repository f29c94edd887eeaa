use thiserror::Error;

use crate::launcher::LaunchError;
use crate::node::TreeError;
use crate::store::StoreError;
use crate::surface::EditorError;

/// 控制器層的錯誤分類。 / Error taxonomy of the controllers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed internal request; indicates a caller defect.
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("notebook has version {found}; this build can read up to version {readable}")]
    Version { found: u32, readable: u32 },
    #[error("notebook storage failed")]
    Store(#[source] StoreError),
    #[error("editor failed: {0}")]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Version { found, readable } => CoreError::Version { found, readable },
            other => CoreError::Store(other),
        }
    }
}

impl From<TreeError> for CoreError {
    fn from(err: TreeError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Convenience alias for controller results.
pub type Result<T> = std::result::Result<T, CoreError>;
