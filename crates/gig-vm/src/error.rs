use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read params file {}: {source}", path.display())]
    ReadParams {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse params file {}: {source}", path.display())]
    ParseParams {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Reconcile(#[from] g8_vm::Error),
}

impl CliError {
    pub fn left_changes(&self) -> bool {
        match self {
            Self::Reconcile(e) => e.left_changes(),
            _ => false,
        }
    }

    pub fn vm_id(&self) -> Option<u64> {
        match self {
            Self::Reconcile(e) => e.vm_id(),
            _ => None,
        }
    }
}
