use thiserror::Error;

/// SILTA Control Plane Errors
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Kubernetes error: {0}")]
    KubernetesError(#[from] kube::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
