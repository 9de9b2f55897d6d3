//! Configuration emission
//!
//! Writes referenced TLS secrets and the rendered artifact to disk, then
//! signals the data plane to reload. Secret files are keyed by secret
//! name, so rewriting the same secret is idempotent.

use crate::dataplane::artifact::DataPlaneConfig;
use crate::events::NsName;
use k8s_openapi::api::core::v1::Secret;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Signals the external proxy process to pick up a new artifact.
pub trait ReloadHandle: Send + Sync {
    fn reload(&self) -> impl std::future::Future<Output = io::Result<()>> + Send;
}

/// Runs a configured shell command after each artifact write. Without a
/// command the reload is a no-op, which suits a data plane that watches
/// the artifact file itself.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    command: Option<String>,
}

impl CommandReloader {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

impl ReloadHandle for CommandReloader {
    async fn reload(&self) -> io::Result<()> {
        let Some(command) = &self.command else {
            debug!("No reload command configured, skipping reload signal");
            return Ok(());
        };

        let status = Command::new("sh").arg("-c").arg(command).status().await?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "reload command exited with {status}"
            )));
        }
        Ok(())
    }
}

/// Writes secrets and the artifact, then triggers a reload.
pub struct ConfigEmitter<R> {
    secrets_dir: PathBuf,
    config_path: PathBuf,
    reload: R,
}

impl<R: ReloadHandle> ConfigEmitter<R> {
    pub fn new(secrets_dir: PathBuf, config_path: PathBuf, reload: R) -> Self {
        Self {
            secrets_dir,
            config_path,
            reload,
        }
    }

    /// Emit one reconciliation's output. Per-secret failures are logged
    /// and skipped; artifact or reload failures abort the emit.
    pub async fn emit(
        &self,
        config: &DataPlaneConfig,
        secrets: &[(NsName, Arc<Secret>)],
    ) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.secrets_dir).await?;

        for (nsname, secret) in secrets {
            let Some(bytes) = tls_secret_bytes(secret) else {
                warn!("Secret {} is missing tls.crt or tls.key, skipping", nsname);
                continue;
            };

            let path = self.secrets_dir.join(&nsname.name);
            if let Err(err) = tokio::fs::write(&path, bytes).await {
                warn!("Failed to write secret {} to {}: {}", nsname, path.display(), err);
            }
        }

        let artifact = serde_json::to_vec_pretty(config).map_err(io::Error::other)?;
        tokio::fs::write(&self.config_path, artifact).await?;

        self.reload.reload().await?;

        info!(
            "Configuration artifact written to {}",
            self.config_path.display()
        );
        Ok(())
    }
}

/// Certificate and key bytes concatenated, PEM after PEM.
fn tls_secret_bytes(secret: &Secret) -> Option<Vec<u8>> {
    let data = secret.data.as_ref()?;
    let cert = data.get("tls.crt")?;
    let key = data.get("tls.key")?;

    let mut bytes = cert.0.clone();
    if !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }
    bytes.extend_from_slice(&key.0);
    Some(bytes)
}
