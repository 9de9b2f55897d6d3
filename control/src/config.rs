//! Configuration for the SILTA control plane
//!
//! Four options are recognized (flags or environment): the controller
//! name, the GatewayClass name to manage, the directory TLS secrets are
//! materialized into, and the path the configuration artifact is written
//! to. An optional reload command tells the data plane to pick up a new
//! artifact.

use crate::error::ControlError;
use clap::Parser;
use std::path::PathBuf;

/// Domain every controller name must live under.
pub const CONTROLLER_DOMAIN: &str = "silta.io";

/// Command-line surface of the control plane.
#[derive(Parser, Debug)]
#[command(name = "control", about = "SILTA Gateway API control plane", long_about = None)]
pub struct Cli {
    /// Controller name, form DOMAIN/NAMESPACE/NAME
    #[arg(long = "controller-name", env = "SILTA_CONTROLLER_NAME")]
    pub controller_name: String,

    /// Name of the GatewayClass resource to manage
    #[arg(long = "gateway-class-name", env = "SILTA_GATEWAY_CLASS_NAME")]
    pub gateway_class_name: String,

    /// Directory referenced TLS secrets are written into
    #[arg(long = "secrets-dir", env = "SILTA_SECRETS_DIR")]
    pub secrets_dir: PathBuf,

    /// Path the configuration artifact is written to
    #[arg(long = "config-artifact-path", env = "SILTA_CONFIG_ARTIFACT_PATH")]
    pub config_artifact_path: PathBuf,

    /// Command run after a new artifact is written (e.g. a reload hook);
    /// omitted means no reload signal is sent
    #[arg(long = "reload-command", env = "SILTA_RELOAD_COMMAND")]
    pub reload_command: Option<String>,

    /// Namespace this process runs in
    #[arg(long = "namespace", env = "POD_NAMESPACE")]
    pub pod_namespace: String,
}

impl Cli {
    /// Validate the raw arguments into a [`ControllerConfig`].
    pub fn into_config(self) -> Result<ControllerConfig, ControlError> {
        validate_controller_name(&self.controller_name, CONTROLLER_DOMAIN, &self.pod_namespace)?;
        validate_gateway_class_name(&self.gateway_class_name)?;

        Ok(ControllerConfig {
            controller_name: self.controller_name,
            gateway_class_name: self.gateway_class_name,
            secrets_dir: self.secrets_dir,
            config_artifact_path: self.config_artifact_path,
            reload_command: self.reload_command,
        })
    }
}

/// Validated controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller name, DOMAIN/NAMESPACE/NAME
    pub controller_name: String,

    /// GatewayClass name to manage
    pub gateway_class_name: String,

    /// Directory referenced TLS secrets are written into
    pub secrets_dir: PathBuf,

    /// Path the configuration artifact is written to
    pub config_artifact_path: PathBuf,

    /// Optional data-plane reload command
    pub reload_command: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: format!("{CONTROLLER_DOMAIN}/default/gateway-controller"),
            gateway_class_name: "silta".to_string(),
            secrets_dir: PathBuf::from("/etc/silta/secrets"),
            config_artifact_path: PathBuf::from("/etc/silta/config.json"),
            reload_command: None,
        }
    }
}

/// Check the controller-name flag: DOMAIN/NAMESPACE/NAME, domain pinned,
/// namespace equal to the process namespace (no cross-namespace
/// controllers), name non-empty.
pub fn validate_controller_name(
    param: &str,
    domain: &str,
    namespace: &str,
) -> Result<(), ControlError> {
    if param.is_empty() {
        return Err(ControlError::ConfigError(
            "controller-name must be set".to_string(),
        ));
    }

    let fields: Vec<&str> = param.split('/').collect();
    if fields.len() != 3 {
        return Err(ControlError::ConfigError(
            "controller-name must be of form DOMAIN/NAMESPACE/NAME".to_string(),
        ));
    }

    if fields[0] != domain {
        return Err(ControlError::ConfigError(format!(
            "invalid domain: {}",
            fields[0]
        )));
    }

    if fields[1] != namespace {
        return Err(ControlError::ConfigError(format!(
            "cross namespace unsupported: {}",
            fields[1]
        )));
    }

    if fields[2].is_empty() {
        return Err(ControlError::ConfigError(
            "controller-name must provide a name".to_string(),
        ));
    }

    Ok(())
}

/// Check the gateway-class-name flag against the DNS-1123 subdomain rules
/// Kubernetes applies to resource names.
pub fn validate_gateway_class_name(param: &str) -> Result<(), ControlError> {
    if param.is_empty() {
        return Err(ControlError::ConfigError(
            "gateway-class-name must be set".to_string(),
        ));
    }

    if !is_dns1123_subdomain(param) {
        return Err(ControlError::ConfigError(format!(
            "invalid gateway-class-name format: {param}"
        )));
    }

    Ok(())
}

/// DNS-1123 subdomain: dot-separated labels of lowercase alphanumerics
/// and dashes, each starting and ending alphanumeric, 253 chars total.
fn is_dns1123_subdomain(value: &str) -> bool {
    if value.is_empty() || value.len() > 253 {
        return false;
    }

    value.split('.').all(is_dns1123_label)
}

fn is_dns1123_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }

    let bytes = label.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    alnum(bytes[0])
        && alnum(bytes[bytes.len() - 1])
        && bytes.iter().all(|&b| alnum(b) || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_controller_name() {
        let result =
            validate_controller_name("silta.io/silta-system/gateway", "silta.io", "silta-system");
        assert!(result.is_ok());
    }

    #[test]
    fn test_controller_name_requires_three_fields() {
        for param in ["", "gateway", "silta.io/gateway", "silta.io/ns/gateway/extra"] {
            let result = validate_controller_name(param, "silta.io", "ns");
            assert!(result.is_err(), "should reject {param:?}");
        }
    }

    #[test]
    fn test_controller_name_rejects_wrong_domain() {
        let result = validate_controller_name("example.com/ns/gateway", "silta.io", "ns");
        assert!(result.is_err());
    }

    #[test]
    fn test_controller_name_rejects_cross_namespace() {
        let result = validate_controller_name("silta.io/other-ns/gateway", "silta.io", "ns");
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("cross namespace"), "got: {msg}");
    }

    #[test]
    fn test_controller_name_rejects_empty_name() {
        let result = validate_controller_name("silta.io/ns/", "silta.io", "ns");
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_gateway_class_names() {
        for param in ["silta", "silta-class", "gateway.class.1"] {
            assert!(
                validate_gateway_class_name(param).is_ok(),
                "should accept {param:?}"
            );
        }
    }

    #[test]
    fn test_invalid_gateway_class_names() {
        for param in ["", "Silta", "-silta", "silta-", "si..lta", "silta_class"] {
            assert!(
                validate_gateway_class_name(param).is_err(),
                "should reject {param:?}"
            );
        }
    }

    #[test]
    fn test_dns1123_label_length_limit() {
        let long_label = "a".repeat(64);
        assert!(validate_gateway_class_name(&long_label).is_err());
        let ok_label = "a".repeat(63);
        assert!(validate_gateway_class_name(&ok_label).is_ok());
    }
}
