use serde::{Deserialize, Serialize};

use crate::util;

/// Selects how a host authenticates against the image registry
/// before pulling.
///
/// Configured per deployment as `registry_auth` ("ecr" or
/// "ecr-legacy"). Any other name is rejected when the config
/// is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryAuthKind {
    /// `get-login-password` piped into `docker login`
    #[default]
    Ecr,

    /// `$(aws ecr get-login ...)`, only understood by AWS CLI v1
    EcrLegacy,
}

/// Renders the registry login line of the bootstrap script.
///
/// CONTRACT:
/// - Pure string formatting, no I/O
/// - The output is a single shell line
/// - Interpolated values are shell-quoted
pub trait RegistryAuth: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the image reference must name its registry host.
    fn requires_registry_host(&self) -> bool;

    fn login_command(&self, region: &str, image_reference: &str) -> String;
}

pub struct EcrLoginPassword;

impl RegistryAuth for EcrLoginPassword {
    fn name(&self) -> &'static str {
        "ecr"
    }

    fn requires_registry_host(&self) -> bool {
        true
    }

    fn login_command(&self, region: &str, image_reference: &str) -> String {
        let mut cmd = format!(
            "aws ecr get-login-password --region {} | sudo docker login --username AWS --password-stdin",
            util::shell_double_quote(region)
        );
        // Without a host docker logs into its default registry.
        if let Some(host) = util::registry_host(image_reference) {
            cmd.push(' ');
            cmd.push_str(&util::shell_double_quote(host));
        }
        cmd
    }
}

pub struct EcrLegacyLogin;

impl RegistryAuth for EcrLegacyLogin {
    fn name(&self) -> &'static str {
        "ecr-legacy"
    }

    fn requires_registry_host(&self) -> bool {
        false
    }

    fn login_command(&self, region: &str, _image_reference: &str) -> String {
        format!(
            "$(aws ecr get-login --no-include-email --region {})",
            util::shell_double_quote(region)
        )
    }
}

/// Resolves the strategy for a configured kind.
pub fn get_registry_auth(kind: RegistryAuthKind) -> &'static dyn RegistryAuth {
    match kind {
        RegistryAuthKind::Ecr => &EcrLoginPassword,
        RegistryAuthKind::EcrLegacy => &EcrLegacyLogin,
    }
}
