//! Host bootstrap script builder.
//!
//! Every collector host boots with the same command skeleton:
//! package update, container runtime, log agent, registry login,
//! image pull, container run. Only the values interpolated into
//! the commands differ between collectors.
//!
//! The skeleton has no branches. Adding a step means adding a
//! `BootstrapStep` variant and extending `build_script`.

pub mod agent;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::schema::{BootstrapCommand, ContainerEnv, DeploymentContext};
use crate::util;

/// Shared memory allocated to every collector container.
pub const SHM_SIZE: &str = "2gb";

/// Logical phases of the bootstrap script, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStep {
    PackageUpdate,
    ContainerRuntime,
    LogAgentInstall,
    LogAgentStart,
    RegistryLogin,
    ImagePull,
    ContainerRun,
}

impl BootstrapStep {
    pub const ALL: [BootstrapStep; 7] = [
        BootstrapStep::PackageUpdate,
        BootstrapStep::ContainerRuntime,
        BootstrapStep::LogAgentInstall,
        BootstrapStep::LogAgentStart,
        BootstrapStep::RegistryLogin,
        BootstrapStep::ImagePull,
        BootstrapStep::ContainerRun,
    ];
}

/// Builds the ordered bootstrap commands for one collector.
///
/// INPUT:
/// - `ctx`: shared deployment parameters (already validated)
/// - `env`: the collector's container environment
///
/// MUST NOT:
/// - Perform I/O
/// - Branch on input values
pub fn build_script(ctx: &DeploymentContext, env: &ContainerEnv) -> Vec<BootstrapCommand> {
    let auth = registry::get_registry_auth(ctx.registry_auth);

    let steps: [(BootstrapStep, Vec<String>); 7] = [
        (BootstrapStep::PackageUpdate, vec!["sudo yum update -y".to_string()]),
        (
            BootstrapStep::ContainerRuntime,
            vec![
                "sudo amazon-linux-extras enable docker".to_string(),
                "sudo yum install -y docker".to_string(),
                "sudo service docker start".to_string(),
                "sudo usermod -a -G docker ec2-user".to_string(),
            ],
        ),
        (
            BootstrapStep::LogAgentInstall,
            vec![
                "sudo yum install -y amazon-cloudwatch-agent".to_string(),
                "sudo mkdir -p /etc/cloudwatch-agent".to_string(),
                agent::write_config_command(&ctx.log_group_path),
            ],
        ),
        (BootstrapStep::LogAgentStart, vec![agent::start_command()]),
        (
            BootstrapStep::RegistryLogin,
            vec![auth.login_command(&ctx.region, &ctx.image_reference)],
        ),
        (
            BootstrapStep::ImagePull,
            vec![format!(
                "sudo docker pull {}",
                util::shell_double_quote(&ctx.image_reference)
            )],
        ),
        (
            BootstrapStep::ContainerRun,
            vec![container_run_command(&ctx.image_reference, env)],
        ),
    ];

    steps
        .into_iter()
        .flat_map(|(step, commands)| {
            commands
                .into_iter()
                .map(move |command| BootstrapCommand { step, command })
        })
        .collect()
}

/// Single-line `docker run` invocation for a collector container.
///
/// Every interpolated value is double-quoted, so a value can never
/// end the command or start another one.
pub fn container_run_command(image_reference: &str, env: &ContainerEnv) -> String {
    let mut cmd = format!("sudo docker run --shm-size={SHM_SIZE}");
    for (key, value) in env.iter() {
        cmd.push_str(" -e ");
        cmd.push_str(&util::shell_double_quote(&format!("{key}={value}")));
    }
    cmd.push_str(" -d ");
    cmd.push_str(&util::shell_double_quote(image_reference));
    cmd
}

/// Renders commands as a Linux user-data document.
pub fn render_user_data(script: &[BootstrapCommand]) -> String {
    let mut out = String::from("#!/bin/bash\n");
    for line in script {
        out.push_str(&line.command);
        out.push('\n');
    }
    out
}
