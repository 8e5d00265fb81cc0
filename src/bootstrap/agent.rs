//! Log-forwarding agent configuration.
//!
//! The agent tails every container log on the host and ships it
//! to the deployment's log group, one stream per instance.

use serde::Serialize;

/// Where the bootstrap script writes the agent configuration.
pub const AGENT_CONFIG_PATH: &str = "/etc/cloudwatch-agent/config.json";

/// Docker's json-file driver output, one directory per container.
pub const CONTAINER_LOG_GLOB: &str = "/var/lib/docker/containers/*/*.log";

/// Placeholder the agent substitutes with the host's instance id.
pub const LOG_STREAM_NAME: &str = "{instance_id}";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct AgentConfig<'a> {
    logs: Logs<'a>,
}

#[derive(Debug, Serialize)]
struct Logs<'a> {
    logs_collected: LogsCollected<'a>,
}

#[derive(Debug, Serialize)]
struct LogsCollected<'a> {
    files: Files<'a>,
}

#[derive(Debug, Serialize)]
struct Files<'a> {
    collect_list: Vec<CollectEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct CollectEntry<'a> {
    file_path: &'a str,
    log_group_name: &'a str,
    log_stream_name: &'a str,
    timestamp_format: &'a str,
}

/// Renders the agent configuration document for `log_group_path`.
///
/// Field order is fixed by the struct layout, so the output is
/// byte-stable for a given log group.
///
/// PANIC:
/// - Never in practice; every field is a plain string
pub fn agent_config(log_group_path: &str) -> String {
    let config = AgentConfig {
        logs: Logs {
            logs_collected: LogsCollected {
                files: Files {
                    collect_list: vec![CollectEntry {
                        file_path: CONTAINER_LOG_GLOB,
                        log_group_name: log_group_path,
                        log_stream_name: LOG_STREAM_NAME,
                        timestamp_format: TIMESTAMP_FORMAT,
                    }],
                },
            },
        },
    };

    serde_json::to_string_pretty(&config).expect("agent config serializes")
}

/// Shell command that writes the agent configuration to disk.
///
/// The heredoc delimiter is quoted so the shell leaves `{instance_id}`
/// and the `%` format specifiers alone.
pub fn write_config_command(log_group_path: &str) -> String {
    format!(
        "cat <<'EOF' > {AGENT_CONFIG_PATH}\n{}\nEOF",
        agent_config(log_group_path)
    )
}

/// Shell command that loads the written configuration and starts the agent.
pub fn start_command() -> String {
    format!(
        "sudo /opt/aws/amazon-cloudwatch-agent/bin/amazon-cloudwatch-agent-ctl \
         -a fetch-config -m ec2 -c file:{AGENT_CONFIG_PATH} -s"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_config_points_at_log_group() {
        let doc: Value = serde_json::from_str(&agent_config("/collector/logs")).unwrap();
        let entry = &doc["logs"]["logs_collected"]["files"]["collect_list"][0];

        assert_eq!(entry["file_path"], CONTAINER_LOG_GLOB);
        assert_eq!(entry["log_group_name"], "/collector/logs");
        assert_eq!(entry["log_stream_name"], "{instance_id}");
        assert_eq!(entry["timestamp_format"], "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn test_config_escapes_odd_log_group() {
        let doc: Value = serde_json::from_str(&agent_config("/logs/\"quoted\"\n")).unwrap();
        let entry = &doc["logs"]["logs_collected"]["files"]["collect_list"][0];
        assert_eq!(entry["log_group_name"], "/logs/\"quoted\"\n");
    }

    #[test]
    fn test_write_command_is_quoted_heredoc() {
        let cmd = write_config_command("/collector/logs");
        assert!(cmd.starts_with("cat <<'EOF' > /etc/cloudwatch-agent/config.json\n{"));
        assert!(cmd.ends_with("}\nEOF"));
    }

    #[test]
    fn test_start_loads_written_config() {
        assert!(start_command().contains("file:/etc/cloudwatch-agent/config.json"));
    }
}
