use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::bootstrap::registry::RegistryAuthKind;
use crate::error::{ValidationError, require, require_file_name};
use crate::generator::CollectorTable;
use crate::schema::{CollectorDefinition, DeploymentContext, InstanceProfile};

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// Top-level structure loaded from `deploy.json`.
//
// It defines:
// - Shared deployment parameters (image, bucket, log group)
// - Host defaults for every collector instance
// - The pipeline stages and their accounts
// - The static collector table
//
// Loaded once at startup and passed by reference afterwards.
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub deployment: DeploymentConfig,

    #[serde(default)]
    pub instance: InstanceConfig,

    /// Pipeline stages in promotion order
    pub stages: Vec<StageConfig>,

    /// One entry per collector host
    pub collectors: Vec<CollectorDefinition>,
}

// ------------------------------------------------------------
// Deployment parameters
// ------------------------------------------------------------
//
// Values shared by every collector of every stage.
//
#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentConfig {
    /// Container image the collectors run
    pub image_reference: String,

    /// Bucket the collectors write market data into
    pub bucket_name: String,

    /// Log group the log agent forwards container output to
    pub log_group_path: String,

    /// Registry login flavour ("ecr" or "ecr-legacy")
    #[serde(default)]
    pub registry_auth: RegistryAuthKind,
}

// ------------------------------------------------------------
// Instance defaults
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct InstanceConfig {
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    #[serde(default = "default_machine_image")]
    pub machine_image: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            instance_type: default_instance_type(),
            machine_image: default_machine_image(),
        }
    }
}

fn default_instance_type() -> String {
    InstanceProfile::default().instance_type
}

fn default_machine_image() -> String {
    InstanceProfile::default().machine_image
}

// ------------------------------------------------------------
// Stage configuration
// ------------------------------------------------------------
//
// One deployment environment of the pipeline.
//
// Notes:
// - `key_pair` is only set where shell access is wanted (dev).
// - `requires_approval` gates promotion into the stage behind a
//   manual approval step.
//
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StageConfig {
    /// Stage name (e.g. "dev", "staging", "prod")
    pub name: String,

    /// Target account id
    pub account: String,

    /// Target region
    pub region: String,

    #[serde(default)]
    pub key_pair: Option<String>,

    #[serde(default)]
    pub requires_approval: bool,
}

impl StageConfig {
    /// Name and account must be set; the name also names output files.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("stage.name", &self.name)?;
        require_file_name("stage.name", &self.name)?;
        require("stage.account", &self.account)?;
        Ok(())
    }
}

impl Config {
    /// Parses a configuration document.
    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let cfg = serde_json::from_str(data)?;
        Ok(cfg)
    }

    /// Looks up a stage by name.
    pub fn stage(&self, name: &str) -> anyhow::Result<&StageConfig> {
        match self.stages.iter().find(|s| s.name == name) {
            Some(stage) => Ok(stage),
            None => bail!(
                "unknown stage '{}' (known stages: {})",
                name,
                self.stage_names().join(", ")
            ),
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Shared parameters for one stage's synthesis pass.
    pub fn context_for(&self, stage: &StageConfig) -> DeploymentContext {
        DeploymentContext {
            image_reference: self.deployment.image_reference.clone(),
            bucket_name: self.deployment.bucket_name.clone(),
            region: stage.region.clone(),
            log_group_path: self.deployment.log_group_path.clone(),
            instance: InstanceProfile {
                instance_type: self.instance.instance_type.clone(),
                machine_image: self.instance.machine_image.clone(),
                key_pair: stage.key_pair.clone(),
            },
            registry_auth: self.deployment.registry_auth,
        }
    }

    /// The collector table with its uniqueness invariant checked.
    pub fn collector_table(&self) -> anyhow::Result<CollectorTable> {
        let table = CollectorTable::new(self.collectors.clone()).context("invalid collector table")?;
        Ok(table)
    }

    /// Checks the collector table, the stage list, and every stage's context.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.collector_table()?;

        if self.stages.is_empty() {
            bail!("no stages configured");
        }

        let mut names = BTreeSet::new();
        for stage in &self.stages {
            if !names.insert(stage.name.as_str()) {
                bail!("stage '{}' is configured more than once", stage.name);
            }
            stage
                .validate()
                .with_context(|| format!("invalid stage '{}'", stage.name))?;
            self.context_for(stage)
                .validate()
                .with_context(|| format!("invalid deployment context for stage '{}'", stage.name))?;
        }

        Ok(())
    }
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file from disk and deserializes
// it into the strongly typed `Config` structure.
//
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    Config::from_json(&data).with_context(|| format!("failed to parse config {}", path.display()))
}
