use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bootstrap::BootstrapStep;
use crate::bootstrap::registry::{RegistryAuthKind, get_registry_auth};
use crate::error::{ValidationError, require};
use crate::util;

/// Value passed as `PROPERTIES_PATH` to every collector container.
pub const PROPERTIES_PATH: &str = "collector.properties";

/// Prefix of every collector instance name.
pub const INSTANCE_NAME_PREFIX: &str = "MarketCollectorListingId";

/// Suffix of the provisioner construct id. Bumping it forces the
/// provisioner to replace every collector instance.
pub const LOGICAL_ID_SUFFIX: &str = "-v2";

// ------------------------------------------------------------
// Listing id
// ------------------------------------------------------------
//
// Opaque identifier of the listing a collector ingests.
//
// The collector table is hand-written, so ids show up either as
// JSON numbers (`1`) or strings (`"1"`). Both are accepted and
// held as text; the generator never interprets the value.
//
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for ListingId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ListingId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ListingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ListingId::from(n),
            Raw::Text(s) => ListingId(s),
        })
    }
}

// ------------------------------------------------------------
// Collector definition
// ------------------------------------------------------------
//
// One row of the static collector table.
//
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorDefinition {
    /// Listing this collector ingests. Unique within the table.
    pub listing_id: ListingId,

    /// Fully-qualified entry point the container executes
    /// (e.g. "group.gnometrading.collectors.DelegatingCollectorOrchestrator")
    pub main_class: String,
}

impl CollectorDefinition {
    pub fn new(listing_id: impl Into<ListingId>, main_class: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            main_class: main_class.into(),
        }
    }
}

// ------------------------------------------------------------
// Instance profile
// ------------------------------------------------------------
//
// Host-level settings handed to the provisioner along with the
// bootstrap script. Identical for every collector of a stage.
//
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProfile {
    /// Instance type (e.g. "t2.micro")
    pub instance_type: String,

    /// Machine image family the bootstrap script is written for
    pub machine_image: String,

    /// SSH key pair name. Only set on stages that allow shell access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair: Option<String>,
}

impl Default for InstanceProfile {
    fn default() -> Self {
        Self {
            instance_type: "t2.micro".to_string(),
            machine_image: "amazon-linux-2".to_string(),
            key_pair: None,
        }
    }
}

// ------------------------------------------------------------
// Deployment context
// ------------------------------------------------------------
//
// Shared parameters applied to every descriptor of one
// synthesis pass. Built once from the loaded configuration
// and passed by reference into the generator.
//
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContext {
    /// Container image every collector runs
    pub image_reference: String,

    /// Shared bucket the collectors write into
    pub bucket_name: String,

    /// Cloud region, used for registry authentication
    pub region: String,

    /// Log group the log-forwarding agent ships container logs to
    pub log_group_path: String,

    #[serde(default)]
    pub instance: InstanceProfile,

    #[serde(default)]
    pub registry_auth: RegistryAuthKind,
}

impl DeploymentContext {
    pub fn new(
        image_reference: impl Into<String>,
        bucket_name: impl Into<String>,
        region: impl Into<String>,
        log_group_path: impl Into<String>,
    ) -> Self {
        Self {
            image_reference: image_reference.into(),
            bucket_name: bucket_name.into(),
            region: region.into(),
            log_group_path: log_group_path.into(),
            instance: InstanceProfile::default(),
            registry_auth: RegistryAuthKind::default(),
        }
    }

    /// Checks every field the bootstrap script interpolates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("image_reference", &self.image_reference)?;
        require("bucket_name", &self.bucket_name)?;
        require("region", &self.region)?;
        require("log_group_path", &self.log_group_path)?;
        require("instance_type", &self.instance.instance_type)?;
        require("machine_image", &self.instance.machine_image)?;

        if get_registry_auth(self.registry_auth).requires_registry_host()
            && util::registry_host(&self.image_reference).is_none()
        {
            return Err(ValidationError::MissingRegistryHost {
                image_reference: self.image_reference.clone(),
            });
        }
        Ok(())
    }
}

// ------------------------------------------------------------
// Container environment
// ------------------------------------------------------------
//
// The fixed set of variables every collector container gets.
//
// IMPORTANT:
// - The key set is closed. Collectors read exactly these four.
// - `iter()` yields them in the order they appear on the
//   `docker run` line, so the rendered command is stable.
//
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEnv {
    #[serde(rename = "MAIN_CLASS")]
    pub main_class: String,

    #[serde(rename = "PROPERTIES_PATH")]
    pub properties_path: String,

    #[serde(rename = "LISTING_ID")]
    pub listing_id: String,

    #[serde(rename = "BUCKET_NAME")]
    pub bucket_name: String,
}

impl ContainerEnv {
    pub const KEYS: [&'static str; 4] = ["MAIN_CLASS", "PROPERTIES_PATH", "LISTING_ID", "BUCKET_NAME"];

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        Self::KEYS.into_iter().zip([
            self.main_class.as_str(),
            self.properties_path.as_str(),
            self.listing_id.as_str(),
            self.bucket_name.as_str(),
        ])
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

/// One line of the bootstrap script, tagged with the step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapCommand {
    pub step: BootstrapStep,
    pub command: String,
}

// ------------------------------------------------------------
// Deployment descriptor
// ------------------------------------------------------------
//
// Complete, static description of one collector host. This is
// the whole contract with the external provisioner: it turns
// each descriptor into an instance running `bootstrap_script`
// as user data.
//
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    /// "MarketCollectorListingId" + listing id
    pub instance_name: String,

    /// Construct id the provisioner registers the instance under
    pub logical_id: String,

    pub instance: InstanceProfile,

    /// Ordered boot commands
    pub bootstrap_script: Vec<BootstrapCommand>,

    pub container_env: ContainerEnv,
}

impl DeploymentDescriptor {
    /// The bare command lines, in execution order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.bootstrap_script.iter().map(|c| c.command.as_str())
    }
}
