// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// - config:    Deployment configuration loaded from JSON
// - schema:    Collector definitions, context and descriptor types
// - error:     Validation error raised by the generator
// - util:      Naming and shell-quoting helpers
// - bootstrap: Host bootstrap script skeleton, log agent, registry login
// - generator: Descriptor generation over the collector table
// - synth:     One synthesis pass per stage and its outputs
//
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod generator;
pub mod schema;
pub mod synth;
pub mod util;

pub use config::{Config, load_config};
pub use error::ValidationError;
pub use generator::{CollectorTable, generate_all, generate_descriptor};
pub use schema::{
    CollectorDefinition, ContainerEnv, DeploymentContext, DeploymentDescriptor, InstanceProfile,
    ListingId,
};
