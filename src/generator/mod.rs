//! Deployment descriptor generator
//!
//! Maps `(CollectorDefinition, DeploymentContext)` to a
//! `DeploymentDescriptor`.
//!
//! GUARANTEES:
//! - Deterministic: same input, byte-identical output
//! - No I/O, no logging, no shared state
//! - Safe to call from many threads at once
//!
//! Cloud resources are not created here. The external provisioner
//! consumes the descriptors and does that.

pub mod table;

use crate::bootstrap;
use crate::error::{ValidationError, require};
use crate::schema::{
    CollectorDefinition, ContainerEnv, DeploymentContext, DeploymentDescriptor, PROPERTIES_PATH,
};
use crate::util;

pub use table::CollectorTable;

/// Builds the descriptor for one collector.
///
/// ERRORS:
/// - `ValidationError::EmptyField` if the listing id, the main class,
///   or any required context field is blank
pub fn generate_descriptor(
    def: &CollectorDefinition,
    ctx: &DeploymentContext,
) -> Result<DeploymentDescriptor, ValidationError> {
    require("listing_id", def.listing_id.as_str())?;
    require("main_class", &def.main_class)?;
    ctx.validate()?;

    let container_env = ContainerEnv {
        main_class: def.main_class.clone(),
        properties_path: PROPERTIES_PATH.to_string(),
        listing_id: def.listing_id.to_string(),
        bucket_name: ctx.bucket_name.clone(),
    };

    Ok(DeploymentDescriptor {
        instance_name: util::instance_name(&def.listing_id),
        logical_id: util::logical_id(&def.listing_id),
        instance: ctx.instance.clone(),
        bootstrap_script: bootstrap::build_script(ctx, &container_env),
        container_env,
    })
}

/// Builds descriptors for the whole table.
///
/// `output[i]` belongs to the i-th table entry. Fails on the first
/// invalid entry; no partial result is returned.
pub fn generate_all(
    table: &CollectorTable,
    ctx: &DeploymentContext,
) -> Result<Vec<DeploymentDescriptor>, ValidationError> {
    table
        .iter()
        .map(|def| generate_descriptor(def, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BootstrapStep;

    fn ctx() -> DeploymentContext {
        DeploymentContext::new(
            "443370708724.dkr.ecr.us-east-1.amazonaws.com/cdk-assets:abc",
            "market-data-collector",
            "us-east-1",
            "/collector/logs",
        )
    }

    #[test]
    fn test_descriptor_fields() {
        let def = CollectorDefinition::new("1", "com.foo.Bar");
        let d = generate_descriptor(&def, &ctx()).unwrap();

        assert_eq!(d.instance_name, "MarketCollectorListingId1");
        assert_eq!(d.logical_id, "MarketCollectorListingId1-v2");
        assert_eq!(d.instance.instance_type, "t2.micro");
        assert_eq!(d.container_env.get("MAIN_CLASS"), Some("com.foo.Bar"));
        assert_eq!(d.container_env.get("PROPERTIES_PATH"), Some("collector.properties"));
        assert_eq!(d.container_env.get("LISTING_ID"), Some("1"));
        assert_eq!(d.container_env.get("BUCKET_NAME"), Some("market-data-collector"));
    }

    #[test]
    fn test_deterministic() {
        let def = CollectorDefinition::new(7u64, "com.foo.Bar");
        let a = generate_descriptor(&def, &ctx()).unwrap();
        let b = generate_descriptor(&def, &ctx()).unwrap();

        assert_eq!(a, b);
        assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
    }

    #[test]
    fn test_empty_listing_id_rejected() {
        let def = CollectorDefinition::new("", "com.foo.Bar");
        assert_eq!(
            generate_descriptor(&def, &ctx()),
            Err(ValidationError::empty("listing_id"))
        );
    }

    #[test]
    fn test_empty_main_class_rejected() {
        let def = CollectorDefinition::new("1", "");
        assert_eq!(
            generate_descriptor(&def, &ctx()),
            Err(ValidationError::empty("main_class"))
        );
    }

    #[test]
    fn test_empty_context_field_rejected() {
        let def = CollectorDefinition::new("1", "com.foo.Bar");
        for field in ["image_reference", "bucket_name", "region", "log_group_path"] {
            let mut ctx = ctx();
            match field {
                "image_reference" => ctx.image_reference.clear(),
                "bucket_name" => ctx.bucket_name.clear(),
                "region" => ctx.region.clear(),
                _ => ctx.log_group_path.clear(),
            }
            assert_eq!(generate_descriptor(&def, &ctx), Err(ValidationError::empty(field)));
        }
    }

    #[test]
    fn test_two_collectors_differ_only_in_identity() {
        let table = CollectorTable::new(vec![
            CollectorDefinition::new("1", "com.foo.Bar"),
            CollectorDefinition::new("2", "com.foo.Baz"),
        ])
        .unwrap();

        let out = generate_all(&table, &ctx()).unwrap();
        assert_eq!(out.len(), 2);
        let (a, b) = (&out[0], &out[1]);

        assert_eq!(a.instance_name, "MarketCollectorListingId1");
        assert_eq!(b.instance_name, "MarketCollectorListingId2");
        assert_eq!(a.container_env.main_class, "com.foo.Bar");
        assert_eq!(b.container_env.main_class, "com.foo.Baz");
        assert_eq!(a.container_env.listing_id, "1");
        assert_eq!(b.container_env.listing_id, "2");

        assert_eq!(a.instance, b.instance);
        assert_eq!(a.container_env.properties_path, b.container_env.properties_path);
        assert_eq!(a.container_env.bucket_name, b.container_env.bucket_name);

        // Every step except the run line is shared verbatim.
        assert_eq!(a.bootstrap_script.len(), b.bootstrap_script.len());
        for (x, y) in a.bootstrap_script.iter().zip(&b.bootstrap_script) {
            assert_eq!(x.step, y.step);
            if x.step != BootstrapStep::ContainerRun {
                assert_eq!(x.command, y.command);
            }
        }
    }

    #[test]
    fn test_command_order_shared_across_collectors() {
        let table = CollectorTable::new(vec![
            CollectorDefinition::new("1", "com.foo.Bar"),
            CollectorDefinition::new("2", "com.foo.Baz"),
            CollectorDefinition::new("3", "com.foo.Qux"),
        ])
        .unwrap();

        let out = generate_all(&table, &ctx()).unwrap();
        let steps = |d: &DeploymentDescriptor| d.bootstrap_script.iter().map(|c| c.step).collect::<Vec<_>>();
        assert!(out.iter().all(|d| steps(d) == steps(&out[0])));
    }

    #[test]
    fn test_concurrent_generation_matches_sequential() {
        let table = CollectorTable::new(
            (1..=16u64)
                .map(|i| CollectorDefinition::new(i, format!("com.foo.C{i}")))
                .collect(),
        )
        .unwrap();
        let ctx = &ctx();
        let sequential = generate_all(&table, ctx).unwrap();

        let concurrent: Vec<DeploymentDescriptor> = std::thread::scope(|s| {
            let handles: Vec<_> = table
                .iter()
                .map(|def| s.spawn(move || generate_descriptor(def, ctx).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(sequential, concurrent);
    }
}
