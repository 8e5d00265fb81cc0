use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use serde::Serialize;

use crate::bootstrap;
use crate::bootstrap::registry::get_registry_auth;
use crate::config::Config;
use crate::generator;
use crate::schema::DeploymentDescriptor;

/// Output of one synthesis pass for one stage.
///
/// This is the document handed to the provisioner: the stage's
/// account and region plus one descriptor per collector, in
/// collector-table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub stage: String,
    pub account: String,
    pub region: String,
    pub requires_approval: bool,
    pub descriptors: Vec<DeploymentDescriptor>,
}

/// Runs the generator over the full collector table for `stage`.
pub fn synthesize(config: &Config, stage: &str) -> anyhow::Result<Manifest> {
    let stage_cfg = config.stage(stage)?;
    stage_cfg
        .validate()
        .with_context(|| format!("invalid stage '{stage}'"))?;
    let table = config.collector_table()?;
    let ctx = config.context_for(stage_cfg);

    let descriptors = generator::generate_all(&table, &ctx)
        .with_context(|| format!("descriptor generation failed for stage '{stage}'"))?;

    log::info!(
        "synthesized stage={} account={} region={} registry_auth={} collectors={}",
        stage_cfg.name,
        stage_cfg.account,
        stage_cfg.region,
        get_registry_auth(ctx.registry_auth).name(),
        descriptors.len()
    );
    for d in &descriptors {
        log::debug!(
            "{} main_class={} commands={}",
            d.instance_name,
            d.container_env.main_class,
            d.bootstrap_script.len()
        );
    }

    Ok(Manifest {
        stage: stage_cfg.name.clone(),
        account: stage_cfg.account.clone(),
        region: stage_cfg.region.clone(),
        requires_approval: stage_cfg.requires_approval,
        descriptors,
    })
}

impl Manifest {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the manifest as JSON, to `<out_dir>/<stage>.json` or stdout.
    pub fn write_json(&self, out_dir: Option<&Path>) -> anyhow::Result<()> {
        let json = self.to_json()?;
        match out_dir {
            Some(dir) => {
                let path = output_path(dir, &format!("{}.json", self.stage))?;
                write_file(&path, &json)?;
                log::info!("wrote manifest {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{json}")?;
            }
        }
        Ok(())
    }

    /// Writes one user-data script per collector.
    ///
    /// With a directory, each script lands in `<instance_name>.sh`.
    /// Without one, scripts go to stdout, each preceded by a
    /// `# <instance_name>` marker line.
    pub fn write_user_data(&self, out_dir: Option<&Path>) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        let mut stdout = std::io::stdout().lock();

        for d in &self.descriptors {
            let script = bootstrap::render_user_data(&d.bootstrap_script);
            match out_dir {
                Some(dir) => {
                    let path = output_path(dir, &format!("{}.sh", d.instance_name))?;
                    write_file(&path, &script)?;
                    written.push(path);
                }
                None => {
                    writeln!(stdout, "# {}", d.instance_name)?;
                    write!(stdout, "{script}")?;
                }
            }
        }

        if let Some(dir) = out_dir {
            log::info!("wrote {} user-data scripts to {}", written.len(), dir.display());
        }
        Ok(written)
    }
}

/// Joins `file_name` onto `dir`, refusing anything but a plain file name.
fn output_path(dir: &Path, file_name: &str) -> anyhow::Result<PathBuf> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == file_name => Ok(dir.join(name)),
        _ => bail!("refusing to write '{file_name}' outside {}", dir.display()),
    }
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
