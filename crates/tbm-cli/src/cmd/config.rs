use crate::output::print_json;
use crate::root::{default_config_target, Loaded};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use tbm_core::config::{EngineConfig, WarnLevel};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective engine config
    Show,

    /// Write a default tbm.yaml (never overwrites)
    Init,

    /// Validate the config against its catalog
    Validate,
}

pub fn run(config: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config, json),
        ConfigSubcommand::Init => init(config, json),
        ConfigSubcommand::Validate => validate(config, json),
    }
}

fn show(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let loaded = Loaded::load(config)?;
    if json {
        return print_json(&serde_json::json!({
            "path": loaded.path,
            "config": loaded.config,
        }));
    }
    match &loaded.path {
        Some(p) => println!("# {}", p.display()),
        None => println!("# built-in defaults (no tbm.yaml found)"),
    }
    print!("{}", serde_yaml::to_string(&loaded.config)?);
    Ok(())
}

fn init(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let target = default_config_target(config);
    let data = serde_yaml::to_string(&EngineConfig::default())?;
    let created = tbm_core::io::write_if_missing(&target, data.as_bytes())
        .with_context(|| format!("failed to write {}", target.display()))?;

    if json {
        print_json(&serde_json::json!({
            "path": target,
            "created": created,
        }))?;
    } else if created {
        println!("Created {}", target.display());
    } else {
        println!("{} already exists; left unchanged", target.display());
    }
    Ok(())
}

fn validate(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let loaded = Loaded::load(config)?;
    let catalog = loaded.catalog()?;
    let warnings = loaded.config.validate(Some(&catalog));

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
