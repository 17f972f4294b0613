use crate::output::{print_json, print_table};
use crate::root::Loaded;
use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tbm_core::catalog::Catalog;

#[derive(Subcommand)]
pub enum CatalogSubcommand {
    /// List interlocks, actuators and monitored devices
    Show,

    /// Check a catalog file (default: the configured catalog)
    Validate {
        /// Catalog file (.yaml, .yml or .json)
        path: Option<PathBuf>,
    },
}

pub fn run(config: Option<&Path>, subcmd: CatalogSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CatalogSubcommand::Show => {
            let catalog = Loaded::load(config)?.catalog()?;
            show(&catalog, json)
        }
        CatalogSubcommand::Validate { path } => {
            let catalog = match path {
                Some(p) => Catalog::load(&p)
                    .with_context(|| format!("invalid catalog {}", p.display()))?,
                None => Loaded::load(config)?.catalog()?,
            };
            validate(&catalog, json)
        }
    }
}

fn show(catalog: &Catalog, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(catalog);
    }

    let rows: Vec<Vec<String>> = catalog
        .interlocks
        .iter()
        .map(|i| {
            vec![
                i.id.clone(),
                i.category.to_string(),
                i.severity.to_string(),
                i.name.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "CATEGORY", "SEVERITY", "NAME"], &rows);

    println!();
    let rows: Vec<Vec<String>> = catalog
        .devices
        .iter()
        .map(|d| {
            let measurements: Vec<String> = d.measurements.iter().map(|m| m.id.clone()).collect();
            vec![
                d.id.clone(),
                d.interlock.clone().unwrap_or_else(|| "-".to_string()),
                measurements.join(","),
            ]
        })
        .collect();
    print_table(&["DEVICE", "INTERLOCK", "MEASUREMENTS"], &rows);

    let actuators: Vec<&str> = catalog.actuators.iter().map(|a| a.id.as_str()).collect();
    println!("\nActuators: {}", actuators.join(", "));
    Ok(())
}

fn validate(catalog: &Catalog, json: bool) -> anyhow::Result<()> {
    let critical = catalog.interlocks.iter().filter(|i| i.is_critical()).count();
    if json {
        print_json(&serde_json::json!({
            "valid": true,
            "interlocks": catalog.interlocks.len(),
            "critical": critical,
            "actuators": catalog.actuators.len(),
            "devices": catalog.devices.len(),
        }))?;
    } else {
        println!(
            "Catalog is valid: {} interlocks ({critical} critical), {} actuators, {} devices.",
            catalog.interlocks.len(),
            catalog.actuators.len(),
            catalog.devices.len()
        );
    }
    Ok(())
}
