use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use rusty_nucdata::config::RunConfig;
use rusty_nucdata::{DatasetCollection, MetadataFilter, MetadataValue};

#[derive(Parser, Debug)]
#[command(name = "rusty-nucdata", version, about, long_about = None)]
struct Cli {
    /// JSON run configuration (paths and load options)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep Q2 as kinematic variable for DISNEU files
    #[arg(long)]
    no_disneu: bool,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// chi2/dof per dataset, sorted by ID
    Summary {
        paths: Vec<PathBuf>,
    },
    /// Distinct (A, Z) pairs of the beam nuclei
    Nuclei {
        paths: Vec<PathBuf>,
    },
    /// IDs of datasets matching metadata constraints
    Filter {
        /// Constraint such as `TypeExp=DISNEU` or `Z1=1`; repeatable
        #[arg(short = 'w', long = "where", value_parser = parse_constraint)]
        constraints: Vec<(String, MetadataValue)>,
        paths: Vec<PathBuf>,
    },
    /// Distinct grid values of every kinematic variable
    Bins {
        paths: Vec<PathBuf>,
    },
    /// Grid points in a two-variable kinematic plane
    Reach {
        #[arg(short, long, default_value = "X")]
        x: String,
        #[arg(short, long, default_value = "Q2")]
        y: String,
        paths: Vec<PathBuf>,
    },
}

impl Command {
    fn paths(&self) -> &[PathBuf] {
        match self {
            Command::Summary { paths }
            | Command::Nuclei { paths }
            | Command::Filter { paths, .. }
            | Command::Bins { paths }
            | Command::Reach { paths, .. } => paths,
        }
    }
}

fn parse_constraint(s: &str) -> std::result::Result<(String, MetadataValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.trim().to_string(), MetadataValue::guess(value)))
}

fn emit<T: Serialize>(json: bool, value: &T, plain: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("serialising output")?
        );
    } else {
        plain(value);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let base = path.parent().map(PathBuf::from).unwrap_or_default();
            RunConfig::from_json_file(path)?.resolve_relative_to(&base)
        }
        None => RunConfig::default(),
    };
    config.paths.extend(cli.command.paths().iter().cloned());
    if cli.no_disneu {
        config.load.apply_disneu_transform = false;
    }
    if config.paths.is_empty() {
        bail!("no input files given");
    }

    let (collection, failures) = DatasetCollection::load_lenient(&config.paths, &config.load);
    for (path, err) in &failures {
        eprintln!("failed to load {}: {err}", path.display());
    }
    if collection.is_empty() {
        bail!("none of the {} input files could be loaded", config.paths.len());
    }

    match &cli.command {
        Command::Summary { .. } => {
            let rows = collection.chi2dof_by_id();
            emit(cli.json, &rows, |rows| {
                println!("{:>8}  {:>10}", "ID", "chi2/dof");
                for e in rows {
                    let id = e.id.map(|i| i.to_string()).unwrap_or_else(|| "-".into());
                    println!("{id:>8}  {:>10.4}", e.chi2_per_dof);
                }
            })?;
            if !cli.json {
                println!();
                for ds in &collection {
                    println!(
                        "{:?}: {} rows, KinVar {:?}, TypeExp {}",
                        ds.id(),
                        ds.len(),
                        ds.kin_var(),
                        ds.metadata().type_exp.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Command::Nuclei { .. } => {
            emit(cli.json, &collection.nuclei_list(), |nuclei| {
                for n in nuclei {
                    println!("A = {:<6} Z = {}", n.a, n.z);
                }
            })?;
        }
        Command::Filter { constraints, .. } => {
            let filter: MetadataFilter = constraints.iter().cloned().collect();
            let selection = collection.filter_by(&filter);
            for key in &selection.ignored_keys {
                eprintln!("key '{key}' does not match any metadata field, ignored");
            }
            emit(cli.json, &selection.ids(), |ids| {
                println!("ID datasets found: {ids:?}");
            })?;
        }
        Command::Bins { .. } => {
            let bins = collection
                .iter()
                .map(|ds| Ok((ds.id(), ds.kin_var_bins()?)))
                .collect::<rusty_nucdata::Result<Vec<_>>>()?;
            emit(cli.json, &bins, |bins| {
                for (id, per_var) in bins {
                    println!("{id:?}");
                    for (name, values) in per_var {
                        println!("  {name}: {values:?}");
                    }
                }
            })?;
        }
        Command::Reach { x, y, .. } => {
            let reach = collection.kinematic_reach(x, y)?;
            emit(cli.json, &reach, |reach| {
                for r in reach {
                    println!("{:?}: {} points", r.id, r.x.len());
                }
            })?;
        }
    }
    Ok(())
}
