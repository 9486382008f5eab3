//! `prefsheet` - inspect settings schemas and apply scripted edits.
//!
//! ```bash
//! # Validate a schema
//! prefsheet check settings.json
//!
//! # Show the root screen with current values
//! prefsheet show settings.json --values current.toml
//!
//! # Change values, nested sections addressed by merge key
//! prefsheet apply settings.json --values current.toml \
//!     --set user=alice --set net.port=3128 --output changes.toml
//! ```

#[macro_use]
extern crate log;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use prefsheet::{
    PropertyGroup, RowDescriptor, Schema, SessionConfig, SessionController, StaticDelegate,
    Value,
};

mod files;
mod script;

use script::Assignment;

#[derive(Parser)]
#[command(name = "prefsheet")]
#[command(version, about = "Settings schema interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log session activity (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a schema
    Check {
        /// Schema document (.json or .toml)
        schema: PathBuf,
    },
    /// Print the root sections with their effective values
    Show {
        schema: PathBuf,
        #[command(flatten)]
        values: ValueArgs,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply assignments and print or save the resulting changes
    Apply {
        schema: PathBuf,
        #[command(flatten)]
        values: ValueArgs,
        /// Session configuration (.json or .toml)
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// PATH=VALUE, where PATH is dotted through nested sections
        #[arg(long = "set", short = 's', value_name = "PATH=VALUE", value_parser = Assignment::parse)]
        set: Vec<Assignment>,
        /// Write the changes here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the JSON schema of the session configuration file
    ConfigSchema,
}

#[derive(clap::Args)]
struct ValueArgs {
    /// Input values (.json or .toml)
    #[arg(long)]
    values: Option<PathBuf>,
    /// Fallback values (.json or .toml)
    #[arg(long)]
    defaults: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Check { schema } => check(schema).await,
        Commands::Show {
            schema,
            values,
            json,
        } => show(schema, values, json).await,
        Commands::Apply {
            schema,
            values,
            config,
            set,
            output,
        } => apply(schema, values, config, set, output).await,
        Commands::ConfigSchema => {
            let schema = schemars::schema_for!(SessionConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct Summary {
    groups: usize,
    rows: usize,
    depth: usize,
    lazy: usize,
    by_type: BTreeMap<&'static str, usize>,
}

impl Summary {
    fn collect(&mut self, groups: &[PropertyGroup], level: usize) {
        self.depth = self.depth.max(level);
        self.groups += groups.len();
        for row in groups.iter().flat_map(|g| &g.rows) {
            self.rows += 1;
            *self.by_type.entry(row.row_type().name()).or_default() += 1;
            match row.kind.child_groups() {
                Some(children) => self.collect(&children, level + 1),
                None if row.row_type().is_nesting() => self.lazy += 1,
                None => {}
            }
        }
    }
}

async fn check(path: PathBuf) -> Result<()> {
    let groups = files::load_schema(&path).await?;
    let schema = Schema::build(groups, 0)?;

    let mut summary = Summary::default();
    summary.collect(schema.groups(), 0);

    println!("{} {}", "✓".green().bold(), path.display().to_string().bold());
    println!(
        "  {} groups, {} rows, nesting depth {}",
        summary.groups, summary.rows, summary.depth
    );
    for (name, count) in &summary.by_type {
        println!("  {}", format!("{name:<14} {count}").cyan());
    }
    if summary.lazy > 0 {
        println!(
            "  {}",
            format!("{} nested sections are supplied by the host", summary.lazy).yellow()
        );
    }
    Ok(())
}

async fn session(
    schema: &Path,
    values: &ValueArgs,
    config: SessionConfig,
) -> Result<SessionController<StaticDelegate>> {
    let groups = files::load_schema(schema).await?;
    let values_in = files::load_values(values.values.as_deref()).await?;
    let defaults = files::load_values(values.defaults.as_deref()).await?;
    let delegate = StaticDelegate::new(values_in).with_defaults(defaults);
    Ok(SessionController::with_config(groups, delegate, config)?)
}

fn render_value(row: &RowDescriptor) -> String {
    match &row.value {
        Value::Null => "-".dimmed().to_string(),
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

async fn show(schema: PathBuf, values: ValueArgs, json: bool) -> Result<()> {
    let ctl = session(&schema, &values, SessionConfig::default()).await?;
    let sections = ctl.sections()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
        return Ok(());
    }

    for section in &sections {
        println!("{}", section.title.bold().purple());
        if let Some(header) = &section.header {
            println!("  {}", header.dimmed());
        }
        for row in &section.rows {
            let label = format!("{:<24}", row.name);
            let label = if row.editable {
                label.normal()
            } else {
                label.dimmed()
            };
            let value = match row.row_type {
                t if t.is_nesting() => "›".cyan().to_string(),
                prefsheet::RowType::Action => "[run]".cyan().to_string(),
                _ => render_value(row),
            };
            println!("  {label} {value}");
        }
        if let Some(footer) = &section.footer {
            println!("  {}", footer.dimmed());
        }
        println!();
    }
    Ok(())
}

async fn apply(
    schema: PathBuf,
    values: ValueArgs,
    config: Option<PathBuf>,
    set: Vec<Assignment>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = files::load_config(config.as_deref()).await?;
    let groups = files::load_schema(&schema).await?;
    let values_in = files::load_values(values.values.as_deref()).await?;
    let defaults = files::load_values(values.defaults.as_deref()).await?;

    let diff = script::run(groups, values_in, defaults, config, &set)?;
    let diff = Value::Object(diff);

    match output {
        Some(path) => {
            if let Some(backup) = files::save_document(&path, &diff).await? {
                println!("{}", format!("previous content kept in {}", backup.display()).yellow());
            }
            println!("{} {}", "changes written to".green(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&diff)?),
    }
    Ok(())
}
