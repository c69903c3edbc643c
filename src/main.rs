//! xbrldts CLI - inspect taxonomy sets and validate instance documents

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use xbrldts::{DtsBuilder, InstanceBuilder, InstanceValidator};

/// XBRL taxonomy set engine and instance validator
#[derive(Parser)]
#[command(name = "xbrldts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a taxonomy schema and show its discoverable taxonomy set
    Taxonomy {
        /// Root schema file (.xsd)
        input: PathBuf,

        /// List the extended link roles of each linkbase
        #[arg(short, long)]
        roles: bool,
    },

    /// Load an instance document and validate its calculations
    Validate {
        /// Instance file (.xml / .xbrl)
        input: PathBuf,

        /// Report each fact's validation result
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Taxonomy { input, roles } => {
            let dts = DtsBuilder::new()
                .build(&input)
                .with_context(|| format!("Failed to load taxonomy {}", input.display()))?;

            println!("{} {}", "✓".green().bold(), input.display());
            println!("  Schemas: {}", dts.schema_count());
            println!("  Concepts: {}", dts.concept_count());
            println!("  Hypercubes: {}", dts.definition.hypercubes().len());
            println!("  Dimensions: {}", dts.definition.dimension_concepts().len());

            if roles {
                for (label, linkbase) in [
                    ("presentation", dts.presentation.base()),
                    ("label", dts.label.base()),
                    ("definition", dts.definition.base()),
                    ("calculation", dts.calculation.base()),
                ] {
                    let linkbase_roles: Vec<&str> = linkbase.extended_link_roles().collect();
                    if !linkbase_roles.is_empty() {
                        println!("  {} link roles:", label);
                        for role in linkbase_roles {
                            println!("    {}", role);
                        }
                    }
                }
            }
        }

        Commands::Validate { input, verbose } => {
            let instance = InstanceBuilder::new()
                .build(&input)
                .with_context(|| format!("Failed to load instance {}", input.display()))?;

            println!("  Facts: {}", instance.facts().len());
            println!("  Contexts: {}", instance.contexts().len());
            println!("  Units: {}", instance.units().len());

            let validator = InstanceValidator::new(&instance);

            if verbose {
                let mut failures = 0;
                for fact in instance.facts() {
                    let name = instance
                        .concept(fact.concept)
                        .map(|c| c.name.to_string())
                        .unwrap_or_else(|| "?".into());
                    match validator.validate_calculation(fact) {
                        Ok(()) => println!("  {} {} ({})", "✓".green(), name, fact.context),
                        Err(e) => {
                            println!("  {} {} ({}): {}", "✗".red(), name, fact.context, e);
                            failures += 1;
                        }
                    }
                }
                if failures > 0 {
                    println!(
                        "{} {} - {} calculation failures",
                        "✗".red().bold(),
                        input.display(),
                        failures
                    );
                    std::process::exit(1);
                }
                println!("{} {} - Instance is valid", "✓".green().bold(), input.display());
            } else {
                match validator.validate() {
                    Ok(()) => {
                        println!(
                            "{} {} - Instance is valid",
                            "✓".green().bold(),
                            input.display()
                        );
                    }
                    Err(e) => {
                        println!(
                            "{} {} - Validation failed",
                            "✗".red().bold(),
                            input.display()
                        );
                        println!("  {} {}", "ERROR:".red(), e);
                        std::process::exit(1);
                    }
                }
            }
        }
    }

    Ok(())
}
