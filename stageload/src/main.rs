//! Stageload CLI - transform and validate tabular data files
//!
//! # Main Commands
//!
//! ```bash
//! stageload process data/raw --config config.json --out-dir data/processed
//! stageload validate data/output --schema schema.dbml --invalid-dir data/invalid
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! stageload schema schema.dbml     # Parse a schema description, dump as JSON
//! stageload steps                  # Show available parse steps
//! ```

use clap::{Parser, Subcommand};
use stageload::{
    process_dir, process_file, steps_description, validate_dir, validate_file, write_table_csv,
    DiagLevel, Diagnostics, PipelineConfig, SchemaModel,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stageload")]
#[command(about = "Transform delimited files through declarative column pipelines and validate staged rows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a source file (or every CSV in a directory) to canonical typed output
    Process {
        /// Input CSV file or directory
        input: PathBuf,

        /// Pipeline configuration file (default: $STAGELOAD_CONFIG or config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for canonical output files (default: alongside stdout summary only)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Validate staged temp_<table>.csv files against a schema description
    Validate {
        /// Staged CSV file or directory
        input: PathBuf,

        /// Schema description file (default: $STAGELOAD_SCHEMA or schema.dbml)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Directory for quarantined invalid rows
        #[arg(long, default_value = "invalid")]
        invalid_dir: PathBuf,
    },

    /// Parse a schema description and dump the model as JSON
    Schema {
        /// Schema description file
        input: PathBuf,
    },

    /// Show available parse steps
    Steps,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            config,
            out_dir,
        } => cmd_process(&input, config, out_dir.as_deref()),

        Commands::Validate {
            input,
            schema,
            invalid_dir,
        } => cmd_validate(&input, schema, &invalid_dir),

        Commands::Schema { input } => cmd_schema(&input),

        Commands::Steps => cmd_steps(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn resolve_path(cli_value: Option<PathBuf>, env_var: &str, default: &str) -> PathBuf {
    cli_value
        .or_else(|| std::env::var(env_var).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn print_diags(diags: &Diagnostics) {
    for entry in diags.entries() {
        let prefix = match entry.level {
            DiagLevel::Notice => "  ",
            DiagLevel::Warning => "⚠️ ",
        };
        eprintln!("   {}{}", prefix, entry);
    }
}

fn cmd_process(
    input: &Path,
    config_path: Option<PathBuf>,
    out_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_path(config_path, "STAGELOAD_CONFIG", "config.json");
    eprintln!("📄 Processing: {}", input.display());
    eprintln!("   Config: {}", config_path.display());

    let config = PipelineConfig::load(&config_path)?;
    let mut diags = Diagnostics::new();

    if input.is_dir() {
        let outcome = process_dir(input, &config, out_dir, &mut diags)?;
        print_diags(&diags);

        eprintln!(
            "\n✅ Processed {} table(s), {} file(s) failed",
            outcome.processed.len(),
            outcome.failures.len()
        );
        for output in &outcome.processed {
            eprintln!("   {}", output.summary());
        }
        if !outcome.failures.is_empty() {
            for (file, err) in &outcome.failures {
                eprintln!("   ❌ {}: {}", file, err);
            }
            std::process::exit(1);
        }
    } else {
        let output = process_file(input, &config, &mut diags)?;
        print_diags(&diags);

        if let Some(out_dir) = out_dir {
            std::fs::create_dir_all(out_dir)?;
            let target = out_dir.join(format!("{}.csv", output.table.table_name));
            write_table_csv(&output.table, &target)?;
            eprintln!("   💾 Output written to: {}", target.display());
        }
        eprintln!("\n✅ {}", output.summary());
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    schema_path: Option<PathBuf>,
    invalid_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema_path = resolve_path(schema_path, "STAGELOAD_SCHEMA", "schema.dbml");
    eprintln!("✔️  Validating: {}", input.display());
    eprintln!("   Schema: {}", schema_path.display());

    let schema = SchemaModel::load(&schema_path)?;
    let mut diags = Diagnostics::new();

    let reports = if input.is_dir() {
        validate_dir(input, &schema, invalid_dir, &mut diags)?
    } else {
        validate_file(input, &schema, invalid_dir, &mut diags)?
            .into_iter()
            .collect()
    };
    print_diags(&diags);

    let mut total_invalid = 0;
    eprintln!("\n📊 Results:");
    for report in &reports {
        total_invalid += report.invalid_rows;
        if report.invalid_rows == 0 {
            eprintln!("   ✅ {}: all {} rows valid", report.file, report.valid_rows);
        } else {
            eprintln!(
                "   ❌ {}: {} valid, {} invalid",
                report.file, report.valid_rows, report.invalid_rows
            );
        }
    }

    if total_invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_schema(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let schema = SchemaModel::load(input)?;
    eprintln!("📄 Parsed {} table(s)", schema.len());
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn cmd_steps() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", steps_description());
    Ok(())
}
