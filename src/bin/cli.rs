use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manifestguard::analysis::RiskLevel;
use manifestguard::config::{Config, DEFAULT_CONFIG_FILE};
use manifestguard::error::{GuardError, Result};
use manifestguard::output::OutputFormat;
use manifestguard::{explain, loader, taxonomy, ScanOptions};

#[derive(Parser)]
#[command(
    name = "manifestguard",
    about = "Audit installed browser extensions by their declared permissions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan extension roots and score every installed extension
    Scan {
        /// Extension root directory (repeatable). Defaults to config, then
        /// the platform's browser profile directories.
        #[arg(long, short = 'r')]
        root: Vec<PathBuf>,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json, sarif)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Lowest risk level that fails the scan (low, low_medium, medium, high)
        #[arg(long)]
        fail_on: Option<String>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the explanation request for one unpacked extension directory
    Explain {
        /// Directory containing the extension's manifest.json
        path: PathBuf,

        /// Output format (prompt, json)
        #[arg(long, short = 'f', default_value = "prompt")]
        format: String,
    },

    /// List the permission taxonomy
    ListPermissions {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter .manifestguard.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            root,
            config,
            format,
            fail_on,
            output,
        } => cmd_scan(root, config, format, fail_on, output),
        Commands::Explain { path, format } => cmd_explain(path, format),
        Commands::ListPermissions { format } => cmd_list_permissions(format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

/// Logs go to stderr so they never mix with rendered reports.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_scan(
    roots: Vec<PathBuf>,
    config: Option<PathBuf>,
    format_str: String,
    fail_on_str: Option<String>,
    output_path: Option<PathBuf>,
) -> Result<i32> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let fail_on = fail_on_str.and_then(|s| {
        let level = RiskLevel::from_str_lenient(&s);
        if level.is_none() {
            eprintln!("Warning: unknown risk level '{}', using config default", s);
        }
        level
    });

    let options = ScanOptions {
        config_path: config,
        roots,
        use_platform_roots: true,
        format,
        fail_on_override: fail_on,
    };

    let report = manifestguard::audit(&options)?;
    let rendered = manifestguard::render_report(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered).map_err(|e| {
            GuardError::Output(format!("cannot write {}: {}", out.display(), e))
        })?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = an extension at or above the threshold
    Ok(if report.verdict.pass { 0 } else { 1 })
}

fn cmd_explain(path: PathBuf, format_str: String) -> Result<i32> {
    let manifest = loader::load(&path).map_err(|source| GuardError::Load {
        path: path.clone(),
        source,
    })?;
    let assessed = manifestguard::assess(manifest);
    let payload = explain::build_request(&assessed.assessment, &assessed.manifest.display_name);

    match format_str.as_str() {
        "json" => {
            let json = serde_json::json!({
                "cache_key": payload.cache_key(),
                "system": explain::SYSTEM_PROMPT,
                "payload": payload,
                "prompt": payload.prompt(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => print!("{}", payload.prompt()),
    }

    Ok(0)
}

fn cmd_list_permissions(format_str: String) -> Result<i32> {
    let entries = taxonomy::entries();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&entries)?;
            println!("{}", json);
        }
        _ => {
            println!("{:<24} {:<10} POINTS", "PERMISSION", "TIER");
            println!("{}", "-".repeat(42));
            for entry in &entries {
                println!(
                    "{:<24} {:<10} {}",
                    entry.permission,
                    entry.tier.to_string(),
                    entry.weight
                );
            }
            println!();
            println!("Host patterns: all hosts + all paths = CRITICAL, specific hosts = MEDIUM.");
            println!("Other patterns and unlisted permissions are UNKNOWN and add 0 points.");
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32> {
    let path = PathBuf::from(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", DEFAULT_CONFIG_FILE);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", DEFAULT_CONFIG_FILE);

    Ok(0)
}
