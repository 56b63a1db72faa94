//! # File Grouper CLI (`fgroup`)
//!
//! ## Usage
//!
//! ```bash
//! fgroup --config ./config/fgroup.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fgroup group <folder>` | Group the folder's files and print the result as JSON |
//! | `fgroup extract <file>` | Print the text extracted from one file |
//! | `fgroup tools list` | Print the function-calling catalog |
//! | `fgroup tools call <name>` | Dispatch one function call and print its result |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use file_grouper::config;
use file_grouper::extract::extract_text;
use file_grouper::grouping::Grouper;
use file_grouper::models::GroupingResult;
use file_grouper::progress::ProgressMode;
use file_grouper::traits::{Session, ToolRegistry};

/// File Grouper CLI: sort a folder of documents into groups of related files.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "fgroup",
    about = "Group related documents in a folder by text similarity",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fgroup.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group the files directly inside a folder.
    ///
    /// Copies each group into `<output>/group_<k>` and every other file into
    /// `<output>/ungrouped`. Source files are left in place.
    Group {
        /// Folder whose files are grouped (subdirectories are ignored).
        folder: PathBuf,

        /// Output folder; overrides `[grouping].output_folder`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Similarity a file must exceed to join a seed's group.
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f64>,

        /// Progress on stderr: `auto`, `off`, `human`, or `json`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print the plain text extracted from one file.
    ///
    /// Prints nothing when the file is unreadable or unsupported.
    Extract {
        file: PathBuf,
    },

    /// Inspect or call the function-calling tools.
    Tools {
        #[command(subcommand)]
        action: ToolAction,
    },
}

#[derive(Subcommand)]
enum ToolAction {
    /// Print the tool catalog as JSON function declarations.
    List,
    /// Dispatch one call through a fresh session.
    Call {
        /// Tool name (e.g., `group_related_files`).
        name: String,
        /// Tool parameters as `key=value` pairs.
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

/// Parse a `key=value` pair for `--param` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Group {
            folder,
            output,
            threshold,
            progress,
        } => {
            let mode = match progress {
                Some(name) => ProgressMode::parse(&name).with_context(|| {
                    format!(
                        "Unknown progress mode: '{}'. Must be auto, off, human, or json.",
                        name
                    )
                })?,
                None => cfg.progress_mode()?,
            };
            mode.install_panic_hook();
            let grouper = Grouper::new(
                output.unwrap_or_else(|| cfg.grouping.output_folder.clone()),
                threshold.unwrap_or(cfg.grouping.similarity_threshold),
            )
            .with_exclude(cfg.grouping.exclude_set()?)
            .with_reporter(mode.reporter());

            let result = GroupingResult::from(grouper.run(&folder));
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Extract { file } => {
            print!("{}", extract_text(&file));
        }
        Commands::Tools { action } => match action {
            ToolAction::List => {
                let registry = ToolRegistry::with_builtins();
                println!("{}", serde_json::to_string_pretty(&registry.catalog())?);
            }
            ToolAction::Call { name, params } => {
                let arguments: serde_json::Map<String, serde_json::Value> = params
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                let mut session = Session::new(ToolRegistry::with_builtins(), cfg);
                let out = session
                    .dispatch(&name, serde_json::Value::Object(arguments))
                    .await?;
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
        },
    }

    Ok(())
}
