use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::Application;
use crate::config::{Config, StorageBackend};
use crate::db;
use crate::interpreter::{Program, Val};

#[derive(Parser)]
#[command(name = "sproc")]
#[command(about = "sproc - run stored-procedure programs", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL (overrides config file and env vars)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Storage backend (overrides config file and env vars)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<StorageBackend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program given as a JSON statement tree
    Run {
        /// Program file (`{"params": [...], "body": [...]}`)
        program: PathBuf,

        /// Program argument as name=<json>, repeatable
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,

        /// Abort the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Also print the final OUT/INOUT parameter values
        #[arg(long)]
        outputs: bool,
    },

    /// Manage stored procedures
    Procedure {
        #[command(subcommand)]
        command: ProcedureCommands,
    },

    /// Run database migrations
    Migrate,

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum ProcedureCommands {
    /// Store a procedure definition from a JSON file
    Put {
        name: String,
        /// Definition file (`{"params": [...], "body": [...]}`)
        file: PathBuf,
    },

    /// Print a stored procedure definition
    Get { name: String },

    /// Delete a stored procedure
    Delete { name: String },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config)
        .database_url(cli.database_url)
        .backend(cli.backend)
        .build()?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }

        Commands::Migrate => {
            println!("Running migrations...");
            let pool = db::create_pool(&config.database).await?;
            db::migrate(&pool).await?;
            println!("Migrations complete!");
        }

        Commands::Procedure { command } => {
            // The memory store lives only as long as this process
            if config.storage.backend == StorageBackend::Memory {
                anyhow::bail!(
                    "Procedure commands need the postgres storage backend; \
                     the memory store is discarded when sproc exits"
                );
            }
            let app = Application::initialize(config).await?;
            match command {
                ProcedureCommands::Put { name, file } => {
                    let text = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    app.procedures.store(&name, &text).await?;
                    println!("Stored procedure '{}'", name);
                }
                ProcedureCommands::Get { name } => match app.procedures.fetch(&name).await? {
                    Some(definition) => {
                        println!("{}", serde_json::to_string_pretty(&definition)?);
                    }
                    None => {
                        eprintln!("Procedure '{}' not found", name);
                        std::process::exit(1);
                    }
                },
                ProcedureCommands::Delete { name } => {
                    if app.procedures.delete(&name).await? {
                        println!("Deleted procedure '{}'", name);
                    } else {
                        eprintln!("Procedure '{}' not found", name);
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Run {
            program,
            args,
            timeout_secs,
            outputs,
        } => {
            let text = std::fs::read_to_string(&program)
                .with_context(|| format!("Failed to read {}", program.display()))?;
            let program: Program = serde_json::from_str(&text)
                .with_context(|| format!("Invalid program in {}", program.display()))?;
            let args = parse_args(&args)?;

            let app = Application::initialize(config).await?;
            let run = app.interpreter.execute(&program, args);
            let result = match timeout_secs {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                    .await
                    .map_err(|_| anyhow::anyhow!("Program timed out after {}s", secs))?,
                None => run.await,
            };
            let outcome = result.map_err(|err| anyhow::anyhow!("[{}] {}", err.code(), err))?;

            if outputs {
                let rendered = serde_json::json!({
                    "value": outcome.value.to_json(),
                    "outputs": outcome
                        .outputs
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_json()))
                        .collect::<serde_json::Map<_, _>>(),
                });
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                println!("{}", outcome.value.to_json());
            }
        }
    }

    Ok(())
}

/// Parse `name=<json>` program arguments
///
/// A value that is not valid JSON is taken as a plain string.
pub fn parse_args(args: &[String]) -> Result<HashMap<String, Val>> {
    let mut parsed = HashMap::new();
    for arg in args {
        let (name, raw) = arg
            .split_once('=')
            .with_context(|| format!("Argument '{}' must have the form name=value", arg))?;
        if name.is_empty() {
            anyhow::bail!("Argument '{}' has an empty name", arg);
        }
        let value = match serde_json::from_str(raw) {
            Ok(json) => Val::from_json(&json),
            Err(_) => Val::str(raw),
        };
        if parsed.insert(name.to_string(), value).is_some() {
            anyhow::bail!("Argument '{}' given more than once", name);
        }
    }
    Ok(parsed)
}
