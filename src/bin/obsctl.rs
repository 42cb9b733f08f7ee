use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use request_observability::classify::{describe, operation_label, trim_url};
use request_observability::context::id::{generate_correlation_id, generate_operation_id};
use request_observability::context::OsEntropy;
use request_observability::redaction::{redact, StaticSchema};

#[derive(Parser)]
#[command(name = "obsctl")]
#[command(about = "Offline tools for the request observability pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the operation label for a method and URL
    Classify {
        method: String,
        url: String,
    },
    /// Redact a JSON message read from a file or stdin
    Redact {
        /// TOML schema with field loggability metadata
        #[arg(short, long)]
        schema: PathBuf,
        /// Message type name in the schema
        #[arg(short, long)]
        message_type: String,
        /// JSON input file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Generate an operation id and a correlation id
    GenId,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { method, url } => {
            let output = serde_json::json!({
                "label": operation_label(&method, &url),
                "url": trim_url(&url),
                "resource": describe(&method, &url),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Redact {
            schema,
            message_type,
            file,
        } => {
            let schema = StaticSchema::from_toml(&std::fs::read_to_string(schema)?)?;
            let input = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let value: Value = serde_json::from_str(&input)?;
            let redacted = redact(&schema, &message_type, value);
            println!("{}", serde_json::to_string_pretty(&redacted)?);
        }
        Commands::GenId => {
            println!("operation_id:   {}", generate_operation_id(&OsEntropy)?);
            println!("correlation_id: {}", generate_correlation_id(&OsEntropy)?);
        }
    }

    Ok(())
}
