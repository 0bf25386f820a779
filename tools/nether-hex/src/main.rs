//! Nether Hex - inspect and edit ROM tables
//!
//! # Commands
//!
//! - `nether-hex schema` - Parse a table format and list its fields
//! - `nether-hex dump` - Print the records of the tables in a project
//! - `nether-hex set` - Write one field of one record
//!
//! # Usage
//!
//! ```bash
//! # Check a format string
//! nether-hex schema 'name""11 hp. type.types+1 moves<[id. pp.]4>'
//!
//! # Print every table, following pointers
//! nether-hex dump game.gba --project tables.toml --deep
//!
//! # Rename species 3
//! nether-hex set game.gba --project tables.toml --table species --index 3 --field name --value '"Bulba"'
//! ```
//!
//! # Project (tables.toml)
//!
//! ```toml
//! [[anchors]]
//! name = "movelist"
//! address = 0x200
//!
//! [[tables]]
//! name = "species"
//! address = 0x100
//! format = "name\"\"6 type.types hp."
//! count = 3
//!
//! [lists]
//! types = ["Normal", "Fire", "Water"]
//!
//! [bits]
//! flags = ["A", "B", "C", "D"]
//! ```

mod dump;
mod project;
mod schema;
mod set;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Nether Hex - inspect and edit ROM tables
#[derive(Parser)]
#[command(name = "nether-hex")]
#[command(about = "Inspect and edit ROM tables described by schema strings")]
#[command(version)]
struct Cli {
    /// Log engine decisions (format imposition, reconciliation)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a table format and list its fields
    Schema(schema::SchemaArgs),

    /// Print the records of the tables in a project
    Dump(dump::DumpArgs),

    /// Write one field of one record
    Set(set::SetArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Schema(args) => schema::execute(args),
        Commands::Dump(args) => dump::execute(args),
        Commands::Set(args) => set::execute(args),
    }
}
