mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nrbf")]
#[command(about = "NRBF save file editor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a save file (header fields and record statistics)
    Inspect {
        /// Path to the save file
        #[arg(short, long)]
        input: PathBuf,

        /// Emit statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every field path and its value
    Paths {
        /// Path to the save file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Get the value at a field path (e.g. "Player.Stats.XP")
    Get {
        /// Path to the save file
        #[arg(short, long)]
        input: PathBuf,

        /// Field path query
        query: String,
    },

    /// Set a primitive value at a field path
    Set {
        /// Path to the save file
        #[arg(short, long)]
        input: PathBuf,

        /// Field path to modify
        path: String,

        /// New value (parsed against the field's type)
        value: String,

        /// Skip the .bak backup copy
        #[arg(long)]
        no_backup: bool,
    },

    /// Replace the string at a field path
    SetString {
        /// Path to the save file
        #[arg(short, long)]
        input: PathBuf,

        /// Field path to modify
        path: String,

        /// New string contents
        value: String,

        /// Skip the .bak backup copy
        #[arg(long)]
        no_backup: bool,
    },

    /// Rewrite the GUID at a field path
    SetGuid {
        /// Path to the save file
        #[arg(short, long)]
        input: PathBuf,

        /// Field path of the System.Guid record
        path: String,

        /// New GUID, e.g. "aabbccdd-eeff-0011-2233-445566778899"
        value: String,

        /// Skip the .bak backup copy
        #[arg(long)]
        no_backup: bool,
    },

    /// Compare two save files field by field
    Diff {
        /// Path to the before file
        before: PathBuf,

        /// Path to the after file
        after: PathBuf,

        /// Emit the change list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { input, json } => commands::inspect(&input, json),
        Commands::Paths { input } => commands::paths(&input),
        Commands::Get { input, query } => commands::get(&input, &query),
        Commands::Set {
            input,
            path,
            value,
            no_backup,
        } => commands::edit(&input, no_backup, |doc| {
            doc.set_primitive_str(&path, &value)
        }),
        Commands::SetString {
            input,
            path,
            value,
            no_backup,
        } => commands::edit(&input, no_backup, |doc| doc.set_string(&path, &value)),
        Commands::SetGuid {
            input,
            path,
            value,
            no_backup,
        } => commands::edit(&input, no_backup, |doc| doc.set_guid(&path, &value)),
        Commands::Diff { before, after, json } => commands::diff(&before, &after, json),
    }
}
