mod binding;
mod catalog;
mod commands;
mod config;
mod context;
mod dependency;
mod diagnostics;
mod error;
mod frontend;
mod grammar;
mod hierarchy;
mod imports;
mod logging;
mod naming;
mod resolver;
mod scope;
mod selector;
mod signature;
mod snippet;
mod syntax;
mod template;
mod types;
mod variables;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::commands::{CompleteOptions, Cursor};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "postfixer", version, about = "Postfix code templates for Java expressions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file to use instead of ./.postfixer.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every applicable template at a cursor
    Complete {
        #[command(flatten)]
        cursor: CursorArgs,
        /// Print completion items as JSON
        #[arg(long)]
        json: bool,
        /// Insert the raw snippet form without resolving placeholders
        #[arg(long)]
        lazy: bool,
    },
    /// Show how the expression before the cursor is selected
    Inspect {
        #[command(flatten)]
        cursor: CursorArgs,
    },
    /// List the available templates
    Templates {
        /// Print templates as JSON
        #[arg(long)]
        json: bool,
    },
}

/// A Java file and a cursor inside it, given as a byte offset or a
/// zero-based line and UTF-16 column.
#[derive(Args)]
struct CursorArgs {
    /// Zero-based UTF-16 column (with --line)
    #[arg(long, requires = "line")]
    column: Option<u32>,
    /// Java source file
    file: PathBuf,
    /// Zero-based line (with --column)
    #[arg(long, requires = "column", conflicts_with = "offset")]
    line: Option<u32>,
    /// Byte offset just past the typed `.prefix`
    #[arg(long, required_unless_present = "line")]
    offset: Option<usize>,
}

impl CursorArgs {
    fn cursor(&self) -> Cursor {
        return match (self.offset, self.line, self.column) {
            (Some(offset), _, _) => Cursor::Offset(offset),
            (None, Some(line), Some(column)) => Cursor::LineColumn { column, line },
            // clap requires one of the two forms
            _ => Cursor::Offset(0),
        };
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    return match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Load configuration and dispatch the subcommand.
///
/// # Errors
///
/// Returns any error from configuration loading or the command itself.
fn run(cli: Cli) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root, cli.config.as_deref())?;

    return match cli.command {
        Commands::Complete { cursor, json, lazy } => {
            commands::complete(&config, &cursor.file, cursor.cursor(), CompleteOptions { json, lazy })
        },
        Commands::Inspect { cursor } => commands::inspect(&config, &cursor.file, cursor.cursor()),
        Commands::Templates { json } => commands::templates(&config, json),
    };
}
