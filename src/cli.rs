//! Command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! core library functions.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::compiler::Compiler;
use crate::diagnostics::{io_error, YantraError};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "yantra",
    version,
    about = "A compiler from a Clojure-flavored Lisp to JavaScript."
)]
pub struct YantraArgs {
    #[command(subcommand)]
    pub command: ArgsCommand,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum ArgsCommand {
    /// Full pipeline: read, expand, analyze, and emit JavaScript.
    Compile {
        /// The path to the source file to compile.
        #[arg(required = true)]
        file: PathBuf,
        /// Write the program here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the fully macro-expanded forms.
    Expand {
        /// The path to the source file to expand.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Show the analyzed AST as JSON.
    Ast {
        /// The path to the source file to analyze.
        #[arg(required = true)]
        file: PathBuf,
    },
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

/// Dispatches a parsed CLI invocation.
pub fn run(args: YantraArgs) -> Result<(), YantraError> {
    match args.command {
        ArgsCommand::Compile { file, output } => compile_command(&file, output.as_deref()),
        ArgsCommand::Expand { file } => expand_command(&file),
        ArgsCommand::Ast { file } => ast_command(&file),
    }
}

fn compile_command(file: &Path, output: Option<&Path>) -> Result<(), YantraError> {
    let (name, text) = read_source(file)?;
    let mut compiler = Compiler::new();
    let program = compiler.compile_source(&name, &text)?;
    match output {
        Some(path) => fs::write(path, program + "\n")
            .map_err(|e| io_error(format!("Failed to write {}: {}", path.display(), e)))?,
        None => println!("{}", program),
    }
    Ok(())
}

fn expand_command(file: &Path) -> Result<(), YantraError> {
    let (name, text) = read_source(file)?;
    let compiler = Compiler::new();
    let source = crate::diagnostics::to_error_source(&name, &text);
    let forms = crate::syntax::parse(&text).map_err(|e| e.with_source(&source))?;
    for form in &forms {
        let expanded = compiler
            .expand_form(form)
            .map_err(|e| e.with_source(&source))?;
        println!("{}", expanded.pretty());
    }
    Ok(())
}

fn ast_command(file: &Path) -> Result<(), YantraError> {
    let (name, text) = read_source(file)?;
    let mut compiler = Compiler::new();
    let nodes = compiler.analyze_source(&name, &text)?;
    let rendered = serde_json::to_string_pretty(&nodes)
        .map_err(|e| io_error(format!("Failed to render AST: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

fn read_source(file: &Path) -> Result<(String, String), YantraError> {
    let text = fs::read_to_string(file)
        .map_err(|e| io_error(format!("Failed to read {}: {}", file.display(), e)))?;
    Ok((file.display().to_string(), text))
}
