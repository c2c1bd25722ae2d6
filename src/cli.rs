//! Minimal CLI: program manifest(s) → (schema | check)
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use fn_schema::{derive_schema, report, DeriveOptions, Program, SchemaDerivation, SchemaError, DEFAULT_MAX_DEPTH};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive an API schema from the exported functions of type-checked programs
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// more logging (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// derive and print the functions schema plus per-function issues as JSON
    Schema(SchemaOut),
    /// derive and print a readable issue report; fails if any function is unusable
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more program manifests. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// derive this source file instead of the manifest's entry
    #[arg(long)]
    entry: Option<PathBuf>,

    /// nested array/nullable/object levels allowed along one type path
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

type Pass = (String, Result<SchemaDerivation, SchemaError>);

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// One independent derivation pass per manifest, run in parallel.
    fn derive_all(&self) -> Result<Vec<Pass>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let options = DeriveOptions { max_depth: self.max_depth };
        source_paths
            .par_iter()
            .map(|source_path| -> Result<Pass> {
                let source = source_path.to_string_lossy().to_string();
                let program = Program::load(source_path)
                    .with_context(|| format!("failed to load program manifest ({source})"))?;
                let entry = self.entry.clone().unwrap_or_else(|| program.entry().to_path_buf());
                let derivation = derive_schema(&program, &entry, options);
                Ok((source, derivation))
            })
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_logging(&self) {
        let default = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(ExitCode::SUCCESS);
                }

                let mut outputs: IndexMap<String, SchemaDerivation> = IndexMap::new();
                for (source, derivation) in target.input_settings.derive_all()? {
                    let derivation = derivation.with_context(|| format!("failed to derive schema for {source}"))?;
                    outputs.insert(source, derivation);
                }
                let schema_src = serde_json::to_string_pretty(&outputs)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create {}", parent.display()))?;
                    }
                    std::fs::write(out, &schema_src)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{schema_src}");
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Check(target) => {
                let mut failed = false;
                for (source, derivation) in target.input_settings.derive_all()? {
                    match derivation {
                        Ok(derivation) => {
                            failed |= derivation.has_broken_functions();
                            print!("{}", report::render_derivation(&source, &derivation));
                        }
                        Err(error) => {
                            failed = true;
                            print!("{}", report::render_failure(&source, &error));
                        }
                    }
                }
                Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
