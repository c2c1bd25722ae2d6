//! Golden fixture runner.
//!
//! Every `fixtures/<name>.program.json` is derived and compared with
//! `fixtures/<name>.expected.json`. A pass that aborts is compared as
//! `{ "error": "<message>" }`. Set `FN_SCHEMA_BLESS=1` to rewrite expectations.
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{json, Value};

use fn_schema::{derive_schema, DeriveOptions, Program};

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let bless = std::env::var_os("FN_SCHEMA_BLESS").is_some();
    let pattern = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("*.program.json");
    let mut passed = 0usize;
    let mut failed = 0usize;

    for entry in glob::glob(&pattern.to_string_lossy())? {
        let program_path = entry?;
        let name = program_path
            .file_name()
            .map(|n| n.to_string_lossy().replace(".program.json", ""))
            .unwrap_or_default();
        let expected_path = expected_path_for(&program_path);

        let actual = derive_fixture(&program_path)?;
        if bless {
            std::fs::write(&expected_path, serde_json::to_string_pretty(&actual)? + "\n")
                .with_context(|| format!("failed to write {}", expected_path.display()))?;
            println!("{} {name}", "blessed".cyan());
            continue;
        }

        let expected_src = std::fs::read_to_string(&expected_path)
            .with_context(|| format!("missing expectation {}", expected_path.display()))?;
        let expected: Value = serde_json::from_str(&expected_src)
            .with_context(|| format!("invalid JSON in {}", expected_path.display()))?;

        if actual == expected {
            passed += 1;
            println!("{} {name}", "✅".green());
        } else {
            failed += 1;
            println!("{} {name}", "❌".red());
            eprintln!("--- expected\n{}", serde_json::to_string_pretty(&expected)?);
            eprintln!("--- actual\n{}", serde_json::to_string_pretty(&actual)?);
        }
    }

    println!("{passed} passed, {failed} failed");
    Ok(failed == 0)
}

fn expected_path_for(program_path: &Path) -> PathBuf {
    PathBuf::from(program_path.to_string_lossy().replace(".program.json", ".expected.json"))
}

fn derive_fixture(program_path: &Path) -> Result<Value> {
    let program = Program::load(program_path)
        .with_context(|| format!("failed to load {}", program_path.display()))?;
    match derive_schema(&program, program.entry(), DeriveOptions::default()) {
        Ok(derivation) => Ok(serde_json::to_value(&derivation)?),
        Err(error) => Ok(json!({ "error": error.to_string() })),
    }
}
