//! Human-readable issue reports for the terminal.

use std::fmt::Write;
use colored::Colorize;

use crate::error::SchemaError;
use crate::schema::SchemaDerivation;

pub fn render_derivation(source: &str, derivation: &SchemaDerivation) -> String {
    let mut out = String::new();
    let usable = derivation.schema.functions.len();
    let broken = derivation.broken_functions().count();
    let _ = writeln!(
        out,
        "{} {source}: {usable} usable function(s), {broken} unusable, {} object type(s)",
        if broken == 0 { "✔".green() } else { "✘".red() },
        derivation.schema.object_types.len(),
    );
    for (name, issues) in &derivation.issues {
        let unusable = !derivation.schema.functions.contains_key(name);
        let header = if unusable {
            format!("function '{name}' cannot be exposed:").red().bold()
        } else {
            format!("function '{name}' has warnings:").yellow()
        };
        let _ = writeln!(out, "  {header}");
        for issue in issues {
            let _ = writeln!(out, "    - {issue}");
        }
    }
    out
}

pub fn render_failure(source: &str, error: &SchemaError) -> String {
    let label = if error.is_internal() { "internal error" } else { "aborted" };
    format!("{} {source}: {}: {error}\n", "✘".red(), label.red().bold())
}
