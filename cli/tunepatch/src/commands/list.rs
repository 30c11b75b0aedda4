//! `tunepatch list` — show the declarations in the tunables file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tunepatch_core::{Grammar, ParsedLine, TunablesFile};

use crate::manifest::TunepatchManifest;

/// Print every declaration and every malformed declaration candidate.
pub fn run(project_dir: &Path, manifest: &TunepatchManifest, export: Option<&str>) -> Result<()> {
    let path = manifest.tunables_path(project_dir);
    let file = TunablesFile::load(&path).with_context(|| format!("reading {}", path.display()))?;
    let grammar = manifest.grammar();
    let parsed = file.scan(&grammar);

    match export {
        Some("json") => {
            let entries = json_entries(&parsed, &grammar);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Some("text") | None => {
            println!("--- {} ---", path.display());
            let mut count = 0;
            for line in &parsed {
                match line {
                    ParsedLine::Declaration(decl) => {
                        count += 1;
                        println!(
                            "  {:<32} {}",
                            decl.name(),
                            decl.field(grammar.value_index).unwrap_or_default()
                        );
                    }
                    ParsedLine::Malformed(err) => println!("  [skipped] {err}"),
                    ParsedLine::Passthrough => {}
                }
            }
            println!("{count} declaration(s)");
        }
        Some(other) => bail!("unknown export format '{other}' (expected text or json)"),
    }

    Ok(())
}

/// One JSON object per declaration or malformed candidate, in file order.
fn json_entries(parsed: &[ParsedLine], grammar: &Grammar) -> Vec<serde_json::Value> {
    parsed
        .iter()
        .filter_map(|line| match line {
            ParsedLine::Declaration(decl) => Some(serde_json::json!({
                "name": decl.name(),
                "value": decl.field(grammar.value_index),
                "line": decl.line_number,
                "fields": &decl.fields,
            })),
            ParsedLine::Malformed(err) => Some(serde_json::json!({
                "line": err.line_number,
                "error": &err.reason,
            })),
            ParsedLine::Passthrough => None,
        })
        .collect()
}
