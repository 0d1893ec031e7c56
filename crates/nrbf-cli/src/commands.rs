//! Command handlers for the `nrbf` binary.
//!
//! Each handler reads the whole file, works on the decoded document,
//! and prints to stdout. Edits write back in place, with a `.bak`
//! sibling copy unless the caller opts out.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use nrbf::{Document, NrbfError};

fn load_file(path: &Path) -> Result<Document> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if !nrbf::is_nrbf(&bytes) {
        bail!("{} does not look like an NRBF stream", path.display());
    }
    nrbf::load(&bytes).with_context(|| format!("Failed to decode {}", path.display()))
}

pub fn inspect(input: &Path, json: bool) -> Result<()> {
    let doc = load_file(input)?;
    let stats = doc.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let header = doc.header();
    println!("=== {} ===", input.display());
    println!("Root id: {}", header.root_id);
    println!(
        "Format version: {}.{}",
        header.major_version, header.minor_version
    );
    println!();
    println!("Records: {}", stats.records);
    println!("  classes:    {}", stats.classes);
    println!("  strings:    {}", stats.strings);
    println!("  arrays:     {}", stats.arrays);
    println!("  libraries:  {}", stats.libraries);
    println!("References: {}", stats.references);
    println!("Primitive values: {}", stats.primitive_values);
    println!("Null values: {}", stats.null_values);

    let file_size = fs::metadata(input)?.len();
    println!("\nFile size: {} bytes", file_size);
    Ok(())
}

pub fn paths(input: &Path) -> Result<()> {
    let doc = load_file(input)?;
    for (path, value) in doc.iter() {
        println!("{} = {}", path, doc.value_text(&value));
    }
    Ok(())
}

pub fn get(input: &Path, query: &str) -> Result<()> {
    let doc = load_file(input)?;
    match doc.get(query) {
        Some(value) => {
            println!("{}", doc.value_text(&value));
            Ok(())
        }
        None => bail!("No value at {query}"),
    }
}

/// Shared flow for the mutating subcommands: decode, apply, back up,
/// write. The edit itself is all-or-nothing, so a failure leaves the
/// file untouched.
pub fn edit(
    input: &Path,
    no_backup: bool,
    apply: impl FnOnce(&mut Document) -> std::result::Result<(), NrbfError>,
) -> Result<()> {
    let mut doc = load_file(input)?;
    apply(&mut doc).with_context(|| format!("Failed to edit {}", input.display()))?;
    let bytes = doc
        .save()
        .with_context(|| format!("Failed to re-encode {}", input.display()))?;

    if !no_backup {
        let backup = input.with_extension("bak");
        fs::copy(input, &backup)
            .with_context(|| format!("Failed to back up to {}", backup.display()))?;
    }
    fs::write(input, bytes).with_context(|| format!("Failed to write {}", input.display()))?;
    println!("Updated {}", input.display());
    Ok(())
}

pub fn diff(before: &Path, after: &Path, json: bool) -> Result<()> {
    let doc_a = load_file(before)?;
    let doc_b = load_file(after)?;
    let changes = nrbf::diff(&doc_a, &doc_b);

    if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
        return Ok(());
    }

    if changes.is_empty() {
        println!("No differences");
        return Ok(());
    }
    for change in &changes {
        match change.kind {
            nrbf::ChangeKind::Modified => println!(
                "~ {}: {} -> {}",
                change.path,
                change.old.as_deref().unwrap_or(""),
                change.new.as_deref().unwrap_or("")
            ),
            nrbf::ChangeKind::Added => println!(
                "+ {}: {}",
                change.path,
                change.new.as_deref().unwrap_or("")
            ),
            nrbf::ChangeKind::Removed => println!(
                "- {}: {}",
                change.path,
                change.old.as_deref().unwrap_or("")
            ),
        }
    }
    Ok(())
}
