//! Tabular manifest of the tiles acquired for one subject.
//!
//! One UTF-8 file per subject, replaced wholesale each acquisition run:
//! a header row followed by one row per successfully processed tile.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::PipelineError;

pub const MANIFEST_HEADER: &str = "id,subject,path_file,url_pic,x,y";

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub id: u32,
    pub subject: String,
    pub path_file: String,
    pub url_pic: String,
    pub x: String,
    pub y: String,
}

pub fn manifest_path(subject_dir: &Path, subject: &str) -> PathBuf {
    subject_dir.join(format!("information_of_{subject}.csv"))
}

/// Writes all records for one run, overwriting any prior manifest.
pub fn write_manifest(path: &Path, records: &[TileRecord]) -> Result<()> {
    let mut contents = String::from(MANIFEST_HEADER);
    contents.push('\n');
    for record in records {
        let fields = [
            record.id.to_string(),
            record.subject.clone(),
            record.path_file.clone(),
            record.url_pic.clone(),
            record.x.clone(),
            record.y.clone(),
        ];
        let row: Vec<String> = fields.iter().map(|field| escape_field(field)).collect();
        contents.push_str(&row.join(","));
        contents.push('\n');
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write manifest {}", path.display()))
}

/// Reads a manifest back. Rejects traversal-like or unreadable paths
/// before touching the filesystem; rows with the wrong field count are
/// dropped.
pub fn read_manifest(path: &Path) -> Result<Vec<TileRecord>, PipelineError> {
    let display = path.display().to_string();
    if display.is_empty() || display.contains("..") {
        return Err(PipelineError::Validation(format!(
            "manifest path '{display}' is not permitted"
        )));
    }
    let contents = fs::read_to_string(path).map_err(|err| {
        PipelineError::Validation(format!("manifest '{display}' is unreadable: {err}"))
    })?;

    let mut records = Vec::new();
    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_row(line);
        if fields.len() != 6 {
            continue;
        }
        let Ok(id) = fields[0].parse::<u32>() else {
            continue;
        };
        records.push(TileRecord {
            id,
            subject: fields[1].clone(),
            path_file: fields[2].clone(),
            url_pic: fields[3].clone(),
            x: fields[4].clone(),
            y: fields[5].clone(),
        });
    }
    Ok(records)
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
