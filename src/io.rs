//! Thin I/O wrappers around the engine's inputs and outputs.
//!
//! Nothing in here is algorithmic: delimited tag lists and JSON configuration
//! go in, CSV import rows and JSON template specifications come out. The
//! engine itself never touches the filesystem.
//!
//! Writers are conservative with existing data: overwriting a file first
//! copies it to a timestamped `.backup-…` sibling.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::engine::coverage::{CoverageReport, PresenceMatrix};
use crate::engine::hierarchy::{HierarchyRow, ObjectType};
use crate::engine::table::TagRow;
use crate::error::PipelineError;
use crate::site::SiteConfig;
use crate::templates::TemplateDefRow;

// --- Readers -------------------------------------------------------------------

/// Read the tag snapshot from a delimited text file (comma or tab, detected
/// from the header line). Header names are matched case- and
/// whitespace-insensitively; only `Name` is required.
pub fn read_tag_rows(path: &Path) -> Result<Vec<TagRow>, PipelineError> {
    let text = fs::read_to_string(path).map_err(|source| PipelineError::Read { path: path.to_path_buf(), source })?;
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return Err(PipelineError::MissingColumn("Name"));
    };
    let delimiter = if header_line.contains('\t') { '\t' } else { ',' };

    let header: Vec<String> = split_delimited(header_line, delimiter)
        .iter()
        .map(|h| h.to_lowercase().replace([' ', '_'], ""))
        .collect();
    let column = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));

    let name_col = column(&["name", "tag", "tagname"]).ok_or(PipelineError::MissingColumn("Name"))?;
    let value_col = column(&["value"]);
    let description_col = column(&["description", "desc"]);
    let point_type_col = column(&["pointtype"]);
    let eng_units_col = column(&["engunits", "units"]);

    let pick = |fields: &[String], col: Option<usize>| {
        col.and_then(|c| fields.get(c)).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_delimited(line, delimiter);
        let name = pick(&fields, Some(name_col));
        if name.is_empty() {
            continue;
        }
        rows.push(TagRow {
            name,
            value: pick(&fields, value_col),
            description: pick(&fields, description_col),
            point_type: pick(&fields, point_type_col),
            eng_units: pick(&fields, eng_units_col),
        });
    }
    Ok(rows)
}

/// Read the site configuration (JSON).
pub fn read_site_config(path: &Path) -> Result<SiteConfig, PipelineError> {
    read_json(path)
}

/// Read externally supplied template definition rows (JSON array).
pub fn read_template_definitions(path: &Path) -> Result<Vec<TemplateDefRow>, PipelineError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let text = fs::read_to_string(path).map_err(|source| PipelineError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| PipelineError::Json { path: path.to_path_buf(), source })
}

// --- Writers -------------------------------------------------------------------

/// Write the ordered hierarchy rows as an import CSV.
pub fn write_hierarchy_csv(path: &Path, rows: &[HierarchyRow]) -> Result<(), PipelineError> {
    let mut out = String::from("Selected(x),Parent,Name,ObjectType,Error,Description,SecurityString,Template,Value\n");
    for row in rows {
        let object_type = match row.object_type {
            ObjectType::Element => "Element",
            ObjectType::Attribute => "Attribute",
        };
        let fields = [
            "x",
            row.parent.as_str(),
            row.name.as_str(),
            object_type,
            "",
            row.description.as_str(),
            row.security_string.as_str(),
            row.template.as_str(),
            row.value.as_str(),
        ];
        out.push_str(&fields.map(csv_field).join(","));
        out.push('\n');
    }
    write_with_backup(path, &out)
}

#[derive(Serialize)]
struct SpecDocument<'a> {
    metadata: SpecMetadata,
    templates: Vec<SpecTemplate<'a>>,
}

#[derive(Serialize)]
struct SpecMetadata {
    created_date: String,
    description: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct SpecTemplate<'a> {
    #[serde(flatten)]
    template: &'a crate::templates::AttributeTemplate,
    assets_with_all_attributes: usize,
}

/// Write the derived template specifications as pretty JSON, the handover
/// format consumed by the downstream template-import step.
pub fn write_template_spec(path: &Path, coverage: &CoverageReport) -> Result<(), PipelineError> {
    let doc = SpecDocument {
        metadata: SpecMetadata {
            created_date: Local::now().format("%Y-%m-%d").to_string(),
            description: "Asset framework templates derived from tag coverage analysis",
            version: env!("CARGO_PKG_VERSION"),
        },
        templates: coverage
            .templates
            .iter()
            .map(|t| SpecTemplate {
                template: t,
                assets_with_all_attributes: coverage.full_coverage_counts.get(&t.name).copied().unwrap_or(0),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|source| PipelineError::Json { path: path.to_path_buf(), source })?;
    write_with_backup(path, &json)
}

/// Write one `<type>_attributes_matrix.csv` per analyzed asset type into
/// `dir`, presence marked `yes` in the reference workflow's convention.
pub fn write_presence_matrices(dir: &Path, matrices: &[PresenceMatrix]) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::Write { path: dir.to_path_buf(), source })?;
    for matrix in matrices {
        let file_name = format!("{}_attributes_matrix.csv", matrix.asset_type.replace(' ', "_"));
        let mut out = String::from("Asset");
        for attribute in &matrix.attributes {
            out.push(',');
            out.push_str(&csv_field(attribute));
        }
        out.push('\n');
        for (asset, cells) in matrix.assets.iter().zip(&matrix.cells) {
            out.push_str(&csv_field(asset));
            for &present in cells {
                out.push(',');
                if present {
                    out.push_str("yes");
                }
            }
            out.push('\n');
        }
        write_with_backup(&dir.join(file_name), &out)?;
    }
    Ok(())
}

/// Default timestamped output name, e.g. `hierarchy_20250916_142301.csv`.
pub fn timestamped_name(stem: &str, extension: &str) -> String {
    format!("{stem}_{}.{extension}", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Copy an existing file to a timestamped `.backup-…` sibling before it is
/// overwritten. Returns the backup path when one was made.
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>, PipelineError> {
    if !path.exists() {
        return Ok(None);
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("bak");
    let backup = path.with_file_name(format!(
        "{stem}.backup-{}.{extension}",
        Local::now().format("%Y%m%d-%H%M%S")
    ));
    fs::copy(path, &backup).map_err(|source| PipelineError::Write { path: backup.clone(), source })?;
    info!(backup = %backup.display(), "backed up existing output");
    Ok(Some(backup))
}

fn write_with_backup(path: &Path, contents: &str) -> Result<(), PipelineError> {
    backup_existing(path)?;
    fs::write(path, contents).map_err(|source| PipelineError::Write { path: path.to_path_buf(), source })
}

// --- Delimited-text helpers ------------------------------------------------------

/// Split one delimited line, honoring double-quoted fields with `""` escapes.
fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.is_empty() {
            quoted = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
