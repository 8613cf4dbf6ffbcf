//! Template definitions.
//!
//! An [`AttributeTemplate`] is a named requirement set: the attributes an
//! asset must carry to be classified under the template, plus per-attribute
//! point metadata for downstream auto-assignment. Templates come from two
//! provenances and are interchangeable once loaded:
//!
//! - **Derived** by the coverage analyzer from observed attribute frequency
//!   (`engine/coverage.rs`).
//! - **External** reference definitions: flat rows of element and attribute
//!   entries with `BaseTemplate` inheritance, mirroring an asset-framework
//!   builder export.
//!
//! Ordering is fixed at [`TemplateSet`] construction — descending required
//! count, template name ascending on ties — so matching is reproducible. The
//! set is immutable afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::report::RunReport;

/// Substitution pattern attached to every derived template attribute, used by
/// the downstream point auto-assignment step.
pub const SUBSTITUTION_PATTERN: &str = "<%AssetName%><%@Attribute>";

/// Marker inside an external `AttributeConfigString` that precedes the
/// tag-attribute suffix. Everything after it names the required attribute.
const ASSET_REFERENCE_MARKER: &str = "%@|Site Code%_%@|SCADA Asset Name%";

/// Point data types accepted by the downstream asset framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Float64,
    String,
    DateTime,
}

impl DataType {
    /// Map an observed historian point type onto a framework data type.
    /// Unknown or absent point types default to `Float64`; most engineering
    /// values are floats.
    pub fn from_point_type(point_type: &str) -> DataType {
        match point_type.trim().to_ascii_lowercase().as_str() {
            "digital" | "bool" | "boolean" => DataType::Boolean,
            "int16" | "int32" | "int" | "integer" => DataType::Int32,
            "float" | "float32" | "float64" | "real" | "double" | "single" => DataType::Float64,
            "string" | "text" => DataType::String,
            "datetime" | "timestamp" => DataType::DateTime,
            _ => DataType::Float64,
        }
    }
}

/// One attribute carried by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSpec {
    pub name: String,
    /// Human-readable description, inferred from observed tag descriptions
    /// for derived templates; blank for external definitions.
    pub description: String,
    pub data_type: DataType,
    /// Engineering unit; blank when not inferable.
    pub unit: String,
    pub substitution_pattern: String,
}

/// A named, ranked requirement set.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeTemplate {
    pub name: String,
    /// Human-readable description, inferred from observed tag descriptions
    /// for derived templates; blank for external definitions.
    pub description: String,
    /// Parent template in an inheritance chain; empty for roots and for
    /// derived templates.
    pub base_template: String,
    /// Attribute names (lowercase) an asset must all carry to match.
    pub required: BTreeSet<String>,
    pub attributes: Vec<AttributeSpec>,
}

impl AttributeTemplate {
    pub fn requirement_count(&self) -> usize {
        self.required.len()
    }
}

/// Ordered template collection: most restrictive first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateSet {
    templates: Vec<AttributeTemplate>,
}

impl TemplateSet {
    /// Fix the matching order: descending requirement count, name ascending
    /// on ties. This is the only place ordering is established.
    pub fn new(mut templates: Vec<AttributeTemplate>) -> Self {
        templates.sort_by(|a, b| {
            b.requirement_count().cmp(&a.requirement_count()).then_with(|| a.name.cmp(&b.name))
        });
        Self { templates }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

// --- External definitions ----------------------------------------------------

/// One row of an externally supplied template definition file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateDefRow {
    pub name: String,
    /// Owning element template for attribute rows; empty for element rows.
    #[serde(default)]
    pub parent: String,
    /// `ElementTemplate` or `AttributeTemplate`.
    pub object_type: String,
    #[serde(default)]
    pub base_template: String,
    #[serde(default)]
    pub attribute_config_string: String,
}

/// Build a [`TemplateSet`] from external definition rows.
///
/// Element rows create templates; attribute rows attach one required
/// attribute to their parent template, with the attribute key taken from the
/// config-string suffix after the asset-reference marker (lowercased).
/// `BaseTemplate` chains are resolved recursively, direct attributes
/// overriding inherited ones; cycles terminate at the first revisit.
///
/// A malformed ObjectType/Parent combination rejects that row only: it is
/// logged, counted in the report, and the run continues.
pub fn from_definitions(rows: &[TemplateDefRow], report: &mut RunReport) -> TemplateSet {
    // First pass: element templates with their direct attributes.
    let mut direct: BTreeMap<String, (String, Vec<AttributeSpec>)> = BTreeMap::new();
    for row in rows {
        match row.object_type.as_str() {
            "ElementTemplate" => {
                if !row.parent.is_empty() {
                    warn!(name = %row.name, "element template with a parent; definition rejected");
                    report.definitions_rejected += 1;
                    continue;
                }
                direct.insert(row.name.clone(), (row.base_template.clone(), Vec::new()));
            }
            _ => {}
        }
    }
    for row in rows {
        match row.object_type.as_str() {
            "ElementTemplate" => {}
            "AttributeTemplate" => {
                let Some((_, attrs)) = direct.get_mut(&row.parent) else {
                    warn!(name = %row.name, parent = %row.parent, "attribute template without a known parent; definition rejected");
                    report.definitions_rejected += 1;
                    continue;
                };
                let Some(tag_attribute) = extract_tag_attribute(&row.attribute_config_string) else {
                    // No tag reference in the config string: the attribute is
                    // not tag-backed and places no requirement on assets.
                    continue;
                };
                attrs.push(AttributeSpec {
                    name: tag_attribute,
                    description: String::new(),
                    data_type: DataType::Float64,
                    unit: String::new(),
                    substitution_pattern: row.attribute_config_string.clone(),
                });
            }
            other => {
                warn!(name = %row.name, object_type = %other, "unknown object type; definition rejected");
                report.definitions_rejected += 1;
            }
        }
    }

    // Second pass: resolve inheritance. Direct attributes override inherited
    // ones sharing a name; a template seen twice on one chain stops the walk.
    let mut templates = Vec::with_capacity(direct.len());
    for name in direct.keys() {
        let mut visited = HashSet::new();
        let attributes = collect_attributes(name, &direct, &mut visited);
        let required: BTreeSet<String> = attributes.iter().map(|a| a.name.clone()).collect();
        let base = direct[name].0.clone();
        templates.push(AttributeTemplate {
            name: name.clone(),
            description: String::new(),
            base_template: base,
            required,
            attributes,
        });
    }

    TemplateSet::new(templates)
}

fn collect_attributes(
    name: &str,
    direct: &BTreeMap<String, (String, Vec<AttributeSpec>)>,
    visited: &mut HashSet<String>,
) -> Vec<AttributeSpec> {
    if !visited.insert(name.to_string()) {
        return Vec::new();
    }
    let Some((base, attrs)) = direct.get(name) else {
        return Vec::new();
    };

    let mut all = attrs.clone();
    if !base.is_empty() {
        let seen: HashSet<&str> = all.iter().map(|a| a.name.as_str()).collect();
        let inherited: Vec<AttributeSpec> =
            collect_attributes(base, direct, visited).into_iter().filter(|a| !seen.contains(a.name.as_str())).collect();
        all.extend(inherited);
    }
    all
}

/// Extract the required tag-attribute key from an external config string:
/// the suffix after the asset-reference marker, lowercased, with the
/// delimiter that separates it from the asset reference stripped — the same
/// normalization the tokenizer applies to attribute names.
fn extract_tag_attribute(config: &str) -> Option<String> {
    let (_, suffix) = config.split_once(ASSET_REFERENCE_MARKER)?;
    let suffix = suffix.trim().trim_start_matches('_').to_lowercase();
    if suffix.is_empty() { None } else { Some(suffix) }
}
