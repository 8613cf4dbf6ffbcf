//! Attribute-coverage analysis.
//!
//! Offline stage that consumes the attribute table grouped by asset type and
//! answers: *which attributes are characteristic of this type?*
//!
//! ```text
//! coverage(type, attribute) = assets of `type` carrying `attribute`
//!                             ─────────────────────────────────────
//!                                   total assets of `type`
//! ```
//!
//! Attributes whose coverage strictly exceeds the threshold (0.70 by default)
//! become the derived template's required set for the type. Assets of the
//! type lacking the attribute count toward the denominator but not the
//! numerator.
//!
//! The analyzer also emits advisory output that the matcher never consumes:
//! pairwise Jaccard similarity between the derived required sets (surfaces
//! near-duplicate templates for manual review) and per-type asset-attribute
//! presence matrices.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use super::table::AttributeTable;
use crate::templates::{AttributeSpec, AttributeTemplate, DataType, SUBSTITUTION_PATTERN, TemplateSet};

/// Tuning knobs for the analyzer. Defaults mirror the reference workflow.
#[derive(Debug, Clone)]
pub struct CoverageOptions {
    /// An attribute is characteristic of a type when its coverage is
    /// strictly greater than this.
    pub threshold: f64,
    /// Types with fewer assets than this are skipped; frequencies over one
    /// or two assets say nothing.
    pub min_assets: usize,
    /// Similarity pairs at or below this Jaccard index are not reported.
    pub similarity_threshold: f64,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self { threshold: 0.70, min_assets: 3, similarity_threshold: 0.70 }
    }
}

/// Presence frequency of one attribute within one asset type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageStat {
    pub asset_type: String,
    pub attribute: String,
    pub present: usize,
    pub total: usize,
    pub coverage: f64,
}

/// Advisory near-duplicate report between two derived required sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSimilarity {
    pub left: String,
    pub right: String,
    pub shared: usize,
    pub union: usize,
    pub jaccard: f64,
}

/// Asset × attribute presence matrix for one type. Required attributes come
/// first, then the remainder by descending coverage.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceMatrix {
    pub asset_type: String,
    pub attributes: Vec<String>,
    pub assets: Vec<String>,
    pub cells: Vec<Vec<bool>>,
}

/// Full analyzer output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    /// Derived templates, most restrictive first.
    pub templates: TemplateSet,
    /// Every (type, attribute) frequency observed, ordered by type then
    /// descending coverage.
    pub statistics: Vec<CoverageStat>,
    /// Advisory: pairs of types whose required sets overlap strongly.
    pub similarity: Vec<TypeSimilarity>,
    /// Advisory: per-type presence matrices.
    pub matrices: Vec<PresenceMatrix>,
    /// Per type: how many of its assets satisfy the whole required set.
    pub full_coverage_counts: BTreeMap<String, usize>,
}

/// Analyze the table and derive one template per qualifying asset type.
///
/// Deterministic: output template ordering is descending requirement count,
/// tie-broken by type name ascending; all internal groupings use ordered maps.
pub fn analyze(table: &AttributeTable, options: &CoverageOptions) -> CoverageReport {
    // Group record indices by asset type; untyped records cannot be analyzed.
    let mut by_type: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, record) in table.records().iter().enumerate() {
        if let Some(asset_type) = record.asset_type.as_deref() {
            by_type.entry(asset_type).or_default().push(i);
        }
    }

    let mut report = CoverageReport::default();
    let mut templates = Vec::new();
    let mut required_sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (&asset_type, indices) in &by_type {
        let total = indices.len();
        if total < options.min_assets {
            debug!(asset_type, total, "too few assets for coverage analysis");
            continue;
        }

        // Distinct-asset presence counts per attribute.
        let mut present: BTreeMap<&str, usize> = BTreeMap::new();
        for &i in indices {
            for name in table.records()[i].attributes.keys() {
                *present.entry(name.as_str()).or_default() += 1;
            }
        }

        // Descending coverage, attribute name ascending on ties.
        let mut ranked: Vec<(&str, usize)> = present.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        for &(attribute, count) in &ranked {
            report.statistics.push(CoverageStat {
                asset_type: asset_type.to_string(),
                attribute: attribute.to_string(),
                present: count,
                total,
                coverage: count as f64 / total as f64,
            });
        }

        let required: Vec<&str> =
            ranked.iter().filter(|&&(_, count)| count as f64 / total as f64 > options.threshold).map(|&(a, _)| a).collect();
        if required.is_empty() {
            continue;
        }

        // Assets of the type carrying the whole required set.
        let satisfied = indices
            .iter()
            .filter(|&&i| {
                let attrs = &table.records()[i].attributes;
                required.iter().all(|r| attrs.contains_key(*r))
            })
            .count();
        report.full_coverage_counts.insert(asset_type.to_string(), satisfied);

        report.matrices.push(presence_matrix(table, asset_type, indices, &ranked, &required));

        templates.push(AttributeTemplate {
            name: asset_type.to_string(),
            description: type_description(table, indices),
            base_template: String::new(),
            required: required.iter().map(|r| r.to_string()).collect(),
            attributes: required.iter().map(|&r| attribute_spec(table, indices, r)).collect(),
        });
        required_sets.insert(asset_type.to_string(), required.iter().map(|r| r.to_string()).collect());
    }

    report.similarity = similarity_pairs(&required_sets, options.similarity_threshold);
    report.templates = TemplateSet::new(templates);
    report
}

/// Majority-vote metadata for one required attribute: data type over observed
/// point types, unit over observed engineering units (blank when none),
/// description over observed tag descriptions.
fn attribute_spec(table: &AttributeTable, indices: &[usize], attribute: &str) -> AttributeSpec {
    let mut type_votes: BTreeMap<DataType, usize> = BTreeMap::new();
    let mut unit_votes: BTreeMap<&str, usize> = BTreeMap::new();
    let mut desc_votes: BTreeMap<&str, usize> = BTreeMap::new();
    for &i in indices {
        let Some(value) = table.records()[i].attributes.get(attribute) else { continue };
        if !value.point_type.trim().is_empty() {
            *type_votes.entry(DataType::from_point_type(&value.point_type)).or_default() += 1;
        }
        if !value.eng_units.trim().is_empty() {
            *unit_votes.entry(value.eng_units.trim()).or_default() += 1;
        }
        if !value.description.trim().is_empty() {
            *desc_votes.entry(value.description.trim()).or_default() += 1;
        }
    }

    let data_type = type_votes.into_iter().max_by_key(|&(_, count)| count).map(|(t, _)| t).unwrap_or(DataType::Float64);
    let unit = unit_votes.into_iter().max_by_key(|&(_, count)| count).map(|(u, _)| u.to_string()).unwrap_or_default();
    let description = desc_votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d.to_string())
        .unwrap_or_else(|| format!("{attribute} attribute"));

    AttributeSpec {
        name: attribute.to_string(),
        description,
        data_type,
        unit,
        substitution_pattern: SUBSTITUTION_PATTERN.to_string(),
    }
}

/// Template description for one asset type: the most common tag description
/// observed across the type's assets, with the leading asset identifier
/// (for example `PMP101 `) stripped so per-asset variants vote together.
fn type_description(table: &AttributeTable, indices: &[usize]) -> String {
    let mut votes: BTreeMap<String, usize> = BTreeMap::new();
    for &i in indices {
        for value in table.records()[i].attributes.values() {
            let desc = value.description.trim();
            if desc.is_empty() {
                continue;
            }
            let cleaned = regex!(r"^[A-Z]+[0-9]+[A-Z]*\s+").replace(desc, "").trim().to_string();
            if !cleaned.is_empty() {
                *votes.entry(cleaned).or_default() += 1;
            }
        }
    }
    votes
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or_else(|| "Asset template".to_string())
}

fn presence_matrix(
    table: &AttributeTable,
    asset_type: &str,
    indices: &[usize],
    ranked: &[(&str, usize)],
    required: &[&str],
) -> PresenceMatrix {
    // Required first, then the rest in ranked order.
    let mut attributes: Vec<String> = required.iter().map(|r| r.to_string()).collect();
    attributes.extend(ranked.iter().filter(|(a, _)| !required.contains(a)).map(|(a, _)| a.to_string()));

    let mut records: Vec<&super::table::AssetRecord> = indices.iter().map(|&i| &table.records()[i]).collect();
    records.sort_unstable_by(|a, b| a.asset_id.cmp(&b.asset_id));

    let cells = records
        .iter()
        .map(|record| attributes.iter().map(|a| record.attributes.contains_key(a)).collect())
        .collect();

    PresenceMatrix {
        asset_type: asset_type.to_string(),
        attributes,
        assets: records.into_iter().map(|r| r.asset_id.clone()).collect(),
        cells,
    }
}

fn similarity_pairs(sets: &BTreeMap<String, BTreeSet<String>>, threshold: f64) -> Vec<TypeSimilarity> {
    let names: Vec<&String> = sets.keys().collect();
    let mut pairs = Vec::new();
    for i in 0..names.len() {
        for j in i + 1..names.len() {
            let (left, right) = (&sets[names[i]], &sets[names[j]]);
            let shared = left.intersection(right).count();
            let union = left.union(right).count();
            if union == 0 {
                continue;
            }
            let jaccard = shared as f64 / union as f64;
            if jaccard > threshold {
                pairs.push(TypeSimilarity {
                    left: names[i].clone(),
                    right: names[j].clone(),
                    shared,
                    union,
                    jaccard,
                });
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::RunReport;
    use crate::engine::table::{TagRow, build_table};
    use crate::site::{SiteConfig, SiteEntry};

    fn entry(key: &str, asset_type: &str) -> SiteEntry {
        SiteEntry {
            key: key.into(),
            asset_type: asset_type.into(),
            name: None,
            source_name: None,
            level2: Some("Area".into()),
            level3: None,
        }
    }

    /// 10 motors; "pressure" on 8 of them (0.8 > 0.7), "torque" on 6 (0.6).
    fn motor_table() -> AttributeTable {
        let mut rows = Vec::new();
        let mut entries = Vec::new();
        for n in 0..10 {
            let id = format!("M{n:02}");
            entries.push(entry(&id, "Motor"));
            rows.push(TagRow { name: format!("TLS_{id}_RUN_CMD"), ..TagRow::default() });
            if n < 8 {
                rows.push(TagRow {
                    name: format!("TLS_{id}_PRESSURE_PV"),
                    description: "Discharge Pressure".into(),
                    point_type: "float".into(),
                    eng_units: "kPa".into(),
                    ..TagRow::default()
                });
            }
            if n < 6 {
                rows.push(TagRow { name: format!("TLS_{id}_TORQUE_PV"), ..TagRow::default() });
            }
        }
        let site = SiteConfig { level1: "Site".into(), security_string: String::new(), assets: entries };
        build_table(&rows, &site, &mut RunReport::default())
    }

    #[test]
    fn threshold_is_strict_at_0_70() {
        let table = motor_table();
        let report = analyze(&table, &CoverageOptions::default());

        let motor = report.templates.iter().find(|t| t.name == "Motor").unwrap();
        assert!(motor.required.contains("pressure_pv"));
        assert!(motor.required.contains("run_cmd"));
        assert!(!motor.required.contains("torque_pv"));

        let pressure = report
            .statistics
            .iter()
            .find(|s| s.asset_type == "Motor" && s.attribute == "pressure_pv")
            .unwrap();
        assert_eq!(pressure.present, 8);
        assert_eq!(pressure.total, 10);
        assert!((pressure.coverage - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn metadata_comes_from_majority_vote() {
        let table = motor_table();
        let report = analyze(&table, &CoverageOptions::default());
        let motor = report.templates.iter().find(|t| t.name == "Motor").unwrap();
        let pressure = motor.attributes.iter().find(|a| a.name == "pressure_pv").unwrap();
        assert_eq!(pressure.data_type, DataType::Float64);
        assert_eq!(pressure.unit, "kPa");
        assert_eq!(pressure.description, "Discharge Pressure");
        assert_eq!(pressure.substitution_pattern, SUBSTITUTION_PATTERN);
        // No point type or description observed for run_cmd: defaults apply.
        let run = motor.attributes.iter().find(|a| a.name == "run_cmd").unwrap();
        assert_eq!(run.data_type, DataType::Float64);
        assert_eq!(run.unit, "");
        assert_eq!(run.description, "run_cmd attribute");
        // The template-level description votes over all observed descriptions.
        assert_eq!(motor.description, "Discharge Pressure");
    }

    #[test]
    fn template_description_drops_leading_asset_identifiers() {
        let mut rows = Vec::new();
        let mut entries = Vec::new();
        for id in ["M1", "M2", "M3"] {
            entries.push(entry(id, "Motor"));
            rows.push(TagRow {
                name: format!("TLS_{id}_RUN_CMD"),
                description: format!("{id} Motor Starter"),
                ..TagRow::default()
            });
        }
        let site = SiteConfig { level1: "Site".into(), security_string: String::new(), assets: entries };
        let table = build_table(&rows, &site, &mut RunReport::default());

        let report = analyze(&table, &CoverageOptions::default());
        let motor = report.templates.iter().find(|t| t.name == "Motor").unwrap();
        // "M1 Motor Starter" / "M2 ..." / "M3 ..." all vote as one pattern.
        assert_eq!(motor.description, "Motor Starter");
    }

    #[test]
    fn small_types_are_skipped() {
        let rows = vec![
            TagRow { name: "TLS_V01_POS_PV".into(), ..TagRow::default() },
            TagRow { name: "TLS_V02_POS_PV".into(), ..TagRow::default() },
        ];
        let site = SiteConfig {
            level1: "Site".into(),
            security_string: String::new(),
            assets: vec![entry("V01", "Valve"), entry("V02", "Valve")],
        };
        let table = build_table(&rows, &site, &mut RunReport::default());
        let report = analyze(&table, &CoverageOptions::default());
        assert!(report.templates.is_empty());
    }

    #[test]
    fn full_coverage_counts_assets_with_the_whole_required_set() {
        let table = motor_table();
        let report = analyze(&table, &CoverageOptions::default());
        // Required = {run_cmd (10/10), pressure_pv (8/10)}: 8 assets have both.
        assert_eq!(report.full_coverage_counts["Motor"], 8);
    }

    #[test]
    fn matrix_lists_required_attributes_first() {
        let table = motor_table();
        let report = analyze(&table, &CoverageOptions::default());
        let matrix = &report.matrices[0];
        assert_eq!(matrix.asset_type, "Motor");
        assert_eq!(matrix.attributes, vec!["run_cmd", "pressure_pv", "torque_pv"]);
        assert_eq!(matrix.assets.len(), 10);
        // M00 carries all three attributes.
        assert_eq!(matrix.cells[0], vec![true, true, true]);
        // M09 only carries run_cmd.
        assert_eq!(matrix.cells[9], vec![true, false, false]);
    }

    #[test]
    fn near_duplicate_types_are_surfaced() {
        let mut sets = BTreeMap::new();
        sets.insert("A".to_string(), BTreeSet::from(["x".to_string(), "y".to_string(), "z".to_string()]));
        sets.insert("B".to_string(), BTreeSet::from(["x".to_string(), "y".to_string(), "z".to_string()]));
        sets.insert("C".to_string(), BTreeSet::from(["q".to_string()]));
        let pairs = similarity_pairs(&sets, 0.70);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].left.as_str(), pairs[0].right.as_str()), ("A", "B"));
        assert!((pairs[0].jaccard - 1.0).abs() < f64::EPSILON);
    }
}
