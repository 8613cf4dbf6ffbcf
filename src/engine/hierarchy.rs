//! Hierarchy builder.
//!
//! Assembles the Level-1 ▸ Level-2 ▸ Level-3 ▸ leaf import rows:
//!
//! ```text
//! Site root                       (Level-1, one per site)
//! ├─ Intake                       (Level-2)
//! │  ├─ leaf assets placed directly under Intake
//! │  └─ Pump Station              (Level-3)
//! │     ├─ PMP101  - Raw Water Pump 1
//! │     └─ PMP102  - Raw Water Pump 2
//! └─ Clarifier
//!    └─ ...
//! ```
//!
//! Emission is depth-first and stable by input order within a level.
//! Intermediate nodes are created once per path, on demand from the leaves
//! that need them — under template filtering this prunes intermediate nodes
//! with no surviving descendants for free.
//!
//! Parent references use backslash-joined paths under the Level-1 root, the
//! convention of the downstream import tool.

use std::collections::BTreeMap;

use serde::Serialize;

use super::matcher::TemplateMatch;
use super::report::RunReport;
use super::table::{AssetRecord, AttributeTable};
use crate::site::SiteConfig;

/// Hierarchy construction mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HierarchyMode {
    /// Emit every placeable asset; the template column stays empty.
    #[default]
    Standard,
    /// Emit only template-matched assets; the template column is populated
    /// and each leaf carries a source-asset-name attribute row.
    TemplateFiltered,
}

/// Row object type understood by the import tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectType {
    Element,
    Attribute,
}

/// One output row. The root row has an empty parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyRow {
    pub parent: String,
    pub name: String,
    pub object_type: ObjectType,
    pub description: String,
    pub security_string: String,
    /// Matched template name; empty outside template-filtered mode.
    pub template: String,
    /// Attribute rows only: the configured value.
    pub value: String,
}

impl HierarchyRow {
    fn element(parent: &str, name: &str, description: &str, security: &str, template: &str) -> Self {
        Self {
            parent: parent.to_string(),
            name: name.to_string(),
            object_type: ObjectType::Element,
            description: description.to_string(),
            security_string: security.to_string(),
            template: template.to_string(),
            value: String::new(),
        }
    }

    fn attribute(parent: &str, name: &str, value: &str) -> Self {
        Self {
            parent: parent.to_string(),
            name: name.to_string(),
            object_type: ObjectType::Attribute,
            description: String::new(),
            security_string: String::new(),
            template: String::new(),
            value: value.to_string(),
        }
    }
}

/// Attribute row name binding a leaf to its source-system asset.
const SOURCE_ASSET_ATTRIBUTE: &str = "SCADA Asset Name";

/// Build the ordered row sequence.
///
/// In [`HierarchyMode::TemplateFiltered`], only assets whose
/// [`TemplateMatch::included`] flag is set become leaves; everything else is
/// pruned along with any intermediate node left childless.
pub fn build_hierarchy(
    table: &AttributeTable,
    matches: &BTreeMap<String, TemplateMatch>,
    site: &SiteConfig,
    mode: HierarchyMode,
    report: &mut RunReport,
) -> Vec<HierarchyRow> {
    // Surviving leaves in input order, grouped by placement. Group keys keep
    // first-seen order; `BTreeMap` would reorder Level-2 names alphabetically.
    let mut level2_order: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<&str, Level2Group<'_>> = BTreeMap::new();

    for record in table.records() {
        // Placeability gate: a leaf always hangs off a Level-2 node.
        let Some(level2) = record.level2.as_deref() else {
            continue;
        };
        let included = matches.get(&record.asset_id).map(|m| m.included).unwrap_or(mode == HierarchyMode::Standard);
        if !included {
            continue;
        }
        if !groups.contains_key(level2) {
            level2_order.push(level2);
        }
        let group = groups.entry(level2).or_default();
        match record.level3.as_deref() {
            None => group.direct.push(record),
            Some(level3) => {
                if !group.level3_order.contains(&level3) {
                    group.level3_order.push(level3);
                }
                group.by_level3.entry(level3).or_default().push(record);
            }
        }
    }

    let security = site.security_string.as_str();
    let mut rows = Vec::new();
    rows.push(HierarchyRow::element("", &site.level1, "", security, ""));

    for level2 in level2_order {
        let group = &groups[level2];
        rows.push(HierarchyRow::element(&site.level1, level2, "", security, ""));
        let level2_path = format!("{}\\{}", site.level1, level2);

        for &record in &group.direct {
            push_leaf(&mut rows, record, &level2_path, matches, mode, security);
        }
        for &level3 in &group.level3_order {
            rows.push(HierarchyRow::element(&level2_path, level3, "", security, ""));
            let level3_path = format!("{level2_path}\\{level3}");
            for &record in &group.by_level3[level3] {
                push_leaf(&mut rows, record, &level3_path, matches, mode, security);
            }
        }
    }

    report.rows_emitted = rows.len();
    rows
}

#[derive(Default)]
struct Level2Group<'a> {
    /// Leaves placed directly under the Level-2 node, input order.
    direct: Vec<&'a AssetRecord>,
    /// First-seen order of Level-3 names under this Level-2.
    level3_order: Vec<&'a str>,
    by_level3: BTreeMap<&'a str, Vec<&'a AssetRecord>>,
}

fn push_leaf(
    rows: &mut Vec<HierarchyRow>,
    record: &AssetRecord,
    parent: &str,
    matches: &BTreeMap<String, TemplateMatch>,
    mode: HierarchyMode,
    security: &str,
) {
    let template = match mode {
        HierarchyMode::Standard => String::new(),
        HierarchyMode::TemplateFiltered => {
            matches.get(&record.asset_id).and_then(|m| m.template.clone()).unwrap_or_default()
        }
    };
    rows.push(HierarchyRow::element(parent, &record.asset_id, &record.display_name, security, &template));

    // Templated leaves carry their source-system asset name so downstream
    // point auto-assignment can find the matching tags.
    if mode == HierarchyMode::TemplateFiltered && !template.is_empty() {
        if let Some(source_name) = record.source_name.as_deref() {
            let leaf_path = format!("{parent}\\{}", record.asset_id);
            rows.push(HierarchyRow::attribute(&leaf_path, SOURCE_ASSET_ATTRIBUTE, source_name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::RunReport;
    use crate::engine::table::{TagRow, build_table};
    use crate::site::SiteEntry;

    fn entry(key: &str, level2: Option<&str>, level3: Option<&str>) -> SiteEntry {
        SiteEntry {
            key: key.into(),
            asset_type: "Motor".into(),
            name: Some(format!("{key} description")),
            source_name: Some(format!("SRC_{key}")),
            level2: level2.map(str::to_string),
            level3: level3.map(str::to_string),
        }
    }

    fn site() -> SiteConfig {
        SiteConfig {
            level1: "Plant".into(),
            security_string: "World:A(r)".into(),
            assets: vec![
                entry("M1", Some("Intake"), Some("Pumps")),
                entry("M2", Some("Intake"), None),
                entry("M3", Some("Treatment"), Some("Filters")),
                entry("M4", None, None),
            ],
        }
    }

    fn table(site: &SiteConfig) -> AttributeTable {
        let rows: Vec<TagRow> = ["M1", "M2", "M3"]
            .iter()
            .map(|id| TagRow { name: format!("TLS_{id}_RUN_CMD"), ..TagRow::default() })
            .collect();
        build_table(&rows, site, &mut RunReport::default())
    }

    fn matches(table: &AttributeTable, included: bool, template: Option<&str>) -> BTreeMap<String, TemplateMatch> {
        table
            .records()
            .iter()
            .map(|r| {
                (r.asset_id.clone(), TemplateMatch { template: template.map(str::to_string), included })
            })
            .collect()
    }

    #[test]
    fn standard_mode_emits_depth_first_with_empty_template() {
        let site = site();
        let table = table(&site);
        let matches = matches(&table, true, None);
        let rows = build_hierarchy(&table, &matches, &site, HierarchyMode::Standard, &mut RunReport::default());

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Plant", "Intake", "M2", "Pumps", "M1", "Treatment", "Filters", "M3"]);
        assert!(rows.iter().all(|r| r.template.is_empty()));
        assert_eq!(rows[0].parent, "");
        let m1 = rows.iter().find(|r| r.name == "M1").unwrap();
        assert_eq!(m1.parent, "Plant\\Intake\\Pumps");
        assert_eq!(m1.description, "M1 description");
        assert_eq!(m1.security_string, "World:A(r)");
    }

    #[test]
    fn filtered_mode_prunes_unmatched_subtrees() {
        let site = site();
        let table = table(&site);
        let mut matches = matches(&table, false, None);
        matches.insert("M1".into(), TemplateMatch { template: Some("Motor".into()), included: true });

        let rows =
            build_hierarchy(&table, &matches, &site, HierarchyMode::TemplateFiltered, &mut RunReport::default());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        // Treatment/Filters disappear entirely; M1 carries its template and a
        // source-asset attribute row.
        assert_eq!(names, vec!["Plant", "Intake", "Pumps", "M1", "SCADA Asset Name"]);
        let m1 = rows.iter().find(|r| r.name == "M1").unwrap();
        assert_eq!(m1.template, "Motor");
        let attr = rows.last().unwrap();
        assert_eq!(attr.object_type, ObjectType::Attribute);
        assert_eq!(attr.parent, "Plant\\Intake\\Pumps\\M1");
        assert_eq!(attr.value, "SRC_M1");
    }

    #[test]
    fn unplaceable_assets_never_reach_the_tree() {
        let site = site();
        // M4 has no Level-2; give it a tag so it lands in the table.
        let rows = vec![TagRow { name: "TLS_M4_RUN_CMD".into(), ..TagRow::default() }];
        let table = build_table(&rows, &site, &mut RunReport::default());
        let matches = matches(&table, true, None);
        let out = build_hierarchy(&table, &matches, &site, HierarchyMode::Standard, &mut RunReport::default());
        assert!(out.iter().all(|r| r.name != "M4"));
    }

    #[test]
    fn intermediate_nodes_are_deduplicated() {
        let site = SiteConfig {
            level1: "Plant".into(),
            security_string: String::new(),
            assets: vec![entry("M1", Some("Intake"), Some("Pumps")), entry("M2", Some("Intake"), Some("Pumps"))],
        };
        let tags: Vec<TagRow> = ["M1", "M2"]
            .iter()
            .map(|id| TagRow { name: format!("TLS_{id}_RUN_CMD"), ..TagRow::default() })
            .collect();
        let table = build_table(&tags, &site, &mut RunReport::default());
        let matches = matches(&table, true, None);
        let rows = build_hierarchy(&table, &matches, &site, HierarchyMode::Standard, &mut RunReport::default());
        assert_eq!(rows.iter().filter(|r| r.name == "Intake").count(), 1);
        assert_eq!(rows.iter().filter(|r| r.name == "Pumps").count(), 1);
    }
}
