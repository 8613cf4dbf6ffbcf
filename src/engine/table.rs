//! Attribute table builder.
//!
//! Consumes tokenized tags and aggregates them into one [`AssetRecord`] per
//! asset identifier. The table is built once per run; every downstream stage
//! (coverage, matching, hierarchy) reads it without mutating it.
//!
//! ```text
//! TagRow { name, value, ... }
//!   │ tokenize
//!   v
//! (asset_id, attribute_name, value)
//!   │ merge, keyed by asset_id
//!   v
//! AssetRecord { asset_type, hierarchy placement, attributes }
//! ```
//!
//! Attribute names are case-normalized to lowercase. A repeated attribute
//! name within one asset is resolved last-write-wins: the later tag's value
//! overwrites the earlier one.
//!
//! Malformed tags and assets with no site-configuration entry are logged,
//! counted in the [`RunReport`] and skipped; neither aborts the run. An asset
//! whose entry resolves a type but no Level-2 placement stays in the table
//! (coverage still sees it) but is excluded from tree construction.

use std::collections::BTreeMap;
use std::collections::HashMap;

use tracing::{debug, warn};

use super::report::RunReport;
use super::tokenizer::tokenize;
use crate::site::SiteConfig;

/// One row of the tag source: the raw tag plus its parallel value and
/// point metadata.
#[derive(Debug, Clone, Default)]
pub struct TagRow {
    pub name: String,
    pub value: String,
    pub description: String,
    pub point_type: String,
    pub eng_units: String,
}

/// Observed value and point metadata for one attribute of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub value: String,
    pub description: String,
    pub point_type: String,
    pub eng_units: String,
}

/// Aggregation of every tag sharing one asset identifier.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub asset_id: String,
    /// Categorical label from the site configuration; `None` when the asset
    /// has no entry at all (excluded from both coverage and the tree).
    pub asset_type: Option<String>,
    /// Human-readable name, used as the leaf row description.
    pub display_name: String,
    /// Asset name in the source control system, if known.
    pub source_name: Option<String>,
    pub level2: Option<String>,
    pub level3: Option<String>,
    /// Attribute name (lowercase) to latest observed value. `BTreeMap` keeps
    /// iteration deterministic.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AssetRecord {
    /// Whether the asset can be placed in the import tree.
    pub fn placeable(&self) -> bool {
        self.level2.is_some()
    }
}

/// The in-memory mapping from asset id to record. Records keep the order in
/// which their asset was first seen in the input, which downstream row
/// emission relies on.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    records: Vec<AssetRecord>,
    index: HashMap<String, usize>,
}

impl AttributeTable {
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn get(&self, asset_id: &str) -> Option<&AssetRecord> {
        self.index.get(asset_id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn entry(&mut self, asset_id: &str, site: &crate::site::SiteLookup<'_>, report: &mut RunReport) -> &mut AssetRecord {
        if let Some(&i) = self.index.get(asset_id) {
            return &mut self.records[i];
        }
        let record = match site.resolve(asset_id) {
            Some(entry) => {
                if entry.level2.is_none() {
                    debug!(asset_id, "asset has a type but no hierarchy placement");
                }
                AssetRecord {
                    asset_id: asset_id.to_string(),
                    asset_type: Some(entry.asset_type.clone()),
                    display_name: entry.name.clone().unwrap_or_default(),
                    source_name: entry.source_name.clone(),
                    level2: entry.level2.clone(),
                    level3: entry.level3.clone(),
                    attributes: BTreeMap::new(),
                }
            }
            None => {
                warn!(asset_id, "no site-configuration entry; asset excluded from tree");
                report.assets_unplaced += 1;
                AssetRecord {
                    asset_id: asset_id.to_string(),
                    asset_type: None,
                    display_name: String::new(),
                    source_name: None,
                    level2: None,
                    level3: None,
                    attributes: BTreeMap::new(),
                }
            }
        };
        self.records.push(record);
        self.index.insert(asset_id.to_string(), self.records.len() - 1);
        let i = self.records.len() - 1;
        &mut self.records[i]
    }
}

/// Build the attribute table from the full tag snapshot.
///
/// Tags are processed in input order; duplicate attribute names within an
/// asset resolve last-write-wins.
pub fn build_table(rows: &[TagRow], site: &SiteConfig, report: &mut RunReport) -> AttributeTable {
    let lookup = site.lookup();
    let mut table = AttributeTable::default();

    report.tags_total += rows.len();
    for row in rows {
        let seq = match tokenize(&row.name) {
            Ok(seq) => seq,
            Err(err) => {
                warn!(tag = %row.name, %err, "skipping malformed tag");
                report.tags_malformed += 1;
                continue;
            }
        };

        let asset_id = seq.asset_id();
        let record = table.entry(&asset_id, &lookup, report);
        if let Some(attribute) = seq.attribute_name() {
            record.attributes.insert(
                attribute.to_lowercase(),
                AttributeValue {
                    value: row.value.clone(),
                    description: row.description.clone(),
                    point_type: row.point_type.clone(),
                    eng_units: row.eng_units.clone(),
                },
            );
        }
    }

    report.assets_built = table.len();
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteEntry;

    fn site() -> SiteConfig {
        SiteConfig {
            level1: "Site".into(),
            security_string: String::new(),
            assets: vec![
                SiteEntry {
                    key: "PMP101".into(),
                    asset_type: "Motor".into(),
                    name: Some("Raw Water Pump".into()),
                    source_name: Some("P101".into()),
                    level2: Some("Intake".into()),
                    level3: Some("Pumps".into()),
                },
                SiteEntry {
                    key: "LIT".into(),
                    asset_type: "Analog Sensor".into(),
                    name: None,
                    source_name: None,
                    level2: None,
                    level3: None,
                },
            ],
        }
    }

    fn row(name: &str, value: &str) -> TagRow {
        TagRow { name: name.into(), value: value.into(), ..TagRow::default() }
    }

    #[test]
    fn aggregates_tags_by_asset_id() {
        let rows =
            vec![row("TLS_PMP101_FLOW_PV", "12.5"), row("TLS_PMP101_RUN_CMD", "1"), row("TLS_LIT931_LEVEL_PV", "3.2")];
        let mut report = RunReport::default();
        let table = build_table(&rows, &site(), &mut report);

        assert_eq!(table.len(), 2);
        let pump = table.get("PMP101").unwrap();
        assert_eq!(pump.asset_type.as_deref(), Some("Motor"));
        assert_eq!(pump.attributes.len(), 2);
        assert_eq!(pump.attributes["flow_pv"].value, "12.5");

        // Resolved through the LIT type code: typed but unplaceable.
        let sensor = table.get("LIT931").unwrap();
        assert_eq!(sensor.asset_type.as_deref(), Some("Analog Sensor"));
        assert!(!sensor.placeable());
        assert_eq!(report.assets_unplaced, 0);
    }

    #[test]
    fn duplicate_attribute_names_resolve_last_write_wins() {
        let rows = vec![row("TLS_PMP101_FLOW_PV", "1.0"), row("TLS_PMP101_FLOW_PV", "2.0")];
        let mut report = RunReport::default();
        let table = build_table(&rows, &site(), &mut report);
        assert_eq!(table.get("PMP101").unwrap().attributes["flow_pv"].value, "2.0");
    }

    #[test]
    fn attribute_names_are_lowercased() {
        let rows = vec![row("TLS_PMP101_Flow_PV", "1.0")];
        let mut report = RunReport::default();
        let table = build_table(&rows, &site(), &mut report);
        assert!(table.get("PMP101").unwrap().attributes.contains_key("flow_pv"));
    }

    #[test]
    fn malformed_tags_are_counted_and_skipped() {
        let rows = vec![row("TLS", ""), row("TLS_PMP101_FLOW_PV", "1.0")];
        let mut report = RunReport::default();
        let table = build_table(&rows, &site(), &mut report);
        assert_eq!(report.tags_malformed, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_assets_are_kept_but_unplaced() {
        let rows = vec![row("TLS_XYZ999_FLOW_PV", "1.0")];
        let mut report = RunReport::default();
        let table = build_table(&rows, &site(), &mut report);
        assert_eq!(report.assets_unplaced, 1);
        let record = table.get("XYZ999").unwrap();
        assert_eq!(record.asset_type, None);
        assert!(!record.placeable());
    }

    #[test]
    fn tags_without_interior_tokens_leave_the_attribute_set_empty() {
        let rows = vec![row("TLS_PMP101_RUN", "1")];
        let mut report = RunReport::default();
        let table = build_table(&rows, &site(), &mut report);
        assert!(table.get("PMP101").unwrap().attributes.is_empty());
    }
}
