//! Template matching.
//!
//! Greedy, most-restrictive-first, first-match-wins:
//!
//! ```text
//! templates (fixed order: |required| desc, name asc)
//!    │
//!    ├─ T1 required ⊆ asset attributes ?  ──yes──▶ match = T1, stop
//!    ├─ T2 ...
//!    └─ none matched ──▶ unmatched (a counted outcome, not an error)
//! ```
//!
//! Most-restrictive-first privileges specificity over declaration order: a
//! broadly defined template cannot steal an asset that also satisfies a
//! stricter one. Templates with an empty required set never match anything.
//!
//! Matching is pure and idempotent: the same record and the same set always
//! produce the same result.

use std::collections::{BTreeMap, HashSet};

use super::hierarchy::HierarchyMode;
use super::report::RunReport;
use super::table::{AssetRecord, AttributeTable};
use crate::templates::TemplateSet;

/// Outcome of matching one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Name of the first (most restrictive) satisfied template; `None` when
    /// the asset satisfies none.
    pub template: Option<String>,
    /// Whether the hierarchy builder keeps the asset as a leaf. Always true
    /// in standard mode; tied to a successful match in filtered mode.
    pub included: bool,
}

/// Match a single asset against the ordered template set.
pub fn match_asset(record: &AssetRecord, templates: &TemplateSet, mode: HierarchyMode) -> TemplateMatch {
    // Comparison-insensitive form. Table attributes are already lowercased;
    // normalizing again keeps the function correct for hand-built records.
    let present: HashSet<String> = record.attributes.keys().map(|k| k.to_lowercase()).collect();

    let matched = templates
        .iter()
        .filter(|t| !t.required.is_empty())
        .find(|t| t.required.iter().all(|r| present.contains(r)))
        .map(|t| t.name.clone());

    let included = matched.is_some() || mode == HierarchyMode::Standard;
    TemplateMatch { template: matched, included }
}

/// Match every asset in the table; results keyed by asset id.
pub fn match_all(
    table: &AttributeTable,
    templates: &TemplateSet,
    mode: HierarchyMode,
    report: &mut RunReport,
) -> BTreeMap<String, TemplateMatch> {
    let mut matches = BTreeMap::new();
    for record in table.records() {
        let result = match_asset(record, templates, mode);
        match result.template {
            Some(_) => report.assets_matched += 1,
            None => report.assets_unmatched += 1,
        }
        matches.insert(record.asset_id.clone(), result);
    }
    matches
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::templates::AttributeTemplate;

    fn template(name: &str, required: &[&str]) -> AttributeTemplate {
        AttributeTemplate {
            name: name.into(),
            description: String::new(),
            base_template: String::new(),
            required: required.iter().map(|r| r.to_string()).collect(),
            attributes: Vec::new(),
        }
    }

    fn record(attributes: &[&str]) -> AssetRecord {
        AssetRecord {
            asset_id: "PMP101".into(),
            asset_type: Some("Motor".into()),
            display_name: String::new(),
            source_name: None,
            level2: Some("Area".into()),
            level3: None,
            attributes: attributes
                .iter()
                .map(|a| {
                    (
                        a.to_string(),
                        crate::engine::table::AttributeValue {
                            value: String::new(),
                            description: String::new(),
                            point_type: String::new(),
                            eng_units: String::new(),
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn most_restrictive_template_wins() {
        // T2's requirements are a subset of T1's; an asset satisfying both
        // must land on T1.
        let set = TemplateSet::new(vec![
            template("T2", &["run", "fault"]),
            template("T1", &["run", "fault", "speed"]),
        ]);
        let asset = record(&["run", "fault", "speed", "extra"]);
        let result = match_asset(&asset, &set, HierarchyMode::TemplateFiltered);
        assert_eq!(result.template.as_deref(), Some("T1"));
        assert!(result.included);
    }

    #[test]
    fn equal_size_ties_break_by_name_ascending() {
        let set = TemplateSet::new(vec![template("Zeta", &["run"]), template("Alpha", &["run"])]);
        let result = match_asset(&record(&["run"]), &set, HierarchyMode::Standard);
        assert_eq!(result.template.as_deref(), Some("Alpha"));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let set = TemplateSet::new(vec![template("T", &["run_cmd"])]);
        let mut asset = record(&[]);
        asset.attributes.insert(
            "RUN_CMD".into(),
            crate::engine::table::AttributeValue {
                value: String::new(),
                description: String::new(),
                point_type: String::new(),
                eng_units: String::new(),
            },
        );
        assert_eq!(match_asset(&asset, &set, HierarchyMode::Standard).template.as_deref(), Some("T"));
    }

    #[test]
    fn unmatched_assets_follow_the_mode() {
        let set = TemplateSet::new(vec![template("T", &["missing"])]);
        let asset = record(&["run"]);

        let filtered = match_asset(&asset, &set, HierarchyMode::TemplateFiltered);
        assert_eq!(filtered.template, None);
        assert!(!filtered.included);

        let standard = match_asset(&asset, &set, HierarchyMode::Standard);
        assert_eq!(standard.template, None);
        assert!(standard.included);
    }

    #[test]
    fn empty_required_sets_never_match() {
        let set = TemplateSet::new(vec![template("Hollow", &[])]);
        assert_eq!(match_asset(&record(&["run"]), &set, HierarchyMode::Standard).template, None);
    }

    #[test]
    fn matching_is_idempotent() {
        let set = TemplateSet::new(vec![template("T", &["run"])]);
        let asset = record(&["run"]);
        let first = match_asset(&asset, &set, HierarchyMode::TemplateFiltered);
        let second = match_asset(&asset, &set, HierarchyMode::TemplateFiltered);
        assert_eq!(first, second);
    }
}
