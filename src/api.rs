//! Public surface of the pipeline.
//!
//! [`run`] wires the engine stages together for the common case: one complete
//! tag snapshot in, hierarchy rows plus template specifications out. Callers
//! needing only part of the pipeline can use the stage functions re-exported
//! from the crate root (`tokenize`, `build_table`, `analyze`, `match_all`,
//! `build_hierarchy`) directly.

use std::collections::BTreeMap;

use tracing::debug;

use crate::engine::coverage::{CoverageOptions, CoverageReport, analyze};
use crate::engine::hierarchy::{HierarchyMode, HierarchyRow, build_hierarchy};
use crate::engine::matcher::{TemplateMatch, match_all};
use crate::engine::report::RunReport;
use crate::engine::table::{AttributeTable, TagRow, build_table};
use crate::error::PipelineError;
use crate::site::SiteConfig;
use crate::templates::{TemplateDefRow, TemplateSet, from_definitions};

/// Options for a full pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Hierarchy construction mode; standard mode keeps every placeable
    /// asset regardless of matching.
    pub mode: HierarchyMode,
    pub coverage: CoverageOptions,
}

/// Everything one run produces. Valid only as a whole: a failed run returns
/// an error and writes nothing.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Ordered import rows.
    pub rows: Vec<HierarchyRow>,
    /// Coverage statistics and derived templates (advisory when external
    /// definitions drive the matching).
    pub coverage: CoverageReport,
    /// Per-asset match results, keyed by asset id.
    pub matches: BTreeMap<String, TemplateMatch>,
    /// The aggregated attribute table.
    pub table: AttributeTable,
    /// Skip/match counters for the summary report.
    pub report: RunReport,
}

/// Run the full pipeline over one input snapshot.
///
/// Matching uses the externally supplied template definitions when given,
/// otherwise the templates derived by coverage analysis. Per-record problems
/// (malformed tags, unplaceable assets, rejected definitions) are counted in
/// the outcome's report and never abort the run; empty input or an unusable
/// configuration does.
///
/// # Example
/// ```
/// use tagtree::{RunOptions, SiteConfig, SiteEntry, TagRow, run};
///
/// let tags = vec![TagRow { name: "TLS_PMP101_FLOW_PV".into(), ..TagRow::default() }];
/// let site = SiteConfig {
///     level1: "Plant".into(),
///     security_string: String::new(),
///     assets: vec![SiteEntry {
///         key: "PMP101".into(),
///         asset_type: "Motor".into(),
///         name: None,
///         source_name: None,
///         level2: Some("Intake".into()),
///         level3: None,
///     }],
/// };
/// let outcome = run(&tags, &site, None, &RunOptions::default()).unwrap();
/// assert_eq!(outcome.report.assets_built, 1);
/// assert_eq!(outcome.rows.len(), 3); // root, Intake, PMP101
/// ```
pub fn run(
    tags: &[TagRow],
    site: &SiteConfig,
    external: Option<&[TemplateDefRow]>,
    options: &RunOptions,
) -> Result<RunOutcome, PipelineError> {
    if tags.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    if site.assets.is_empty() {
        return Err(PipelineError::EmptySiteConfig);
    }

    let mut report = RunReport::default();
    let table = build_table(tags, site, &mut report);
    let coverage = analyze(&table, &options.coverage);

    let templates: TemplateSet = match external {
        Some(rows) => {
            let set = from_definitions(rows, &mut report);
            if set.is_empty() {
                return Err(PipelineError::NoUsableTemplates);
            }
            debug!(count = set.len(), "matching against external template definitions");
            set
        }
        None => {
            debug!(count = coverage.templates.len(), "matching against derived templates");
            coverage.templates.clone()
        }
    };

    let matches = match_all(&table, &templates, options.mode, &mut report);
    let rows = build_hierarchy(&table, &matches, site, options.mode, &mut report);

    Ok(RunOutcome { rows, coverage, matches, table, report })
}
