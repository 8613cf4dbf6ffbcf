//! Run summary counters.
//!
//! Every run produces a [`RunReport`] alongside its output: per-record
//! failures are skipped, never fatal, and this is where they become visible.
//! The CLI prints the report after every run; library callers get it on the
//! run outcome.

use std::fmt;

use serde::Serialize;

/// Counters accumulated across one full pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Tags read from the input snapshot.
    pub tags_total: usize,
    /// Tags skipped as malformed (too short, missing boundary tokens).
    pub tags_malformed: usize,
    /// Distinct assets aggregated into the table.
    pub assets_built: usize,
    /// Assets with no site-configuration entry at all.
    pub assets_unplaced: usize,
    /// External template definition rows rejected as malformed.
    pub definitions_rejected: usize,
    /// Assets that satisfied at least one template.
    pub assets_matched: usize,
    /// Assets that satisfied no template (a normal outcome, not an error).
    pub assets_unmatched: usize,
    /// Hierarchy rows emitted, intermediate nodes included.
    pub rows_emitted: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tags:        {} total, {} malformed (skipped)", self.tags_total, self.tags_malformed)?;
        writeln!(f, "assets:      {} built, {} without placement", self.assets_built, self.assets_unplaced)?;
        writeln!(f, "templates:   {} definitions rejected", self.definitions_rejected)?;
        writeln!(f, "matching:    {} matched, {} unmatched", self.assets_matched, self.assets_unmatched)?;
        write!(f, "output:      {} rows emitted", self.rows_emitted)
    }
}
