//! Tag analysis engine.
//!
//! This module is the *public entry point* for the engine. The pipeline is a
//! single-pass batch computation: one complete snapshot of raw tags in, one
//! complete snapshot of hierarchy rows and template specifications out.
//!
//! ## How the parts work together
//!
//! ```text
//! raw tag rows ── tokenize ──────────────────────────  (tokenizer.rs)
//!                    │  strip prefix, split on '_',
//!                    │  classify digit/non-digit tokens
//!                    v
//!            build_table ─────────────────────────────  (table.rs)
//!              - aggregate tags per assetId
//!              - resolve assetType + hierarchy path
//!                via the site configuration
//!                    │
//!        ┌───────────┴──────────────┐
//!        v                          v
//!    analyze (coverage.rs)      match_all (matcher.rs)
//!      - presence frequency       - most-restrictive-first
//!        per (type, attribute)      subset test against the
//!      - derive templates           ordered TemplateSet
//!      - advisory similarity            │
//!                                       v
//!                            build_hierarchy (hierarchy.rs)
//!                              - Level-1 ▸ Level-2 ▸ Level-3 ▸ leaf
//!                              - depth-first, deduplicated,
//!                                optionally template-filtered
//! ```
//!
//! Derived templates (coverage) and externally supplied definitions
//! (`templates.rs`) are interchangeable inputs to the matcher: both end up in
//! a [`TemplateSet`](crate::TemplateSet) whose ordering — descending required
//! count, template name ascending on ties — is fixed at construction so a run
//! is reproducible.
//!
//! ## Responsibilities by module
//!
//! - `tokenizer.rs`: the token grammar. Pure; no I/O, no state.
//! - `table.rs`: per-asset aggregation and site-configuration lookups.
//! - `coverage.rs`: frequency statistics, template derivation, presence
//!   matrices, type-similarity advisories.
//! - `matcher.rs`: greedy first-match-wins template selection.
//! - `hierarchy.rs`: import-row emission with path deduplication and pruning.
//! - `report.rs`: run counters surfaced to the caller after every run.
//!
//! Per-record failures never abort a run; they are logged via `tracing` and
//! counted in [`RunReport`](crate::RunReport). Only structural failures
//! (empty input, unreadable configuration) are fatal.

pub(crate) mod coverage;
pub(crate) mod hierarchy;
pub(crate) mod matcher;
pub(crate) mod report;
pub(crate) mod table;
pub(crate) mod tokenizer;
