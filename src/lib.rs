extern crate self as tagtree;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod site;
mod templates;

pub mod io;

pub use api::{RunOptions, RunOutcome, run};
pub use engine::coverage::{CoverageOptions, CoverageReport, CoverageStat, PresenceMatrix, TypeSimilarity, analyze};
pub use engine::hierarchy::{HierarchyMode, HierarchyRow, ObjectType, build_hierarchy};
pub use engine::matcher::{TemplateMatch, match_all, match_asset};
pub use engine::report::RunReport;
pub use engine::table::{AssetRecord, AttributeTable, AttributeValue, TagRow, build_table};
pub use engine::tokenizer::{PREFIX_LEN, TokenClass, TokenSequence, classify, tokenize};
pub use error::{MalformedTag, PipelineError};
pub use site::{SiteConfig, SiteEntry};
pub use templates::{
    AttributeSpec, AttributeTemplate, DataType, SUBSTITUTION_PATTERN, TemplateDefRow, TemplateSet, from_definitions,
};
