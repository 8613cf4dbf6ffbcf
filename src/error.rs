//! Error types.
//!
//! Two tiers, mirroring the propagation policy of the pipeline:
//!
//! - **Per-record errors** ([`MalformedTag`]) are values: the offending record
//!   is logged, counted in the [`RunReport`](crate::RunReport) and skipped. The
//!   run continues. An asset that cannot be placed in the tree and a template
//!   definition that cannot be interpreted are handled the same way inside
//!   their modules.
//! - **Structural errors** ([`PipelineError`]) are fatal: empty input or an
//!   unreadable configuration aborts the run with no partial output written.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::tokenizer::PREFIX_LEN;

/// A tag string that cannot be decomposed into a usable token sequence.
///
/// These are always recoverable: the tag is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTag {
    /// The tag is shorter than the fixed site prefix.
    #[error("tag `{0}` is shorter than the fixed {PREFIX_LEN}-character prefix")]
    TooShort(String),

    /// The tag body does not yield both boundary tokens (leading asset marker
    /// and trailing signal marker).
    #[error("tag `{0}` does not yield both boundary tokens")]
    MissingBoundaries(String),
}

/// Fatal, run-aborting failures. No partial output is written once one of
/// these is raised.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The tag source contained no rows at all.
    #[error("tag input is empty")]
    EmptyInput,

    /// The site configuration contained no asset entries.
    #[error("site configuration has no asset entries")]
    EmptySiteConfig,

    /// The tag source is missing a required header column.
    #[error("tag input is missing required column `{0}`")]
    MissingColumn(&'static str),

    /// An externally supplied template definition file produced no usable
    /// templates (every row was rejected).
    #[error("external template definitions produced no usable templates")]
    NoUsableTemplates,

    #[error("failed to read `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in `{path}`")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
