//! Tag tokenizer.
//!
//! A raw tag is a fixed-length site prefix followed by an underscore-delimited
//! body:
//!
//! ```text
//! "TLS_PMP_101_FLOW_PV"
//!  └┬─┘└──────┬───────┘
//!  prefix    body ── split('_') ──▶ ["PMP", "101", "FLOW", "PV"]
//!                                     │      │       │      │
//!                                 leading  interior tokens  trailing
//!                                 boundary (classified)     boundary
//! ```
//!
//! The first and last tokens carry fixed structural roles (asset marker and
//! signal marker) and are exempt from classification. Interior tokens are
//! classified by content, not by position:
//!
//! - digit-only (`^[0-9]+$`) ──▶ [`TokenClass::Asset`]
//! - anything else           ──▶ [`TokenClass::Attribute`]
//!
//! Splitting preserves empty segments from adjacent delimiters exactly as they
//! occur (`"ABCD12__34"` ──▶ `["12", "", "34"]`); reconstruction of the asset
//! identifier and attribute name re-inserts the original underscore runs
//! between contributing tokens.
//!
//! Everything here is pure: no I/O, no interior mutability.

use crate::error::MalformedTag;

/// Length of the fixed site prefix stripped from every tag (for example
/// `TLS_` or `TNP_`).
pub const PREFIX_LEN: usize = 4;

/// Content class of an interior token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    /// Digit-only token; contributes to the asset identifier.
    Asset,
    /// Any other token; contributes to the attribute name.
    Attribute,
}

/// Classify a single interior token.
///
/// The grammar is deliberately tiny and explicit: a token consisting solely of
/// digit characters belongs to the asset identifier, everything else to the
/// attribute name.
pub fn classify(token: &str) -> TokenClass {
    if regex!(r"^[0-9]+$").is_match(token) { TokenClass::Asset } else { TokenClass::Attribute }
}

/// Ordered token sequence produced by [`tokenize`].
///
/// `segments` is the exact `split('_')` of the tag body: count, order and
/// empty segments from adjacent delimiters are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    segments: Vec<String>,
}

/// A non-empty segment together with the underscore run that precedes it in
/// the body. Empty segments never form chunks; their delimiters accumulate
/// into the following chunk's run.
#[derive(Debug, Clone, Copy)]
struct Chunk<'a> {
    underscores: usize,
    text: &'a str,
}

impl TokenSequence {
    /// Exact underscore-split of the tag body, empty segments included.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn chunks(&self) -> Vec<Chunk<'_>> {
        let mut chunks = Vec::with_capacity(self.segments.len());
        let mut run = 0usize;
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                run += 1;
            }
            if seg.is_empty() {
                continue;
            }
            chunks.push(Chunk { underscores: run, text: seg });
            run = 0;
        }
        chunks
    }

    /// Asset identifier: the leading boundary token plus every interior
    /// digit-only token, original underscore placement preserved between
    /// contributions.
    pub fn asset_id(&self) -> String {
        let chunks = self.chunks();
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let keep = i == 0 || (i + 1 < chunks.len() && classify(chunk.text) == TokenClass::Asset);
            if !keep {
                continue;
            }
            if !out.is_empty() {
                out.extend(std::iter::repeat_n('_', chunk.underscores));
            }
            out.push_str(chunk.text);
        }
        out
    }

    /// Attribute name: every interior non-digit token plus the trailing
    /// boundary token, original underscore placement preserved between
    /// contributions.
    ///
    /// A tag with no interior tokens names the asset itself and contributes no
    /// attribute; this returns `None` for such tags.
    pub fn attribute_name(&self) -> Option<String> {
        let chunks = self.chunks();
        if chunks.len() < 3 {
            return None;
        }
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let interior = i > 0 && i + 1 < chunks.len();
            let keep = i + 1 == chunks.len() || (interior && classify(chunk.text) == TokenClass::Attribute);
            if !keep {
                continue;
            }
            if !out.is_empty() {
                out.extend(std::iter::repeat_n('_', chunk.underscores));
            }
            out.push_str(chunk.text);
        }
        Some(out)
    }
}

/// Decompose a raw tag into its [`TokenSequence`].
///
/// Strips exactly [`PREFIX_LEN`] leading characters, splits the remainder on
/// `'_'` (empty segments preserved), and checks that both boundary tokens can
/// be located. Fails with [`MalformedTag`] otherwise.
pub fn tokenize(tag: &str) -> Result<TokenSequence, MalformedTag> {
    let body_start = match tag.char_indices().nth(PREFIX_LEN) {
        Some((idx, _)) => idx,
        None => return Err(MalformedTag::TooShort(tag.to_string())),
    };
    let body = &tag[body_start..];

    let seq = TokenSequence { segments: body.split('_').map(str::to_string).collect() };
    if seq.chunks().len() < 2 {
        return Err(MalformedTag::MissingBoundaries(tag.to_string()));
    }
    Ok(seq)
}
