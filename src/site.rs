//! Site configuration.
//!
//! External collaborator that places assets in the import tree. It maps an
//! asset identifier — or, as a fallback, the type code embedded in the
//! identifier's leading boundary token (its alphabetic prefix, `PMP` in
//! `PMP_101`) — to an asset type and a Level-2/Level-3 ancestry under the
//! site's Level-1 root.
//!
//! An entry may carry a type without a hierarchy placement (no Level-2); such
//! assets still participate in coverage analysis but are excluded from tree
//! construction.

use std::collections::HashMap;

use serde::Deserialize;

/// One placement entry, keyed by asset id or type code.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Lookup key: an exact asset id, or a bare type code.
    pub key: String,
    /// Categorical asset type label (for example `Motor`, `Analog Sensor`).
    pub asset_type: String,
    /// Human-readable asset name, used as the leaf row description.
    #[serde(default)]
    pub name: Option<String>,
    /// Asset name in the source control system, emitted as an attribute row
    /// in template-filtered mode.
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub level2: Option<String>,
    #[serde(default)]
    pub level3: Option<String>,
}

/// Site structure: the Level-1 root plus per-asset placements.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Name of the Level-1 root element (one per site).
    pub level1: String,
    /// Security descriptor applied to every element row.
    #[serde(default)]
    pub security_string: String,
    pub assets: Vec<SiteEntry>,
}

impl SiteConfig {
    /// Resolve an asset id to its placement: exact id match first, then the
    /// type code embedded in the leading boundary token.
    pub fn resolve(&self, asset_id: &str) -> Option<&SiteEntry> {
        let by_key: HashMap<&str, &SiteEntry> = self.assets.iter().map(|e| (e.key.as_str(), e)).collect();
        by_key.get(asset_id).copied().or_else(|| by_key.get(type_code(asset_id)).copied())
    }

    /// Build a reusable lookup over the entries. `resolve` is convenient for
    /// one-off queries; the table builder uses this to avoid rebuilding the
    /// map per tag.
    pub(crate) fn lookup(&self) -> SiteLookup<'_> {
        SiteLookup { by_key: self.assets.iter().map(|e| (e.key.as_str(), e)).collect() }
    }
}

pub(crate) struct SiteLookup<'a> {
    by_key: HashMap<&'a str, &'a SiteEntry>,
}

impl<'a> SiteLookup<'a> {
    pub(crate) fn resolve(&self, asset_id: &str) -> Option<&'a SiteEntry> {
        self.by_key.get(asset_id).copied().or_else(|| self.by_key.get(type_code(asset_id)).copied())
    }
}

/// Type code of an asset id: the leading run of ASCII alphabetic characters
/// of its first token (`PMP` for `PMP_101`, `LIT` for `LIT931`).
pub fn type_code(asset_id: &str) -> &str {
    let end = asset_id.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(asset_id.len());
    &asset_id[..end]
}
