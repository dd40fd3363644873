//! Dependency manifest summary.
//!
//! Populated from `package.json` or `Cargo.toml` at the repository root.
//! Maps are ordered so the dependency tables render sorted by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, alias = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}
