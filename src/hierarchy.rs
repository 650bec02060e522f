//! Hierarchy resolution for occupation codes.
//!
//! An occupation code like `8524.10` encodes its position in the taxonomy
//! through digit prefixes of the part before the dot: `8` is the division,
//! `85` the subdivision, `852` the group and `8524` the family. Each level
//! is looked up in its own table; a missing entry resolves to the
//! `Unknown` sentinel instead of failing the whole lookup.

use crate::config::DatasetConfig;
use crate::dataset::load_code_table;
use crate::error::EngineResult;
use crate::types::CodeHierarchy;
use std::collections::HashMap;

/// In-memory lookup tables for all four taxonomy levels.
pub struct HierarchyResolver {
    division: HashMap<String, String>,
    subdivision: HashMap<String, String>,
    group: HashMap<String, String>,
    family: HashMap<String, String>,
}

impl HierarchyResolver {
    /// Load all four lookup tables from the configured CSV files.
    pub fn load(config: &DatasetConfig) -> EngineResult<Self> {
        Ok(Self {
            division: load_code_table(&config.division)?,
            subdivision: load_code_table(&config.subdivision)?,
            group: load_code_table(&config.group)?,
            family: load_code_table(&config.family)?,
        })
    }

    /// Build a resolver from already-loaded tables.
    pub fn from_tables(
        division: HashMap<String, String>,
        subdivision: HashMap<String, String>,
        group: HashMap<String, String>,
        family: HashMap<String, String>,
    ) -> Self {
        Self {
            division,
            subdivision,
            group,
            family,
        }
    }

    /// Resolve the four hierarchy levels for an occupation code.
    ///
    /// The sub-code suffix after the first `.` is ignored. Codes shorter
    /// than four digits resolve the levels they have prefixes for and
    /// return `Unknown` for the rest.
    pub fn resolve(&self, code: &str) -> CodeHierarchy {
        let base = code.split('.').next().unwrap_or("");

        CodeHierarchy {
            division: self.level(&self.division, base, 1),
            subdivision: self.level(&self.subdivision, base, 2),
            group: self.level(&self.group, base, 3),
            family: self.level(&self.family, base, 4),
        }
    }

    fn level(&self, table: &HashMap<String, String>, base: &str, len: usize) -> String {
        // Slicing by byte index would panic on non-ASCII codes, which the
        // dataset loader does not reject.
        base.get(..len)
            .and_then(|prefix| table.get(prefix))
            .cloned()
            .unwrap_or_else(|| CodeHierarchy::UNKNOWN.to_string())
    }
}
