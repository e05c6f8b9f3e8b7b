use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};

/// Process stage a source collection's records are classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageGroup {
    #[serde(rename = "Security")]
    Security,
    #[serde(rename = "CC Table")]
    CcTable,
    #[serde(rename = "QC Table")]
    QcTable,
    #[serde(rename = "IR Table")]
    IrTable,
    #[serde(rename = "Audit Table")]
    AuditTable,
    #[serde(rename = "Others")]
    Others,
}

impl StageGroup {
    pub const ALL: [StageGroup; 6] = [
        Self::Security,
        Self::CcTable,
        Self::QcTable,
        Self::IrTable,
        Self::AuditTable,
        Self::Others,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Security => "Security",
            Self::CcTable => "CC Table",
            Self::QcTable => "QC Table",
            Self::IrTable => "IR Table",
            Self::AuditTable => "Audit Table",
            Self::Others => "Others",
        }
    }

    /// Accepts the display label or the short stage name (`cc`, `qc_table`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ");
        match normalized.as_str() {
            "security" => Some(Self::Security),
            "cc" | "cc table" => Some(Self::CcTable),
            "qc" | "qc table" => Some(Self::QcTable),
            "ir" | "ir table" => Some(Self::IrTable),
            "audit" | "audit table" => Some(Self::AuditTable),
            "others" | "other" => Some(Self::Others),
            _ => None,
        }
    }
}

const BUILTIN_GROUPS: &[(&str, StageGroup)] = &[
    ("lr_collection", StageGroup::Security),
    ("security_lr_counter", StageGroup::Security),
    ("cc_collection", StageGroup::CcTable),
    ("cc_sup_collection", StageGroup::CcTable),
    ("qc_lady", StageGroup::QcTable),
    ("qc_staffs", StageGroup::QcTable),
    ("qc_sup", StageGroup::QcTable),
    ("detour", StageGroup::QcTable),
    ("ir_staff", StageGroup::IrTable),
    ("ir_table_out", StageGroup::IrTable),
    ("ir_sup", StageGroup::IrTable),
    ("audit", StageGroup::AuditTable),
    ("audit_sup", StageGroup::AuditTable),
];

/// Read-only collection → stage lookup. Built once at startup and shared by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageGroupTable {
    by_collection: HashMap<String, StageGroup>,
}

impl StageGroupTable {
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_GROUPS.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, StageGroup)>) -> Self {
        Self {
            by_collection: pairs
                .into_iter()
                .map(|(name, group)| (name.to_string(), group))
                .collect(),
        }
    }

    /// Unmapped collections fall into [`StageGroup::Others`].
    pub fn classify(&self, collection: &str) -> StageGroup {
        self.by_collection
            .get(collection)
            .copied()
            .unwrap_or(StageGroup::Others)
    }

    pub fn len(&self) -> usize {
        self.by_collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_collection.is_empty()
    }

    /// Layers `collection → group label` overrides on top of the current table.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self> {
        for (collection, label) in overrides {
            let collection = collection.trim();
            if collection.is_empty() {
                anyhow::bail!("stage group override has an empty collection name");
            }
            let group = StageGroup::parse(label).with_context(|| {
                format!("unknown stage group {label:?} for collection {collection}")
            })?;
            self.by_collection.insert(collection.to_string(), group);
        }
        Ok(self)
    }

    /// Loads overrides from a JSON object file (`{"collection": "QC Table", ...}`).
    pub fn load_overrides(self, path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stage group file {}", path.display()))?;
        let overrides: BTreeMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse stage group file {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            overrides = overrides.len(),
            "loaded stage group overrides"
        );
        self.with_overrides(&overrides)
    }
}
