//! Detection pattern table.
//!
//! Patterns arrive as `(id, name, regex, severity)` records, are compiled
//! exactly once into a [`PatternSet`], and are read-only from then on. The
//! whole loading path fails open: an unreachable source yields an empty set
//! (detection degrades to "never detected"), and a single bad regex is
//! logged and skipped without disturbing its neighbors.

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PatternError, PatternResult};

pub mod builtin;

pub use builtin::builtin_set;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// How suspicious a matched pattern is.
///
/// Ordering is by escalation, so `Severity::Low < Severity::Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lowercase label as it appears in pattern records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection rule as delivered by a pattern source.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRecord {
    /// Unique key. Duplicate ids after the first occurrence are dropped.
    pub id: String,
    /// Human-readable label shown in the warning banner.
    pub name: String,
    /// Textual regex source, matched case-insensitively.
    pub regex: String,
    pub severity: Severity,
}

/// An immutable, compiled detection rule.
#[derive(Debug)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub severity: Severity,
}

/// A rule paired with its compiled matcher.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub(crate) pattern: Arc<Pattern>,
    pub(crate) regex: regex::Regex,
}

/// Compile a single record. Case-insensitivity is applied at the builder
/// level so record regexes stay plain.
pub(crate) fn compile_record(record: &PatternRecord) -> PatternResult<CompiledPattern> {
    let regex = RegexBuilder::new(&record.regex)
        .case_insensitive(true)
        .build()
        .map_err(|source| PatternError::Compile {
            id: record.id.clone(),
            source,
        })?;

    Ok(CompiledPattern {
        pattern: Arc::new(Pattern {
            id: record.id.clone(),
            name: record.name.clone(),
            severity: record.severity,
        }),
        regex,
    })
}

// ---------------------------------------------------------------------------
// PatternSet
// ---------------------------------------------------------------------------

/// The compiled pattern table, immutable after construction.
///
/// Iteration order is record order: first-loaded patterns are checked first,
/// and detection results preserve that order.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    compiled: Vec<CompiledPattern>,
}

impl PatternSet {
    /// The empty set. Detection against it always reports nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile `records` in order.
    ///
    /// A record whose regex fails to compile is logged and excluded; a
    /// record reusing an already-seen id is logged and excluded. Neither
    /// aborts compilation of the remaining records.
    pub fn compile(records: &[PatternRecord]) -> Self {
        let mut compiled = Vec::with_capacity(records.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.id.as_str()) {
                warn!(id = %record.id, "duplicate pattern id, keeping first occurrence");
                continue;
            }
            match compile_record(record) {
                Ok(entry) => compiled.push(entry),
                Err(e) => warn!(id = %record.id, error = %e, "skipping pattern"),
            }
        }

        debug!(
            loaded = compiled.len(),
            supplied = records.len(),
            "compiled pattern set"
        );
        Self { compiled }
    }

    /// Parse a JSON array of records and compile it.
    pub fn from_json(json: &str) -> PatternResult<Self> {
        let records: Vec<PatternRecord> = serde_json::from_str(json)?;
        Ok(Self::compile(&records))
    }

    /// Fetch records from `source` and compile them, failing open.
    ///
    /// If the fetch itself fails, the error is logged and the empty set is
    /// returned so monitoring can still start with zero coverage rather
    /// than not at all.
    pub async fn load(source: &dyn PatternSource) -> Self {
        match source.fetch().await {
            Ok(records) => Self::compile(&records),
            Err(e) => {
                warn!(error = %e, "pattern source failed, starting with empty set");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &CompiledPattern> {
        self.compiled.iter()
    }
}

// ---------------------------------------------------------------------------
// Pattern sources
// ---------------------------------------------------------------------------

/// Anything that can deliver an ordered list of pattern records.
///
/// The engine consumes a source exactly once, before monitoring begins.
#[async_trait]
pub trait PatternSource: Send + Sync {
    async fn fetch(&self) -> PatternResult<Vec<PatternRecord>>;
}

/// A fixed in-memory record list, useful for tests and embedded defaults.
pub struct StaticSource(pub Vec<PatternRecord>);

#[async_trait]
impl PatternSource for StaticSource {
    async fn fetch(&self) -> PatternResult<Vec<PatternRecord>> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
