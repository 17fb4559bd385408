//! Built-in detection rules.
//!
//! The default rule table shipped with the crate, covering instruction
//! overrides, role impersonation, role markers, special tokens, and
//! system-prompt extraction. Hosts that deliver their own rules via a
//! [`super::PatternSource`] can ignore this module entirely.

use once_cell::sync::Lazy;

use super::{PatternRecord, PatternSet, Severity};

/// `(id, name, regex, severity)` for every built-in rule.
///
/// Order matters: it is the evaluation and reporting order.
const BUILTIN_RULES: &[(&str, &str, &str, Severity)] = &[
    // Instruction override attempts
    (
        "instruction-override",
        "Instruction override",
        r"ignore (all )?(previous|prior) instructions",
        Severity::High,
    ),
    (
        "disregard-above",
        "Disregard directive",
        r"disregard (the )?(above|previous|prior)",
        Severity::High,
    ),
    (
        "forget-everything",
        "Context reset",
        r"forget everything",
        Severity::Medium,
    ),
    (
        "new-instructions",
        "Replacement instructions",
        r"(new|updated) instructions",
        Severity::Medium,
    ),
    (
        "from-now-on",
        "Behavior override",
        r"from\s+now\s+on\s*,?\s*(you|ignore|disregard|forget)",
        Severity::High,
    ),
    // Role impersonation
    (
        "role-impersonation",
        "Role impersonation",
        r"(you are now|act as|pretend to be)",
        Severity::Medium,
    ),
    // Role markers
    (
        "role-marker",
        "Role marker",
        r"\b(system|assistant)\s*:",
        Severity::Medium,
    ),
    (
        "bracketed-role",
        "Bracketed role marker",
        r"[\[<{]\s*(system|assistant|user)\s*[}>\]]",
        Severity::Medium,
    ),
    // Special tokens (LLM-specific delimiters)
    (
        "special-token",
        "Special token",
        r"(<\||\|>|\[INST\]|\[/INST\])",
        Severity::High,
    ),
    (
        "fenced-system-block",
        "Fenced system block",
        "```system",
        Severity::High,
    ),
    // Prompt extraction
    (
        "prompt-extraction",
        "System prompt extraction",
        r"(reveal|show|print|repeat)\b.{0,40}\bsystem prompt",
        Severity::Critical,
    ),
    (
        "begin-prompt",
        "Prompt block injection",
        r"begin\s*prompt",
        Severity::High,
    ),
];

/// The built-in rules as records, in table order.
pub fn builtin_records() -> Vec<PatternRecord> {
    BUILTIN_RULES
        .iter()
        .map(|&(id, name, regex, severity)| PatternRecord {
            id: id.to_string(),
            name: name.to_string(),
            regex: regex.to_string(),
            severity,
        })
        .collect()
}

/// The built-in rules compiled once, then cloned cheaply on each call.
pub fn builtin_set() -> PatternSet {
    static COMPILED: Lazy<PatternSet> = Lazy::new(|| PatternSet::compile(&builtin_records()));
    COMPILED.clone()
}
