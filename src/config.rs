//! Monitor configuration.
//!
//! All knobs live in one serde-deserializable struct so a host can override
//! any subset from a JSON document while inheriting defaults for the rest.
//! The defaults reproduce the reference behavior: 300 ms shared debounce,
//! 3-character scan floor, a 10-second banner with at most 5 entries and
//! 100-character excerpts.

use serde::Deserialize;
use std::time::Duration;

use crate::page::ControlSelector;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Delay between the last keystroke and the detection pass.
const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Texts shorter than this are never scanned.
const DEFAULT_MIN_SCAN_CHARS: usize = 3;

/// How long a banner stays up without user interaction.
const DEFAULT_BANNER_TTL_MS: u64 = 10_000;

/// Maximum number of matches rendered in one banner.
const DEFAULT_BANNER_MAX_ENTRIES: usize = 5;

/// Maximum length of a rendered matched-text excerpt, in characters.
const DEFAULT_EXCERPT_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level configuration for an [`crate::monitor::InputMonitor`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Debounce delay in milliseconds. One timer is shared across all
    /// monitored elements; each keystroke anywhere resets it.
    pub debounce_ms: u64,
    /// Minimum text length (in characters) before any pattern is consulted.
    pub min_scan_chars: usize,
    /// Which kinds of text controls are eligible for monitoring.
    pub selector: ControlSelector,
    /// Warning banner settings.
    pub banner: BannerConfig,
}

/// Settings for the warning banner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    /// Automatic expiry in milliseconds.
    pub ttl_ms: u64,
    /// Cap on rendered matches; the remainder becomes a "+N more" count.
    pub max_entries: usize,
    /// Cap on each rendered excerpt, in characters.
    pub excerpt_chars: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_scan_chars: DEFAULT_MIN_SCAN_CHARS,
            selector: ControlSelector::default(),
            banner: BannerConfig::default(),
        }
    }
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_BANNER_TTL_MS,
            max_entries: DEFAULT_BANNER_MAX_ENTRIES,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl MonitorConfig {
    /// Debounce delay as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl BannerConfig {
    /// Banner lifetime as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}
