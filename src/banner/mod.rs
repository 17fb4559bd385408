//! Warning banner lifecycle.
//!
//! At most one banner exists at any time. `present` tears the previous one
//! down (unmount plus expiry-timer cancel) before mounting its replacement;
//! `dismiss` is safe to call when nothing is shown. Every banner schedules
//! its own expiry, and an expiry callback only acts if it still names the
//! active banner, so a timer that outlives its banner can never close a
//! successor.

use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

use crate::config::BannerConfig;
use crate::detect::PatternMatch;
use crate::patterns::Severity;
use crate::schedule::{Scheduler, TimerHandle};

/// Default banner heading.
pub const BANNER_TITLE: &str = "Potential Injection Detected";

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

/// One rendered match line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerEntry {
    pub rule_name: String,
    pub severity: Severity,
    /// Matched text, truncated and HTML-escaped.
    pub excerpt: String,
}

/// Everything a host needs to render the warning surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerView {
    pub title: String,
    pub entries: Vec<BannerEntry>,
    /// Count of matches beyond the entry cap ("+N more"); zero if none.
    pub overflow: usize,
    /// Hosts must render a manual close affordance wired to
    /// [`BannerManager::dismiss`].
    pub dismissible: bool,
}

/// Presentation surface for the banner.
///
/// `mount`/`unmount` are called synchronously from manager operations and
/// must not call back into the manager; wire user dismissal to
/// [`BannerManager::dismiss`] from the host's own event handling instead.
pub trait BannerHost: Send + Sync {
    fn mount(&self, view: BannerView);
    fn unmount(&self);
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

struct ActiveBanner {
    /// Generation id, checked by the expiry callback.
    id: u64,
    expiry: TimerHandle,
}

struct BannerState {
    active: Option<ActiveBanner>,
    next_id: u64,
}

/// Owner of the single warning banner.
pub struct BannerManager {
    host: Arc<dyn BannerHost>,
    scheduler: Arc<dyn Scheduler>,
    config: BannerConfig,
    state: Mutex<BannerState>,
    me: Weak<BannerManager>,
}

impl BannerManager {
    pub fn new(
        host: Arc<dyn BannerHost>,
        scheduler: Arc<dyn Scheduler>,
        config: BannerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            host,
            scheduler,
            config,
            state: Mutex::new(BannerState {
                active: None,
                next_id: 0,
            }),
            me: me.clone(),
        })
    }

    /// Show a banner for `matches`, replacing any banner already shown.
    ///
    /// The old banner is fully torn down (unmounted, expiry cancelled)
    /// before the new one is mounted.
    pub fn present(&self, matches: &[PatternMatch]) {
        let mut state = self.lock();

        if let Some(old) = state.active.take() {
            old.expiry.cancel();
            self.host.unmount();
        }

        let id = state.next_id;
        state.next_id += 1;

        self.host.mount(self.render(matches));

        let expiry = {
            let me = self.me.clone();
            self.scheduler.schedule(
                self.config.ttl(),
                Box::new(move || {
                    if let Some(manager) = me.upgrade() {
                        manager.expire(id);
                    }
                }),
            )
        };
        state.active = Some(ActiveBanner { id, expiry });

        debug!(banner = id, matches = matches.len(), "banner presented");
    }

    /// Remove the banner if one is shown; no-op otherwise.
    pub fn dismiss(&self) {
        let mut state = self.lock();
        if let Some(active) = state.active.take() {
            active.expiry.cancel();
            self.host.unmount();
            debug!(banner = active.id, "banner dismissed");
        }
    }

    /// Whether a banner is currently shown.
    pub fn is_active(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Expiry path: only acts if banner `id` is still the active one.
    fn expire(&self, id: u64) {
        let mut state = self.lock();
        let is_current = state.active.as_ref().is_some_and(|a| a.id == id);
        if is_current {
            // The timer has already fired; nothing left to cancel.
            state.active = None;
            self.host.unmount();
            debug!(banner = id, "banner expired");
        }
    }

    fn render(&self, matches: &[PatternMatch]) -> BannerView {
        let cap = self.config.max_entries;
        let entries = matches
            .iter()
            .take(cap)
            .map(|m| BannerEntry {
                rule_name: m.pattern.name.clone(),
                severity: m.pattern.severity,
                excerpt: escape_html(&truncate_chars(&m.matched, self.config.excerpt_chars)),
            })
            .collect();

        BannerView {
            title: BANNER_TITLE.to_string(),
            entries,
            overflow: matches.len().saturating_sub(cap),
            dismissible: true,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BannerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

/// Truncate to `max` characters on a char boundary, appending an ellipsis
/// when anything was cut.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}…", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// Escape the matched text so the warning surface cannot itself become an
/// injection vector.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::Pattern;
    use crate::schedule::ManualScheduler;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingHost {
        events: Mutex<Vec<HostEvent>>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum HostEvent {
        Mount(BannerView),
        Unmount,
    }

    impl BannerHost for RecordingHost {
        fn mount(&self, view: BannerView) {
            self.events.lock().unwrap().push(HostEvent::Mount(view));
        }
        fn unmount(&self) {
            self.events.lock().unwrap().push(HostEvent::Unmount);
        }
    }

    impl RecordingHost {
        fn mounted_count(&self) -> isize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| match e {
                    HostEvent::Mount(_) => 1,
                    HostEvent::Unmount => -1,
                })
                .sum()
        }

        fn last_mount(&self) -> Option<BannerView> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find_map(|e| match e {
                    HostEvent::Mount(v) => Some(v.clone()),
                    HostEvent::Unmount => None,
                })
        }
    }

    fn matches(n: usize) -> Vec<PatternMatch> {
        (0..n)
            .map(|i| PatternMatch {
                pattern: Arc::new(Pattern {
                    id: format!("p{i}"),
                    name: format!("Rule {i}"),
                    severity: Severity::High,
                }),
                matched: format!("matched text {i}"),
            })
            .collect()
    }

    fn setup() -> (Arc<BannerManager>, Arc<RecordingHost>, ManualScheduler) {
        let host = Arc::new(RecordingHost::default());
        let clock = ManualScheduler::new();
        let manager = BannerManager::new(
            host.clone(),
            Arc::new(clock.clone()),
            BannerConfig::default(),
        );
        (manager, host, clock)
    }

    // ── Singleton invariant ───────────────────────────────────────────

    #[test]
    fn test_at_most_one_banner_after_any_sequence() {
        let (manager, host, _clock) = setup();

        manager.present(&matches(2));
        manager.present(&matches(1));
        manager.dismiss();
        manager.dismiss();
        manager.present(&matches(3));
        manager.present(&matches(1));

        assert_eq!(host.mounted_count(), 1);
        assert!(manager.is_active());
    }

    #[test]
    fn test_replace_tears_down_old_first() {
        let (manager, host, _clock) = setup();

        manager.present(&matches(1));
        manager.present(&matches(1));

        let events = host.events.lock().unwrap();
        assert!(matches!(events[0], HostEvent::Mount(_)));
        assert_eq!(events[1], HostEvent::Unmount);
        assert!(matches!(events[2], HostEvent::Mount(_)));
    }

    #[test]
    fn test_dismiss_without_banner_is_noop() {
        let (manager, host, _clock) = setup();
        manager.dismiss();
        assert!(host.events.lock().unwrap().is_empty());
        assert!(!manager.is_active());
    }

    // ── Expiry ────────────────────────────────────────────────────────

    #[test]
    fn test_banner_expires_after_ttl() {
        let (manager, host, clock) = setup();

        manager.present(&matches(1));
        clock.advance(Duration::from_millis(9_999));
        assert!(manager.is_active());

        clock.advance(Duration::from_millis(1));
        assert!(!manager.is_active());
        assert_eq!(host.mounted_count(), 0);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_dismiss_cancels_expiry_timer() {
        let (manager, _host, clock) = setup();

        manager.present(&matches(1));
        manager.dismiss();
        assert_eq!(clock.pending(), 0);

        // Advancing past the would-be expiry does nothing further
        clock.advance(Duration::from_secs(20));
        assert!(!manager.is_active());
    }

    #[test]
    fn test_replaced_banner_timer_cannot_close_successor() {
        let (manager, _host, clock) = setup();

        manager.present(&matches(1));
        clock.advance(Duration::from_millis(5_000));
        manager.present(&matches(1)); // replacement at t=5s

        // Past the first banner's original deadline; only the replacement's
        // timer remains, and it has 10s of its own.
        clock.advance(Duration::from_millis(5_001));
        assert!(manager.is_active());

        clock.advance(Duration::from_millis(4_999));
        assert!(!manager.is_active());
    }

    // ── Rendering ─────────────────────────────────────────────────────

    #[test]
    fn test_entry_cap_and_overflow_count() {
        let (manager, host, _clock) = setup();

        manager.present(&matches(8));
        let view = host.last_mount().unwrap();
        assert_eq!(view.entries.len(), 5);
        assert_eq!(view.overflow, 3);
        assert_eq!(view.title, BANNER_TITLE);
        assert!(view.dismissible);
    }

    #[test]
    fn test_no_overflow_when_under_cap() {
        let (manager, host, _clock) = setup();

        manager.present(&matches(2));
        let view = host.last_mount().unwrap();
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.overflow, 0);
    }

    #[test]
    fn test_entry_carries_rule_name_and_severity() {
        let (manager, host, _clock) = setup();

        manager.present(&matches(1));
        let view = host.last_mount().unwrap();
        assert_eq!(view.entries[0].rule_name, "Rule 0");
        assert_eq!(view.entries[0].severity, Severity::High);
        assert_eq!(view.entries[0].excerpt, "matched text 0");
    }

    #[test]
    fn test_excerpt_escaped() {
        let (manager, host, _clock) = setup();

        let m = vec![PatternMatch {
            pattern: Arc::new(Pattern {
                id: "p1".to_string(),
                name: "XSS bait".to_string(),
                severity: Severity::Critical,
            }),
            matched: r#"<script>alert("x")</script>"#.to_string(),
        }];
        manager.present(&m);

        let view = host.last_mount().unwrap();
        assert_eq!(
            view.entries[0].excerpt,
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_excerpt_truncated_to_config_cap() {
        let (manager, host, _clock) = setup();

        let long = "a".repeat(150);
        let m = vec![PatternMatch {
            pattern: Arc::new(Pattern {
                id: "p1".to_string(),
                name: "Long".to_string(),
                severity: Severity::Low,
            }),
            matched: long,
        }];
        manager.present(&m);

        let view = host.last_mount().unwrap();
        assert_eq!(view.entries[0].excerpt.chars().count(), 101); // 100 + ellipsis
    }

    // ── Helpers ───────────────────────────────────────────────────────

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_escape_html_all_specials() {
        assert_eq!(escape_html(r#"<&>"'"#), "&lt;&amp;&gt;&quot;&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
