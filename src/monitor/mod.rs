//! The live input monitoring engine.
//!
//! [`InputMonitor`] wires the pieces together: discovery attaches it as the
//! input listener on every matching control (initial scan plus mutation
//! feed), keystrokes funnel into one shared debounce timer, and when input
//! settles the originating element's text is read fresh and scanned. A
//! positive pass presents the warning banner; a negative pass proactively
//! dismisses whatever banner is showing.
//!
//! All mutable state is instance state. Independent monitors (for example
//! in tests) never interfere through shared globals.

use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::banner::{BannerHost, BannerManager};
use crate::config::MonitorConfig;
use crate::detect::Detector;
use crate::page::{InputListener, PageNode, PageRoot, TextControl};
use crate::patterns::{PatternSet, PatternSource};
use crate::schedule::{Scheduler, TimerHandle};

/// Channel half the host's mutation observer writes inserted nodes into.
pub type DiscoverySender = mpsc::UnboundedSender<Arc<dyn PageNode>>;
/// Channel half the engine consumes in [`InputMonitor::spawn_discovery`].
pub type DiscoveryReceiver = mpsc::UnboundedReceiver<Arc<dyn PageNode>>;

/// Create the discovery feed pair.
pub fn discovery_feed() -> (DiscoverySender, DiscoveryReceiver) {
    mpsc::unbounded_channel()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct MonitorState {
    /// The one shared debounce timer. Deliberately global across all
    /// monitored elements: a keystroke anywhere supersedes any pending
    /// detection pass.
    pending: Option<TimerHandle>,
    discovery: Option<tokio::task::JoinHandle<()>>,
    shut_down: bool,
}

struct MonitorInner {
    config: MonitorConfig,
    detector: Detector,
    scheduler: Arc<dyn Scheduler>,
    banners: Arc<BannerManager>,
    state: Mutex<MonitorState>,
    me: Weak<MonitorInner>,
}

/// One monitoring context with its own pattern table, debounce timer and
/// banner. Cheap to clone; clones share the same engine instance.
#[derive(Clone)]
pub struct InputMonitor {
    inner: Arc<MonitorInner>,
}

impl InputMonitor {
    /// Build an engine over an already-compiled pattern set.
    pub fn new(
        patterns: PatternSet,
        config: MonitorConfig,
        scheduler: Arc<dyn Scheduler>,
        banner_host: Arc<dyn BannerHost>,
    ) -> Self {
        let banners = BannerManager::new(banner_host, Arc::clone(&scheduler), config.banner.clone());
        let detector = Detector::new(patterns, config.min_scan_chars);

        let inner = Arc::new_cyclic(|me| MonitorInner {
            config,
            detector,
            scheduler,
            banners,
            state: Mutex::new(MonitorState {
                pending: None,
                discovery: None,
                shut_down: false,
            }),
            me: me.clone(),
        });

        Self { inner }
    }

    /// Load patterns from `source` (failing open to the empty set), build
    /// the engine, and run the initial whole-document scan. Monitoring is
    /// live when this returns.
    pub async fn start(
        source: &dyn PatternSource,
        config: MonitorConfig,
        scheduler: Arc<dyn Scheduler>,
        banner_host: Arc<dyn BannerHost>,
        root: &dyn PageRoot,
    ) -> Self {
        let patterns = PatternSet::load(source).await;
        if patterns.is_empty() {
            warn!("monitoring starts with zero patterns; nothing will be detected");
        }
        let monitor = Self::new(patterns, config, scheduler, banner_host);
        monitor.scan_and_attach(root);
        monitor
    }

    /// Attach to every matching control currently in the document.
    pub fn scan_and_attach(&self, root: &dyn PageRoot) {
        let controls = root.controls(&self.inner.config.selector);
        debug!(candidates = controls.len(), "initial control scan");
        for control in controls {
            self.inner.try_attach(control);
        }
    }

    /// Process one inserted subtree from the host's mutation observer.
    ///
    /// Checks the node itself and all matching descendants; revisiting an
    /// already-attached element is a no-op.
    pub fn observe_insertion(&self, node: &dyn PageNode) {
        self.inner.observe_insertion(node);
    }

    /// Consume a discovery feed on a background task until the feed closes
    /// or the engine shuts down.
    pub fn spawn_discovery(&self, mut feed: DiscoveryReceiver) {
        let me = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(node) = feed.recv().await {
                let Some(inner) = me.upgrade() else { break };
                inner.observe_insertion(node.as_ref());
            }
        });

        let mut state = self.inner.lock();
        if state.shut_down {
            task.abort();
            return;
        }
        if let Some(old) = state.discovery.replace(task) {
            old.abort();
        }
    }

    /// Manual banner dismissal, for hosts to wire to the close affordance.
    pub fn dismiss_banner(&self) {
        self.inner.banners.dismiss();
    }

    /// Whether the warning banner is currently shown.
    pub fn banner_active(&self) -> bool {
        self.inner.banners.is_active()
    }

    /// Number of compiled detection patterns.
    pub fn pattern_count(&self) -> usize {
        self.inner.detector.pattern_count()
    }

    /// Teardown, to be driven by the host's unload signal.
    ///
    /// Cancels the pending debounce timer, the banner and its expiry timer,
    /// and the discovery task. Nothing fires after this returns; further
    /// input events are ignored. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }
            if let Some(task) = state.discovery.take() {
                task.abort();
            }
        }
        self.inner.banners.dismiss();
        debug!("monitor shut down");
    }
}

impl MonitorInner {
    fn observe_insertion(&self, node: &dyn PageNode) {
        if self.lock().shut_down {
            return;
        }
        let selector = &self.config.selector;
        if let Some(control) = node.as_control(selector) {
            self.try_attach(control);
        }
        for control in node.descendant_controls(selector) {
            self.try_attach(control);
        }
    }

    fn try_attach(&self, control: Arc<dyn TextControl>) {
        let Some(listener) = self.me.upgrade() else {
            return;
        };
        if control.attach_listener(listener as Arc<dyn InputListener>) {
            debug!(kind = ?control.kind(), "listener attached");
        }
    }

    /// Debounce settle: read the element's text *now* and run one pass.
    fn run_detection(&self, source: &Arc<dyn TextControl>) {
        {
            let mut state = self.lock();
            if state.shut_down {
                return;
            }
            state.pending = None;
        }

        let text = source.current_text();
        let hits = self.detector.detect(&text);
        if hits.is_empty() {
            // A warning must not linger once the text turns benign.
            self.banners.dismiss();
        } else {
            warn!(matches = hits.len(), "injection patterns detected in input");
            self.banners.present(&hits);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl InputListener for MonitorInner {
    fn on_input(&self, source: &Arc<dyn TextControl>) {
        let mut state = self.lock();
        if state.shut_down {
            return;
        }
        // Single-flight: the previous pending pass is always superseded,
        // never run concurrently or out of order.
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }

        let me = self.me.clone();
        let source = Arc::clone(source);
        state.pending = Some(self.scheduler.schedule(
            self.config.debounce(),
            Box::new(move || {
                if let Some(inner) = me.upgrade() {
                    inner.run_detection(&source);
                }
            }),
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
