//! # promptguard
//!
//! Live input monitoring engine that flags prompt-injection patterns in
//! text-entry surfaces as users type.
//!
//! The engine is platform-agnostic: hosts implement a handful of traits for
//! their document model ([`page::TextControl`], [`page::PageRoot`],
//! [`page::PageNode`]) and presentation surface ([`banner::BannerHost`]),
//! then feed DOM-style insertions through a discovery channel. Everything
//! temporal goes through the [`schedule::Scheduler`] seam, so the whole
//! pipeline is testable against a simulated clock.
//!
//! ## Pipeline
//!
//! Discovery attaches an input listener to every matching element. Each
//! keystroke resets one shared 300 ms debounce timer; when input settles,
//! the originating element's current text is scanned against the compiled
//! pattern table, first match per pattern, in table order. Positive
//! results raise a single warning banner (auto-expiring, dismissible);
//! negative results proactively clear it.
//!
//! Failure policy is fail-open throughout: an unreachable pattern source or
//! a bad regex degrades detection coverage, never the page.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use promptguard::{
//!     banner::BannerHost, config::MonitorConfig, monitor::InputMonitor,
//!     page::PageRoot, patterns::builtin_set, schedule::TokioScheduler,
//! };
//!
//! # fn demo(banner_host: Arc<dyn BannerHost>, page: &dyn PageRoot) {
//! let monitor = InputMonitor::new(
//!     builtin_set(),
//!     MonitorConfig::default(),
//!     Arc::new(TokioScheduler::new()),
//!     banner_host,
//! );
//! monitor.scan_and_attach(page);
//! // ... on page unload:
//! monitor.shutdown();
//! # }
//! ```

pub mod banner;
pub mod config;
pub mod detect;
pub mod error;
pub mod monitor;
pub mod page;
pub mod patterns;
pub mod schedule;

pub use banner::{BannerEntry, BannerHost, BannerManager, BannerView};
pub use config::{BannerConfig, MonitorConfig};
pub use detect::{Detector, PatternMatch};
pub use error::{PatternError, PatternResult};
pub use monitor::{discovery_feed, DiscoveryReceiver, DiscoverySender, InputMonitor};
pub use page::{ControlKind, ControlSelector, InputListener, ListenerSlot, PageNode, PageRoot, TextControl};
pub use patterns::{builtin_set, Pattern, PatternRecord, PatternSet, PatternSource, Severity, StaticSource};
pub use schedule::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
