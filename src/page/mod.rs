//! Host-page abstraction.
//!
//! The engine never talks to a concrete document API. Hosts implement these
//! traits for their platform: [`TextControl`] is one monitored text-entry
//! element, [`PageRoot`] answers the startup whole-document query, and
//! [`PageNode`] represents one inserted subtree from the host's mutation
//! feed. [`ListenerSlot`] gives implementors the element-resident
//! "already attached" marker, so the registry itself holds no per-element
//! state and removed elements are reclaimed with the node.

use serde::Deserialize;
use std::sync::{Arc, OnceLock};

// ---------------------------------------------------------------------------
// Control selection
// ---------------------------------------------------------------------------

/// Kind of text-bearing control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Multi-line text control (textarea equivalents).
    MultiLine,
    /// Single-line text control.
    SingleLine,
    /// Content-editable region.
    Editable,
}

/// Which control kinds are eligible for monitoring.
///
/// This is the configuration constant behind the monitored-control
/// selector; by default all three kinds are watched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlSelector {
    pub multi_line: bool,
    pub single_line: bool,
    pub editable: bool,
}

impl Default for ControlSelector {
    fn default() -> Self {
        Self {
            multi_line: true,
            single_line: true,
            editable: true,
        }
    }
}

impl ControlSelector {
    pub fn matches(&self, kind: ControlKind) -> bool {
        match kind {
            ControlKind::MultiLine => self.multi_line,
            ControlKind::SingleLine => self.single_line,
            ControlKind::Editable => self.editable,
        }
    }
}

// ---------------------------------------------------------------------------
// Elements and events
// ---------------------------------------------------------------------------

/// Receiver of input events from attached controls.
pub trait InputListener: Send + Sync {
    /// Called once per input event on `source`.
    fn on_input(&self, source: &Arc<dyn TextControl>);
}

/// One text-entry element on the host page.
pub trait TextControl: Send + Sync {
    fn kind(&self) -> ControlKind;

    /// The element's current text. Read at detection time, never buffered,
    /// so only the latest settled content is ever scanned.
    fn current_text(&self) -> String;

    /// Attach `listener`, returning `false` if one is already attached.
    ///
    /// Must be idempotent: however many times discovery revisits the
    /// element, at most one listener is ever installed. Implementations
    /// typically delegate to a [`ListenerSlot`] stored on the element.
    fn attach_listener(&self, listener: Arc<dyn InputListener>) -> bool;
}

/// The whole document, queried once at startup.
pub trait PageRoot {
    /// Every control currently in the document that matches `selector`.
    fn controls(&self, selector: &ControlSelector) -> Vec<Arc<dyn TextControl>>;
}

/// One node from a mutation batch: an element just inserted into the page.
///
/// The discovery feed delivers these; the engine checks the node itself and
/// scans its descendants, so inserting a whole form at once cannot hide
/// nested inputs.
pub trait PageNode: Send + Sync {
    /// The node itself, if it matches `selector`.
    fn as_control(&self, selector: &ControlSelector) -> Option<Arc<dyn TextControl>>;

    /// Matching controls anywhere below the node.
    fn descendant_controls(&self, selector: &ControlSelector) -> Vec<Arc<dyn TextControl>>;
}

// ---------------------------------------------------------------------------
// Attach marker
// ---------------------------------------------------------------------------

/// Element-resident listener storage with claim-once semantics.
///
/// Holds the attached listener and doubles as the "already attached"
/// marker. Living on the element, it disappears with the element; the
/// engine keeps no registry entry to clean up.
#[derive(Default)]
pub struct ListenerSlot {
    listener: OnceLock<Arc<dyn InputListener>>,
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `listener` if the slot is empty. Returns `false` (and drops
    /// the candidate) if a listener is already present.
    pub fn install(&self, listener: Arc<dyn InputListener>) -> bool {
        self.listener.set(listener).is_ok()
    }

    /// Whether a listener has been attached.
    pub fn is_attached(&self) -> bool {
        self.listener.get().is_some()
    }

    /// Deliver one input event from `source` to the attached listener, if
    /// any.
    pub fn fire(&self, source: &Arc<dyn TextControl>) {
        if let Some(listener) = self.listener.get() {
            listener.on_input(source);
        }
    }
}

impl std::fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
