//! Damage & Resize Coordination
//!
//! Fans upstream damage reports out to the downstream listeners and
//! mediates resize requests in both directions:
//!
//! - Upstream-initiated resizes always take effect; the bridge resizes
//!   the framebuffer and this module notifies listeners with the
//!   `client_initiated` flag cleared.
//! - Downstream-initiated resizes are forwarded over the negotiated
//!   display control channel when the upstream session offered one, and
//!   reported as not applied otherwise. The bridge resizes the
//!   framebuffer only when the forward succeeded.
//!
//! Damage rectangles are clamped before fan-out so listeners never see a
//! negative origin or an empty extent.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::geometry::{MonitorLayout, Rect, ScreenLayout};
use crate::pointer::CursorShape;

// ============================================================================
// Errors
// ============================================================================

/// Display control channel failures
#[derive(Debug, thiserror::Error)]
pub enum DisplayControlError {
    /// The channel was negotiated but has since closed
    #[error("display control channel closed")]
    ChannelClosed,

    /// The upstream peer rejected the requested layout
    #[error("layout rejected by upstream: {reason}")]
    Rejected {
        /// Peer-supplied rejection detail
        reason: String,
    },
}

// ============================================================================
// Upstream-provided channel
// ============================================================================

/// Handle for requesting monitor layout changes from the upstream session.
///
/// Offered by the upstream engine only when the peer negotiated dynamic
/// display support; sending is non-blocking, the result arrives later as
/// an upstream-initiated resize.
pub trait DisplayControl: Send + Sync {
    /// Ask the upstream peer to adopt the given layout
    fn request_layout(&self, monitors: &[MonitorLayout]) -> Result<(), DisplayControlError>;
}

// ============================================================================
// Downstream listeners
// ============================================================================

/// Receiver of display-side changes (implemented by the downstream
/// viewer server)
pub trait DamageListener: Send + Sync {
    /// A framebuffer region changed
    fn damaged(&self, rect: Rect);

    /// The framebuffer was resized
    fn resized(&self, width: u32, height: u32, client_initiated: bool);

    /// The remote cursor image changed
    fn cursor_changed(&self, shape: &CursorShape);

    /// The remote cursor moved
    fn cursor_moved(&self, x: u32, y: u32);
}

/// Outcome of a downstream-initiated resize request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// The request was forwarded upstream
    Applied,
    /// No display control channel was negotiated; the request was dropped
    NotApplied,
}

// ============================================================================
// Coordinator
// ============================================================================

/// Routes damage and resize traffic between the two protocol sides.
///
/// Listener fan-out is in registration order; a listener registered
/// before another always observes each event before it. Cloning is
/// shallow (listener and channel handles are shared), which is what the
/// bridge's snapshot dispatch relies on.
#[derive(Clone)]
pub struct DamageCoordinator {
    listeners: Vec<Arc<dyn DamageListener>>,
    display_control: Option<Arc<dyn DisplayControl>>,
}

impl DamageCoordinator {
    /// Create a coordinator with no listeners and no display control
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            display_control: None,
        }
    }

    /// Register a downstream listener (appended; fan-out preserves order)
    pub fn add_listener(&mut self, listener: Arc<dyn DamageListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Install or clear the upstream display control handle
    pub fn set_display_control(&mut self, control: Option<Arc<dyn DisplayControl>>) {
        self.display_control = control;
    }

    /// Whether a display control channel is currently available
    pub fn has_display_control(&self) -> bool {
        self.display_control.is_some()
    }

    /// Clamp and fan out one damage report.
    ///
    /// Raw coordinates may be negative or empty; the clamped rectangle is
    /// what listeners receive.
    pub fn damage(&self, x: i32, y: i32, width: i32, height: i32) {
        let rect = Rect::clamped(x, y, width, height);
        trace!(?rect, "damage");
        for listener in &self.listeners {
            listener.damaged(rect);
        }
    }

    /// Mark the whole framebuffer damaged
    pub fn full_repaint(&self, width: u32, height: u32) {
        debug!(width, height, "full repaint");
        let rect = Rect::full(width, height);
        for listener in &self.listeners {
            listener.damaged(rect);
        }
    }

    /// Forward a downstream resize request upstream.
    ///
    /// `screens` are the viewer's requested screen regions; one monitor
    /// layout entry is built per region, the first marked primary. An
    /// empty slice degrades to a single full-surface monitor. Returns
    /// [`ResizeOutcome::NotApplied`] when no display control channel was
    /// negotiated; the viewer keeps its current geometry in that case.
    pub fn request_resize(
        &self,
        width: u32,
        height: u32,
        screens: &[Rect],
    ) -> Result<ResizeOutcome, DisplayControlError> {
        let Some(control) = &self.display_control else {
            debug!(width, height, "resize request dropped, no display control channel");
            return Ok(ResizeOutcome::NotApplied);
        };

        let layout = if screens.is_empty() {
            ScreenLayout::single(width, height)
        } else {
            ScreenLayout {
                monitors: screens
                    .iter()
                    .enumerate()
                    .map(|(i, screen)| MonitorLayout {
                        id: i as u32,
                        x: screen.x as i32,
                        y: screen.y as i32,
                        width: screen.width,
                        height: screen.height,
                        is_primary: i == 0,
                    })
                    .collect(),
            }
        };
        control.request_layout(&layout.monitors)?;
        debug!(
            width,
            height,
            monitors = layout.monitors.len(),
            "resize request forwarded upstream"
        );
        Ok(ResizeOutcome::Applied)
    }

    /// Notify listeners that the framebuffer geometry changed
    pub fn notify_resized(&self, width: u32, height: u32, client_initiated: bool) {
        debug!(width, height, client_initiated, "resized");
        for listener in &self.listeners {
            listener.resized(width, height, client_initiated);
        }
    }

    /// Notify listeners of a new cursor image
    pub fn notify_cursor_changed(&self, shape: &CursorShape) {
        for listener in &self.listeners {
            listener.cursor_changed(shape);
        }
    }

    /// Notify listeners of a cursor position change
    pub fn notify_cursor_moved(&self, x: u32, y: u32) {
        for listener in &self.listeners {
            listener.cursor_moved(x, y);
        }
    }
}

impl Default for DamageCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
