//! Clipboard Forwarding
//!
//! One-way text clipboard bridging from the downstream viewer to the
//! upstream session. Each forwarded payload is announced under a
//! sequence-numbered name so the upstream peer can distinguish
//! successive offers; the counter is per bridge, never shared across
//! sessions.

use std::sync::Arc;

use tracing::{debug, warn};

/// Clipboard channel failures
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The channel was negotiated but has since closed
    #[error("clipboard channel closed")]
    ChannelClosed,

    /// The payload could not be delivered
    #[error("clipboard send failed: {reason}")]
    SendFailed {
        /// Channel-supplied failure detail
        reason: String,
    },
}

/// Handle for pushing clipboard text to the upstream session.
///
/// Offered by the upstream engine only when clipboard redirection was
/// negotiated.
pub trait ClipboardChannel: Send + Sync {
    /// Offer `text` to the upstream clipboard under the given
    /// announcement name
    fn set_text(&self, name: &str, text: &str) -> Result<(), ClipboardError>;
}

/// Outcome of one forwarding attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOutcome {
    /// The text was handed to the upstream channel
    Forwarded,
    /// Forwarding is disabled by configuration
    Disabled,
    /// No clipboard channel was negotiated
    Unavailable,
}

/// Forwards downstream cut text to the upstream clipboard channel
pub struct ClipboardForwarder {
    channel: Option<Arc<dyn ClipboardChannel>>,
    enabled: bool,
    sequence: u64,
}

impl ClipboardForwarder {
    /// Create a forwarder with no channel attached
    pub fn new(enabled: bool) -> Self {
        Self {
            channel: None,
            enabled,
            sequence: 0,
        }
    }

    /// Install or clear the upstream channel handle
    pub fn set_channel(&mut self, channel: Option<Arc<dyn ClipboardChannel>>) {
        self.channel = channel;
    }

    /// Whether a channel is currently attached
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Number of payloads forwarded so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Forward one cut-text payload upstream.
    ///
    /// Disabled or channel-less bridges drop the payload without error;
    /// only an attached channel that fails to deliver surfaces one.
    pub fn forward_text(&mut self, text: &str) -> Result<ClipboardOutcome, ClipboardError> {
        if !self.enabled {
            debug!("clipboard forwarding disabled, dropping cut text");
            return Ok(ClipboardOutcome::Disabled);
        }
        let Some(channel) = &self.channel else {
            debug!("no clipboard channel negotiated, dropping cut text");
            return Ok(ClipboardOutcome::Unavailable);
        };

        self.sequence += 1;
        let name = format!("clip-{}", self.sequence);
        if let Err(err) = channel.set_text(&name, text) {
            warn!(%err, "clipboard forward failed");
            return Err(err);
        }
        debug!(name, len = text.len(), "clipboard text forwarded");
        Ok(ClipboardOutcome::Forwarded)
    }
}
