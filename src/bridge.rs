//! Display Bridge
//!
//! The shared state both protocol engines operate on, behind the two
//! facade traits:
//!
//! ```text
//!              RdpDisplay                    DisplayDriver
//! upstream  ---------------> DisplayBridge <--------------- downstream
//! (renders pixels, cursor,   (framebuffer,   (reads pixels, injects
//!  damage, resizes)           pointer,        input, cut text, resize
//!                             translator)     requests)
//! ```
//!
//! Locking: the framebuffer, pointer and input translator share one
//! mutex; the damage coordinator and the input listener list sit behind
//! their own read/write locks so listener callbacks never run inside the
//! state lock. Fan-out always operates on a snapshot taken under the
//! lock, so a listener is free to read the framebuffer back or register
//! further listeners from inside its callback; a listener registered
//! mid-fan-out joins from the next event on.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::clipboard::{ClipboardChannel, ClipboardForwarder};
use crate::color::ColorModel;
use crate::config::Config;
use crate::damage::{DamageCoordinator, DamageListener, DisplayControl, ResizeOutcome};
use crate::framebuffer::{Framebuffer, FramebufferError, Image};
use crate::geometry::Rect;
use crate::input::translator::{self, InputListener, InputTranslator};
use crate::pointer::{CursorShape, PointerShape};

// ============================================================================
// Facade traits
// ============================================================================

/// Upstream callback surface: what the remote session draws into.
///
/// Implemented by [`DisplayBridge`]; the upstream engine holds it as
/// `Arc<dyn RdpDisplay>` and drives it from its protocol loop.
pub trait RdpDisplay: Send + Sync {
    /// Write one pixel (palette index or RGB per the installed color
    /// model); out-of-bounds writes are dropped
    fn write_pixel(&self, x: u32, y: u32, value: u32);

    /// Write a rectangular block, mapping `pixels` in place through the
    /// installed color model
    fn write_block(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &mut [u32],
    ) -> Result<(), FramebufferError>;

    /// Write a rectangular block of direct RGB values, bypassing the
    /// color model
    fn write_block_raw(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u32],
    ) -> Result<(), FramebufferError>;

    /// Report a changed region (raw coordinates, clamped before fan-out)
    fn damage(&self, x: i32, y: i32, width: i32, height: i32);

    /// Report the whole surface changed
    fn full_repaint(&self);

    /// Install a new cursor image; the pointer position is unchanged
    fn set_cursor(&self, shape: CursorShape);

    /// Report a server-side pointer move
    fn move_cursor(&self, x: u32, y: u32);

    /// The remote desktop changed size; always applied.
    ///
    /// `client_initiated` marks a change the downstream side itself
    /// requested (the upstream echoing a forwarded resize back), so the
    /// viewer server can avoid notifying the originating client twice.
    fn display_resized(&self, width: u32, height: u32, client_initiated: bool);

    /// Install or clear the indexed color model
    fn set_color_model(&self, model: Option<ColorModel>);

    /// Register a receiver for synthesized input events (appended;
    /// fan-out preserves order)
    fn add_input_listener(&self, listener: Arc<dyn InputListener>);
}

/// Downstream capability surface: what the viewer server exposes a
/// desktop from.
///
/// Implemented by [`DisplayBridge`]; the downstream engine holds it as
/// `Arc<dyn DisplayDriver>`.
pub trait DisplayDriver: Send + Sync {
    /// Current framebuffer width
    fn width(&self) -> u32;

    /// Current framebuffer height
    fn height(&self) -> u32;

    /// Desktop name presented to viewers
    fn desktop_name(&self) -> String;

    /// Read one pixel; returns the palette index when an indexed color
    /// model is installed
    fn read_pixel(&self, x: u32, y: u32) -> Result<u32, FramebufferError>;

    /// Read a rectangular block of direct RGB values
    fn read_block(&self, rect: Rect) -> Result<Vec<u32>, FramebufferError>;

    /// Copy a region out as an owned image
    fn subimage(&self, rect: Rect) -> Result<Image, FramebufferError>;

    /// Current cursor image
    fn pointer_shape(&self) -> CursorShape;

    /// Current pointer position
    fn pointer_position(&self) -> (u32, u32);

    /// Inject one viewer key event
    fn key_event(&self, code: u32, down: bool);

    /// Inject one viewer pointer event
    fn pointer_event(&self, button_mask: u8, x: u32, y: u32);

    /// Forward viewer cut text toward the upstream clipboard
    fn set_clipboard_text(&self, text: &str);

    /// Ask the upstream desktop to adopt a new geometry
    fn request_resize(&self, width: u32, height: u32, screens: &[Rect]) -> ResizeOutcome;

    /// Register a receiver for damage, resize and cursor changes
    /// (appended; fan-out preserves order)
    fn add_damage_listener(&self, listener: Arc<dyn DamageListener>);
}

// ============================================================================
// Bridge
// ============================================================================

struct BridgeState {
    framebuffer: Framebuffer,
    pointer: PointerShape,
    translator: InputTranslator,
    clipboard: ClipboardForwarder,
}

/// Shared display and input state bridging the two engines.
///
/// Constructed once per session; both engines receive the same `Arc`
/// through their respective facade traits.
pub struct DisplayBridge {
    state: Mutex<BridgeState>,
    damage: RwLock<DamageCoordinator>,
    input_listeners: RwLock<Vec<Arc<dyn InputListener>>>,
    desktop_name: String,
}

impl DisplayBridge {
    /// Create a bridge sized and tuned from the configuration
    pub fn new(config: &Config) -> Self {
        let mut framebuffer = Framebuffer::new(config.initial_width, config.initial_height);
        framebuffer.set_strict_color(config.color_strict);
        Self {
            state: Mutex::new(BridgeState {
                framebuffer,
                pointer: PointerShape::new(),
                translator: InputTranslator::new(),
                clipboard: ClipboardForwarder::new(config.clipboard),
            }),
            damage: RwLock::new(DamageCoordinator::new()),
            input_listeners: RwLock::new(Vec::new()),
            desktop_name: config.desktop_name.clone(),
        }
    }

    /// Attach the channels the upstream session negotiated.
    ///
    /// Called by the orchestrator once connect completes; either handle
    /// may be absent when the peer declined the capability.
    pub fn attach_channels(
        &self,
        display_control: Option<Arc<dyn DisplayControl>>,
        clipboard: Option<Arc<dyn ClipboardChannel>>,
    ) {
        debug!(
            display_control = display_control.is_some(),
            clipboard = clipboard.is_some(),
            "attaching negotiated channels"
        );
        self.damage.write().set_display_control(display_control);
        self.state.lock().clipboard.set_channel(clipboard);
    }

    /// Drop held input state and negotiated channels (session teardown)
    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.translator.reset();
        state.clipboard.set_channel(None);
        drop(state);
        self.damage.write().set_display_control(None);
    }

    // Fan-out runs on snapshots, never under a listener-list lock;
    // listeners may register further listeners from their callbacks.
    fn damage_snapshot(&self) -> DamageCoordinator {
        self.damage.read().clone()
    }

    fn dispatch_input(&self, events: &[translator::InputEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self.input_listeners.read().clone();
        translator::dispatch(&listeners, events);
    }
}

impl RdpDisplay for DisplayBridge {
    fn write_pixel(&self, x: u32, y: u32, value: u32) {
        self.state.lock().framebuffer.write(x, y, value);
    }

    fn write_block(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &mut [u32],
    ) -> Result<(), FramebufferError> {
        self.state
            .lock()
            .framebuffer
            .write_block(x, y, width, height, pixels)
    }

    fn write_block_raw(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u32],
    ) -> Result<(), FramebufferError> {
        self.state
            .lock()
            .framebuffer
            .write_block_raw(x, y, width, height, pixels)
    }

    fn damage(&self, x: i32, y: i32, width: i32, height: i32) {
        self.damage_snapshot().damage(x, y, width, height);
    }

    fn full_repaint(&self) {
        let (width, height) = {
            let state = self.state.lock();
            (state.framebuffer.width(), state.framebuffer.height())
        };
        self.damage_snapshot().full_repaint(width, height);
    }

    fn set_cursor(&self, shape: CursorShape) {
        self.state.lock().pointer.set_shape(shape.clone());
        self.damage_snapshot().notify_cursor_changed(&shape);
    }

    fn move_cursor(&self, x: u32, y: u32) {
        self.state.lock().pointer.set_position(x, y);
        self.damage_snapshot().notify_cursor_moved(x, y);
    }

    fn display_resized(&self, width: u32, height: u32, client_initiated: bool) {
        {
            let mut state = self.state.lock();
            state.framebuffer.resize(width, height);
        }
        self.damage_snapshot()
            .notify_resized(width, height, client_initiated);
    }

    fn set_color_model(&self, model: Option<ColorModel>) {
        self.state.lock().framebuffer.set_color_model(model);
    }

    fn add_input_listener(&self, listener: Arc<dyn InputListener>) {
        self.input_listeners.write().push(listener);
    }
}

impl DisplayDriver for DisplayBridge {
    fn width(&self) -> u32 {
        self.state.lock().framebuffer.width()
    }

    fn height(&self) -> u32 {
        self.state.lock().framebuffer.height()
    }

    fn desktop_name(&self) -> String {
        self.desktop_name.clone()
    }

    fn read_pixel(&self, x: u32, y: u32) -> Result<u32, FramebufferError> {
        self.state.lock().framebuffer.read(x, y)
    }

    fn read_block(&self, rect: Rect) -> Result<Vec<u32>, FramebufferError> {
        self.state.lock().framebuffer.read_block(rect)
    }

    fn subimage(&self, rect: Rect) -> Result<Image, FramebufferError> {
        self.state.lock().framebuffer.subimage(rect)
    }

    fn pointer_shape(&self) -> CursorShape {
        self.state.lock().pointer.shape().clone()
    }

    fn pointer_position(&self) -> (u32, u32) {
        self.state.lock().pointer.position()
    }

    fn key_event(&self, code: u32, down: bool) {
        let events = self.state.lock().translator.key_event(code, down);
        self.dispatch_input(&events);
    }

    fn pointer_event(&self, button_mask: u8, x: u32, y: u32) {
        let events = {
            let mut state = self.state.lock();
            let BridgeState {
                translator, pointer, ..
            } = &mut *state;
            translator.pointer_event(button_mask, x, y, pointer)
        };
        self.dispatch_input(&events);
    }

    fn set_clipboard_text(&self, text: &str) {
        if let Err(err) = self.state.lock().clipboard.forward_text(text) {
            warn!(%err, "dropping cut text after channel failure");
        }
    }

    fn request_resize(&self, width: u32, height: u32, screens: &[Rect]) -> ResizeOutcome {
        let damage = self.damage_snapshot();
        let outcome = match damage.request_resize(width, height, screens) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, width, height, "resize request failed upstream");
                return ResizeOutcome::NotApplied;
            }
        };
        if outcome == ResizeOutcome::Applied {
            self.state.lock().framebuffer.resize(width, height);
            damage.notify_resized(width, height, true);
        }
        outcome
    }

    fn add_damage_listener(&self, listener: Arc<dyn DamageListener>) {
        self.damage.write().add_listener(listener);
    }
}
