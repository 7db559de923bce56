//! Pointer Shape State
//!
//! Current cursor bitmap, hotspot and position. The shape is replaced
//! wholesale on each upstream cursor-change callback; the position is
//! updated independently on each downstream pointer-move event, so a shape
//! replacement never resets where the pointer is.

/// A cursor bitmap with its hotspot, as delivered by the upstream session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorShape {
    /// Hotspot X offset within the bitmap
    pub hot_x: u32,
    /// Hotspot Y offset within the bitmap
    pub hot_y: u32,
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Row-major 0xAARRGGBB bitmap data
    pub data: Vec<u32>,
}

impl CursorShape {
    /// The empty 16×16 fully transparent cursor used at bridge start and
    /// whenever the upstream session clears the cursor
    pub fn empty() -> Self {
        Self {
            hot_x: 0,
            hot_y: 0,
            width: 16,
            height: 16,
            data: vec![0; 16 * 16],
        }
    }
}

/// Pointer state: the current shape plus the last-reported position
#[derive(Debug, Clone)]
pub struct PointerShape {
    shape: CursorShape,
    x: u32,
    y: u32,
}

impl PointerShape {
    /// Create the initial pointer state (empty shape at the origin)
    pub fn new() -> Self {
        Self {
            shape: CursorShape::empty(),
            x: 0,
            y: 0,
        }
    }

    /// Replace the cursor shape, keeping the current position
    pub fn set_shape(&mut self, shape: CursorShape) {
        self.shape = shape;
    }

    /// Reset to the empty transparent cursor
    pub fn clear_shape(&mut self) {
        self.shape = CursorShape::empty();
    }

    /// Current cursor shape
    pub fn shape(&self) -> &CursorShape {
        &self.shape
    }

    /// Current pointer position
    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    /// Record a new pointer position (downstream move events)
    pub fn set_position(&mut self, x: u32, y: u32) {
        self.x = x;
        self.y = y;
    }
}

impl Default for PointerShape {
    fn default() -> Self {
        Self::new()
    }
}
