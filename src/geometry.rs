//! Screen Geometry Primitives
//!
//! Rectangles and monitor layouts shared by the framebuffer, the damage
//! coordinator and the resize negotiation path. The virtual desktop is one
//! or more rectangular regions; region 0 is always the primary monitor.

use serde::{Deserialize, Serialize};

/// A rectangular region in framebuffer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the region (pixels from left)
    pub x: u32,
    /// Y coordinate of the region (pixels from top)
    pub y: u32,
    /// Width of the region in pixels
    pub width: u32,
    /// Height of the region in pixels
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle
    #[inline]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering an entire `width`×`height` surface
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Build a rectangle from possibly-negative protocol coordinates.
    ///
    /// Origin is clamped to (0, 0) and the extent to a minimum of 1×1.
    /// Upstream paint notifications occasionally arrive with a negative
    /// origin or a zero extent and still denote a real repaint.
    pub fn clamped(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x: x.max(0) as u32,
            y: y.max(0) as u32,
            width: width.max(1) as u32,
            height: height.max(1) as u32,
        }
    }

    /// Area of this rectangle in pixels
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge. Widened so a rect whose origin sits near the
    /// coordinate limit still compares correctly.
    #[inline]
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge, widened like [`Rect::right`]
    #[inline]
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Check whether `other` lies entirely within this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Check whether this rectangle contains a point
    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && (x as u64) < self.right() && y >= self.y && (y as u64) < self.bottom()
    }

    /// Bounding box of two rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Rect {
            x,
            y,
            width: (right - x as u64) as u32,
            height: (bottom - y as u64) as u32,
        }
    }
}

/// One logical display within a multi-monitor screen layout.
///
/// Viewer resize requests carry one of these per screen-detail region;
/// the first region is flagged primary when the layout is sent upstream
/// over the display-control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorLayout {
    /// Monitor identifier (index within the requested layout)
    pub id: u32,

    /// X position in virtual desktop (pixels)
    pub x: i32,
    /// Y position in virtual desktop (pixels)
    pub y: i32,

    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,

    /// Is primary monitor
    pub is_primary: bool,
}

/// Screen layout: one or more monitor regions, primary at index 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLayout {
    /// Monitor regions, primary first
    pub monitors: Vec<MonitorLayout>,
}

impl ScreenLayout {
    /// Single-monitor layout at the origin
    pub fn single(width: u32, height: u32) -> Self {
        Self {
            monitors: vec![MonitorLayout {
                id: 0,
                x: 0,
                y: 0,
                width,
                height,
                is_primary: true,
            }],
        }
    }

    /// The primary monitor (always index 0)
    pub fn primary(&self) -> &MonitorLayout {
        &self.monitors[0]
    }

    /// Bounding box of all monitor regions
    pub fn bounds(&self) -> (u32, u32) {
        let mut width = 0u32;
        let mut height = 0u32;
        for m in &self.monitors {
            width = width.max((m.x.max(0) as u32).saturating_add(m.width));
            height = height.max((m.y.max(0) as u32).saturating_add(m.height));
        }
        (width, height)
    }
}
