//! Shared Framebuffer
//!
//! The single pixel store shared by the upstream paint path and the
//! downstream serving path. Exactly one live instance exists per session;
//! geometry changes replace the buffer wholesale (old contents blitted at
//! the origin) rather than resizing in place.
//!
//! # Color model discipline
//!
//! When the upstream session negotiated indexed color, a [`ColorModel`] is
//! attached. Every write then maps palette indices to direct RGB before
//! storage, and scalar reads reverse the mapping so the caller gets an
//! index back. The reverse lookup is verified: a mismatch is logged and
//! tolerated by default (lossy fallback), or reported as an error when
//! strict color was requested.
//!
//! # Locking
//!
//! The framebuffer itself is not synchronized; the bridge wraps it (with
//! the pointer and input state) in one mutex so a resize can never
//! interleave with a read or write. See the bridge module.

use thiserror::Error;
use tracing::{debug, warn};

use crate::color::ColorModel;
use crate::geometry::Rect;

/// Framebuffer error types
#[derive(Error, Debug)]
pub enum FramebufferError {
    /// Coordinates or rectangle outside current geometry
    #[error("out of bounds: {rect:?} exceeds {width}x{height}")]
    OutOfBounds {
        /// Offending rectangle
        rect: Rect,
        /// Current framebuffer width
        width: u32,
        /// Current framebuffer height
        height: u32,
    },

    /// Pixel buffer length does not match the block dimensions
    #[error("bad block length: got {got} pixels, expected {expected}")]
    BadBlockLength {
        /// Supplied buffer length
        got: usize,
        /// Expected `width * height`
        expected: usize,
    },

    /// Indexed round-trip failed under strict color fidelity
    #[error("palette round-trip mismatch at ({x}, {y}): stored {stored:#08x}, recovered {recovered:#08x}")]
    ColorMismatch {
        /// Pixel X coordinate
        x: u32,
        /// Pixel Y coordinate
        y: u32,
        /// RGB value stored in the buffer
        stored: u32,
        /// RGB value the recovered index maps back to
        recovered: u32,
    },
}

/// Result type for framebuffer operations
pub type Result<T> = std::result::Result<T, FramebufferError>;

/// An owned read-only copy of a framebuffer region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major pixel data, 0x00RRGGBB
    pub pixels: Vec<u32>,
}

/// The shared pixel store
pub struct Framebuffer {
    width: u32,
    height: u32,
    /// Row-major 0x00RRGGBB, always direct RGB regardless of color model
    pixels: Vec<u32>,
    color_model: Option<ColorModel>,
    /// Treat round-trip mismatches as errors instead of lossy fallbacks
    strict_color: bool,
}

impl Framebuffer {
    /// Create a framebuffer with the given geometry (clamped to 1×1 minimum)
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize)],
            color_model: None,
            strict_color: false,
        }
    }

    /// Current width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rectangle covering the whole buffer
    pub fn bounds(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Install or remove the indexed color model
    pub fn set_color_model(&mut self, model: Option<ColorModel>) {
        self.color_model = model;
    }

    /// Active color model, if the session negotiated indexed color
    pub fn color_model(&self) -> Option<&ColorModel> {
        self.color_model.as_ref()
    }

    /// Enable strict color fidelity (round-trip mismatches become errors)
    pub fn set_strict_color(&mut self, strict: bool) {
        self.strict_color = strict;
    }

    /// Store one pixel. `color` is a palette index when a color model is
    /// active, otherwise direct RGB. Out-of-bounds writes are dropped.
    pub fn write(&mut self, x: u32, y: u32, color: u32) {
        if x >= self.width || y >= self.height {
            debug!(x, y, "dropping out-of-bounds pixel write");
            return;
        }
        let rgb = match &self.color_model {
            Some(cm) => cm.rgb(color),
            None => color,
        };
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)] = rgb;
    }

    /// Store a rectangular block of pixels.
    ///
    /// When a color model is active the entire input buffer is mapped to
    /// direct RGB in place before storage; callers must not assume
    /// `pixels` is left unmodified.
    pub fn write_block(&mut self, x: u32, y: u32, w: u32, h: u32, pixels: &mut [u32]) -> Result<()> {
        if let Some(cm) = &self.color_model {
            for px in pixels.iter_mut() {
                *px = cm.rgb(*px);
            }
        }
        self.store_block(x, y, w, h, pixels)
    }

    /// Store a block without color conversion, for callers that already
    /// produced raw RGB (avoids double conversion on intra-buffer copies).
    pub fn write_block_raw(&mut self, x: u32, y: u32, w: u32, h: u32, pixels: &[u32]) -> Result<()> {
        self.store_block(x, y, w, h, pixels)
    }

    fn store_block(&mut self, x: u32, y: u32, w: u32, h: u32, pixels: &[u32]) -> Result<()> {
        let rect = Rect::new(x, y, w, h);
        let expected = (w as usize) * (h as usize);
        if pixels.len() != expected {
            return Err(FramebufferError::BadBlockLength {
                got: pixels.len(),
                expected,
            });
        }
        if !self.bounds().contains_rect(&rect) {
            return Err(FramebufferError::OutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        let stride = self.width as usize;
        for row in 0..h as usize {
            let src = row * w as usize;
            let dst = (y as usize + row) * stride + x as usize;
            self.pixels[dst..dst + w as usize].copy_from_slice(&pixels[src..src + w as usize]);
        }
        Ok(())
    }

    /// Read one pixel.
    ///
    /// Returns direct RGB, or the recovered palette index when a color
    /// model is active. The recovered index is verified against the stored
    /// RGB value; a mismatch is a deliberate lossy-compression tolerance
    /// and only logs a warning, unless strict color was enabled.
    pub fn read(&self, x: u32, y: u32) -> Result<u32> {
        let rect = Rect::new(x, y, 1, 1);
        if x >= self.width || y >= self.height {
            return Err(FramebufferError::OutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        let stored = self.pixels[(y as usize) * (self.width as usize) + (x as usize)];
        match &self.color_model {
            None => Ok(stored),
            Some(cm) => {
                let index = cm.index_of(stored);
                let recovered = cm.rgb(index);
                if recovered != stored {
                    if self.strict_color {
                        return Err(FramebufferError::ColorMismatch {
                            x,
                            y,
                            stored,
                            recovered,
                        });
                    }
                    warn!(
                        x,
                        y,
                        stored = format_args!("{stored:#08x}"),
                        recovered = format_args!("{recovered:#08x}"),
                        "palette round-trip mismatch, returning nearest index"
                    );
                }
                Ok(index)
            }
        }
    }

    /// Read a rectangular block as direct RGB (no reverse palette lookup)
    pub fn read_block(&self, rect: Rect) -> Result<Vec<u32>> {
        if !self.bounds().contains_rect(&rect) {
            return Err(FramebufferError::OutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        let stride = self.width as usize;
        let mut out = Vec::with_capacity(rect.area() as usize);
        for row in 0..rect.height as usize {
            let start = (rect.y as usize + row) * stride + rect.x as usize;
            out.extend_from_slice(&self.pixels[start..start + rect.width as usize]);
        }
        Ok(out)
    }

    /// Read-only copy bounded to `rect`
    pub fn subimage(&self, rect: Rect) -> Result<Image> {
        let pixels = self.read_block(rect)?;
        Ok(Image {
            width: rect.width,
            height: rect.height,
            pixels,
        })
    }

    /// Replace the buffer with a new one of the given geometry (minimum
    /// 1×1), blitting prior contents at the origin. Must not run
    /// concurrently with any read or write; the bridge's lock guarantees
    /// this.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        let new_width = new_width.max(1);
        let new_height = new_height.max(1);
        if new_width == self.width && new_height == self.height {
            return;
        }

        debug!(
            from = format_args!("{}x{}", self.width, self.height),
            to = format_args!("{new_width}x{new_height}"),
            "replacing framebuffer"
        );

        let mut pixels = vec![0u32; (new_width as usize) * (new_height as usize)];
        let copy_w = self.width.min(new_width) as usize;
        let copy_h = self.height.min(new_height) as usize;
        for row in 0..copy_h {
            let src = row * self.width as usize;
            let dst = row * new_width as usize;
            pixels[dst..dst + copy_w].copy_from_slice(&self.pixels[src..src + copy_w]);
        }

        self.width = new_width;
        self.height = new_height;
        self.pixels = pixels;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorModel;

    #[test]
    fn test_write_read_roundtrip() {
        let mut fb = Framebuffer::new(64, 48);
        fb.write(10, 20, 0x123456);
        assert_eq!(fb.read(10, 20).unwrap(), 0x123456);
    }

    #[test]
    fn test_minimum_geometry() {
        let fb = Framebuffer::new(0, 0);
        assert_eq!(fb.width(), 1);
        assert_eq!(fb.height(), 1);
    }

    #[test]
    fn test_out_of_bounds_write_dropped() {
        let mut fb = Framebuffer::new(8, 8);
        fb.write(8, 0, 0xFFFFFF);
        fb.write(0, 100, 0xFFFFFF);
        assert_eq!(fb.read(7, 7).unwrap(), 0);
    }

    #[test]
    fn test_out_of_bounds_read_fails() {
        let fb = Framebuffer::new(8, 8);
        assert!(matches!(
            fb.read(8, 0),
            Err(FramebufferError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_write_block() {
        let mut fb = Framebuffer::new(16, 16);
        let mut block = vec![0xAA00BB; 4 * 2];
        fb.write_block(2, 3, 4, 2, &mut block).unwrap();
        assert_eq!(fb.read(2, 3).unwrap(), 0xAA00BB);
        assert_eq!(fb.read(5, 4).unwrap(), 0xAA00BB);
        assert_eq!(fb.read(6, 3).unwrap(), 0);
    }

    #[test]
    fn test_write_block_bad_length() {
        let mut fb = Framebuffer::new(16, 16);
        let mut block = vec![0u32; 7];
        assert!(matches!(
            fb.write_block(0, 0, 4, 2, &mut block),
            Err(FramebufferError::BadBlockLength { got: 7, expected: 8 })
        ));
    }

    #[test]
    fn test_write_block_out_of_bounds() {
        let mut fb = Framebuffer::new(16, 16);
        let mut block = vec![0u32; 4 * 4];
        assert!(matches!(
            fb.write_block(14, 0, 4, 4, &mut block),
            Err(FramebufferError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_block_write_at_coordinate_limit_is_out_of_bounds() {
        let mut fb = Framebuffer::new(8, 8);
        assert!(matches!(
            fb.write_block_raw(u32::MAX, 0, 2, 1, &[0, 0]),
            Err(FramebufferError::OutOfBounds { .. })
        ));
        let mut block = [0u32, 0];
        assert!(matches!(
            fb.write_block(u32::MAX, 0, 2, 1, &mut block),
            Err(FramebufferError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_read_at_coordinate_limit_is_out_of_bounds() {
        let fb = Framebuffer::new(8, 8);
        assert!(matches!(
            fb.subimage(Rect::new(u32::MAX, 0, 2, 1)),
            Err(FramebufferError::OutOfBounds { .. })
        ));
        assert!(matches!(
            fb.read_block(Rect::new(0, u32::MAX, 1, 2)),
            Err(FramebufferError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_indexed_write_converts_block_in_place() {
        let mut fb = Framebuffer::new(8, 8);
        fb.set_color_model(Some(ColorModel::new(vec![0x000000, 0xFF0000])));
        let mut block = vec![1u32; 4];
        fb.write_block(0, 0, 2, 2, &mut block).unwrap();
        // Input buffer was mapped in place to RGB
        assert_eq!(block, vec![0xFF0000; 4]);
        // Raw block reads return RGB, not indices
        assert_eq!(fb.read_block(Rect::new(0, 0, 2, 2)).unwrap(), vec![0xFF0000; 4]);
    }

    #[test]
    fn test_indexed_read_returns_index() {
        let mut fb = Framebuffer::new(8, 8);
        fb.set_color_model(Some(ColorModel::new(vec![0x000000, 0xFF0000, 0x00FF00])));
        fb.write(1, 1, 2);
        assert_eq!(fb.read(1, 1).unwrap(), 2);
    }

    #[test]
    fn test_indexed_lossy_roundtrip_tolerated() {
        let mut fb = Framebuffer::new(8, 8);
        fb.set_color_model(Some(ColorModel::new(vec![0x000000, 0xFF0000])));
        // Store a raw RGB value not present in the palette
        fb.write_block_raw(0, 0, 1, 1, &[0xFE0101]).unwrap();
        // Lossy fallback: nearest index, no error
        assert_eq!(fb.read(0, 0).unwrap(), 1);
    }

    #[test]
    fn test_indexed_strict_roundtrip_fails() {
        let mut fb = Framebuffer::new(8, 8);
        fb.set_color_model(Some(ColorModel::new(vec![0x000000, 0xFF0000])));
        fb.set_strict_color(true);
        fb.write_block_raw(0, 0, 1, 1, &[0xFE0101]).unwrap();
        assert!(matches!(
            fb.read(0, 0),
            Err(FramebufferError::ColorMismatch { .. })
        ));
    }

    #[test]
    fn test_write_block_raw_skips_conversion() {
        let mut fb = Framebuffer::new(8, 8);
        fb.set_color_model(Some(ColorModel::new(vec![0x000000, 0xFF0000])));
        fb.write_block_raw(0, 0, 1, 1, &[0xFF0000]).unwrap();
        assert_eq!(fb.read(0, 0).unwrap(), 1);
    }

    #[test]
    fn test_resize_preserves_overlap() {
        let mut fb = Framebuffer::new(10, 10);
        fb.write(3, 4, 0xCAFE42);
        fb.write(9, 9, 0x424242);

        fb.resize(6, 6);
        assert_eq!(fb.width(), 6);
        assert_eq!(fb.height(), 6);
        assert_eq!(fb.read(3, 4).unwrap(), 0xCAFE42);
        assert!(fb.read(9, 9).is_err());

        fb.resize(20, 20);
        assert_eq!(fb.read(3, 4).unwrap(), 0xCAFE42);
        assert_eq!(fb.read(19, 19).unwrap(), 0);
    }

    #[test]
    fn test_resize_minimum() {
        let mut fb = Framebuffer::new(10, 10);
        fb.resize(0, 0);
        assert_eq!(fb.width(), 1);
        assert_eq!(fb.height(), 1);
    }

    #[test]
    fn test_subimage() {
        let mut fb = Framebuffer::new(8, 8);
        fb.write(2, 2, 0x111111);
        fb.write(3, 3, 0x222222);
        let img = fb.subimage(Rect::new(2, 2, 2, 2)).unwrap();
        assert_eq!(img.width, 2);
        assert_eq!(img.height, 2);
        assert_eq!(img.pixels, vec![0x111111, 0, 0, 0x222222]);
    }

    #[test]
    fn test_subimage_out_of_bounds() {
        let fb = Framebuffer::new(8, 8);
        assert!(matches!(
            fb.subimage(Rect::new(4, 4, 8, 8)),
            Err(FramebufferError::OutOfBounds { .. })
        ));
    }
}
