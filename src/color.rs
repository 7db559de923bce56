//! Indexed Color Model Adapter
//!
//! Converts between palette indices and direct RGB. Present only when the
//! upstream session negotiated indexed color (8 bpp); direct-color sessions
//! never construct one.
//!
//! The reverse lookup is inherently lossy: a palette may contain duplicate
//! entries, and an RGB value painted through a drawing primitive may not
//! exist in the palette at all. Round-trip mismatches are tolerated by
//! default and surfaced to the caller as a boolean so the framebuffer can
//! decide whether to warn or fail (see `Config::color_strict`).

use tracing::warn;

/// RGB mask applied before palette comparisons (alpha is ignored)
const RGB_MASK: u32 = 0x00FF_FFFF;

/// Indexed palette mapping indices to direct RGB values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorModel {
    /// Palette entries, 0x00RRGGBB
    palette: Vec<u32>,
}

impl ColorModel {
    /// Create a color model from palette entries (0x00RRGGBB each)
    pub fn new(palette: Vec<u32>) -> Self {
        Self {
            palette: palette.into_iter().map(|c| c & RGB_MASK).collect(),
        }
    }

    /// Number of palette entries
    pub fn len(&self) -> usize {
        self.palette.len()
    }

    /// True when the palette is empty
    pub fn is_empty(&self) -> bool {
        self.palette.is_empty()
    }

    /// Resolve a palette index to its direct RGB value.
    ///
    /// Indices outside the palette resolve to black, matching the
    /// degrade-gracefully policy for malformed upstream data.
    pub fn rgb(&self, index: u32) -> u32 {
        match self.palette.get(index as usize) {
            Some(&rgb) => rgb,
            None => {
                warn!(index, palette_len = self.palette.len(), "palette index out of range");
                0
            }
        }
    }

    /// Reverse lookup: find the palette index whose entry is nearest to
    /// `rgb` (exact match preferred, then minimal per-channel distance).
    pub fn index_of(&self, rgb: u32) -> u32 {
        let rgb = rgb & RGB_MASK;

        let mut best = 0u32;
        let mut best_dist = u32::MAX;
        for (i, &entry) in self.palette.iter().enumerate() {
            if entry == rgb {
                return i as u32;
            }
            let dist = channel_distance(entry, rgb);
            if dist < best_dist {
                best_dist = dist;
                best = i as u32;
            }
        }
        best
    }

    /// Check that `index` maps back to exactly `rgb`
    pub fn round_trips(&self, index: u32, rgb: u32) -> bool {
        self.rgb(index) == rgb & RGB_MASK
    }
}

/// Sum of squared per-channel differences
fn channel_distance(a: u32, b: u32) -> u32 {
    let dr = ((a >> 16) & 0xFF) as i32 - ((b >> 16) & 0xFF) as i32;
    let dg = ((a >> 8) & 0xFF) as i32 - ((b >> 8) & 0xFF) as i32;
    let db = (a & 0xFF) as i32 - (b & 0xFF) as i32;
    (dr * dr + dg * dg + db * db) as u32
}
