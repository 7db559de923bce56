//! Pointer Button Translation
//!
//! Downstream pointer events carry an 8-bit mask of currently-pressed
//! buttons rather than discrete press/release events. This module diffs
//! each incoming mask against the previous one and synthesizes the
//! transitions the upstream input dispatch expects.
//!
//! Two mask bits are reserved for the scroll wheel: a 0→1 transition on
//! one of them is a wheel notch in that direction, and the following 1→0
//! transition is protocol noise that must not produce any event.
//!
//! # Inherited edge case
//!
//! Some viewers fail to report a final mask change when a button is
//! released while another button is still held, so the release for the
//! first button is only synthesized once the mask changes again. This is
//! an inherited client-side limitation, deliberately not papered over
//! here; compensating for it would be a behavior change.

/// Mask bit index treated as one wheel-up notch
pub const WHEEL_UP_BIT: u8 = 3;
/// Mask bit index treated as one wheel-down notch
pub const WHEEL_DOWN_BIT: u8 = 4;
/// Mask bit index that carries the popup-trigger flag (third button)
pub const POPUP_BIT: u8 = 2;

/// Scroll wheel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    /// Wheel rolled away from the user
    Up,
    /// Wheel rolled toward the user
    Down,
}

/// One synthesized button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTransition {
    /// Button went down. `button` is 1-based (mask bit + 1).
    Pressed {
        /// Button index, 1-based
        button: u8,
        /// True only for the third button
        popup_trigger: bool,
    },
    /// Button went up. `button` is 1-based (mask bit + 1).
    Released {
        /// Button index, 1-based
        button: u8,
        /// True only for the third button
        popup_trigger: bool,
    },
    /// One wheel notch
    Wheel(WheelDirection),
}

/// 8-bit mask of currently-pressed pointer buttons.
///
/// Per-bridge state: concurrent viewers share one synthesized pointer
/// identity, so the mask is never per-connection and never carried over
/// between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    mask: u8,
}

impl ButtonState {
    /// Create the all-released state
    pub fn new() -> Self {
        Self { mask: 0 }
    }

    /// Current raw mask
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Diff `new_mask` against the stored mask and return the synthesized
    /// transitions, in ascending bit order. The stored mask is updated
    /// after all bits are processed.
    pub fn transitions(&mut self, new_mask: u8) -> Vec<ButtonTransition> {
        if new_mask == self.mask {
            return Vec::new();
        }

        let mut out = Vec::new();
        for bit in 0..8u8 {
            let is = new_mask & (1 << bit) != 0;
            let was = self.mask & (1 << bit) != 0;
            if is == was {
                continue;
            }
            if bit == WHEEL_UP_BIT || bit == WHEEL_DOWN_BIT {
                // Wheel bits only fire on the set transition; the clear
                // transition carries no information
                if is {
                    out.push(ButtonTransition::Wheel(if bit == WHEEL_UP_BIT {
                        WheelDirection::Up
                    } else {
                        WheelDirection::Down
                    }));
                }
                continue;
            }
            let button = bit + 1;
            let popup_trigger = bit == POPUP_BIT;
            out.push(if is {
                ButtonTransition::Pressed {
                    button,
                    popup_trigger,
                }
            } else {
                ButtonTransition::Released {
                    button,
                    popup_trigger,
                }
            });
        }
        self.mask = new_mask;
        out
    }

    /// Reset to all-released (session teardown)
    pub fn reset(&mut self) {
        self.mask = 0;
    }
}
