//! Input Event Synthesis
//!
//! Converts the downstream input primitives — `key(code, down)` and
//! `pointer(button_mask, x, y)` — into the discrete event vocabulary the
//! upstream session expects, and fans the synthesized events out to the
//! registered input listeners.
//!
//! Event synthesis rules:
//!
//! - Modifier keys update [`KeyModifiers`] *before* their own press or
//!   release event is built, so the event's modifier field reflects the
//!   state after the key's own transition.
//! - A key-typed event is emitted only on release, and only for keys that
//!   resolved to a printable character.
//! - A pointer event synthesizes at most one move (when the position
//!   actually changed) followed by one transition per changed mask bit.

use std::sync::Arc;

use crate::input::keyboard::{self, KeyLocation, KeyModifiers, LogicalKey};
use crate::input::mouse::{ButtonState, ButtonTransition, WheelDirection};
use crate::pointer::PointerShape;

/// A synthesized input event dispatched toward upstream listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Key went down
    KeyPressed {
        /// Logical key
        key: LogicalKey,
        /// Printable character, when the code resolved to one
        ch: Option<char>,
        /// Modifier state after this key's own transition
        modifiers: KeyModifiers,
        /// Keyboard location
        location: KeyLocation,
    },
    /// Key went up
    KeyReleased {
        /// Logical key
        key: LogicalKey,
        /// Printable character, when the code resolved to one
        ch: Option<char>,
        /// Modifier state after this key's own transition
        modifiers: KeyModifiers,
        /// Keyboard location
        location: KeyLocation,
    },
    /// Printable key completed a press/release cycle
    KeyTyped {
        /// The typed character
        ch: char,
        /// Modifier state at release time
        modifiers: KeyModifiers,
    },
    /// Pointer moved to a new position
    PointerMoved {
        /// New X coordinate
        x: u32,
        /// New Y coordinate
        y: u32,
        /// Current modifier state
        modifiers: KeyModifiers,
    },
    /// Pointer button went down
    ButtonPressed {
        /// Button index, 1-based
        button: u8,
        /// Pointer X at the time of the event
        x: u32,
        /// Pointer Y at the time of the event
        y: u32,
        /// True only for the third button
        popup_trigger: bool,
        /// Current modifier state
        modifiers: KeyModifiers,
    },
    /// Pointer button went up
    ButtonReleased {
        /// Button index, 1-based
        button: u8,
        /// Pointer X at the time of the event
        x: u32,
        /// Pointer Y at the time of the event
        y: u32,
        /// True only for the third button
        popup_trigger: bool,
        /// Current modifier state
        modifiers: KeyModifiers,
    },
    /// One scroll wheel notch
    WheelMoved {
        /// Scroll direction
        direction: WheelDirection,
        /// Pointer X at the time of the event
        x: u32,
        /// Pointer Y at the time of the event
        y: u32,
        /// Current modifier state
        modifiers: KeyModifiers,
    },
}

/// Receiver of synthesized input events (implemented by the upstream
/// engine's input injection layer)
pub trait InputListener: Send + Sync {
    /// Handle one synthesized event
    fn input_event(&self, event: InputEvent);
}

/// Translates downstream input primitives into upstream input events.
///
/// Holds the per-bridge keyboard and button state; the pointer position
/// lives in [`PointerShape`] and is borrowed per call so the translator
/// and the cursor state stay under the bridge's single lock.
#[derive(Debug, Default)]
pub struct InputTranslator {
    modifiers: KeyModifiers,
    buttons: ButtonState,
}

impl InputTranslator {
    /// Create a translator with no keys or buttons held
    pub fn new() -> Self {
        Self {
            modifiers: KeyModifiers::empty(),
            buttons: ButtonState::new(),
        }
    }

    /// Current modifier state
    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    /// Current button mask
    pub fn button_mask(&self) -> u8 {
        self.buttons.mask()
    }

    /// Translate one downstream key event.
    ///
    /// Unknown key codes degrade to an undefined logical key rather than
    /// failing; the events are still synthesized so key repeat and
    /// modifier bookkeeping stay consistent.
    pub fn key_event(&mut self, code: u32, down: bool) -> Vec<InputEvent> {
        let resolved = keyboard::resolve(code);
        // Modifier transition applies before the event is built
        let modifiers = self.modifiers.apply(resolved.key, down);

        let mut events = Vec::with_capacity(2);
        if down {
            events.push(InputEvent::KeyPressed {
                key: resolved.key,
                ch: resolved.ch,
                modifiers,
                location: resolved.location,
            });
        } else {
            events.push(InputEvent::KeyReleased {
                key: resolved.key,
                ch: resolved.ch,
                modifiers,
                location: resolved.location,
            });
            if let Some(ch) = resolved.ch {
                events.push(InputEvent::KeyTyped { ch, modifiers });
            }
        }
        events
    }

    /// Translate one downstream pointer event.
    ///
    /// Synthesizes at most one move event (when `(x, y)` differs from the
    /// stored pointer position), then one event per changed mask bit, and
    /// updates the shared pointer position and button state.
    pub fn pointer_event(
        &mut self,
        button_mask: u8,
        x: u32,
        y: u32,
        pointer: &mut PointerShape,
    ) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let modifiers = self.modifiers;

        if (x, y) != pointer.position() {
            pointer.set_position(x, y);
            events.push(InputEvent::PointerMoved { x, y, modifiers });
        }

        for transition in self.buttons.transitions(button_mask) {
            events.push(match transition {
                ButtonTransition::Pressed {
                    button,
                    popup_trigger,
                } => InputEvent::ButtonPressed {
                    button,
                    x,
                    y,
                    popup_trigger,
                    modifiers,
                },
                ButtonTransition::Released {
                    button,
                    popup_trigger,
                } => InputEvent::ButtonReleased {
                    button,
                    x,
                    y,
                    popup_trigger,
                    modifiers,
                },
                ButtonTransition::Wheel(direction) => InputEvent::WheelMoved {
                    direction,
                    x,
                    y,
                    modifiers,
                },
            });
        }
        events
    }

    /// Drop all held keys and buttons (session teardown; state is never
    /// carried over between sessions)
    pub fn reset(&mut self) {
        self.modifiers = KeyModifiers::empty();
        self.buttons.reset();
    }
}

/// Fan events out to listeners in insertion order
pub fn dispatch(listeners: &[Arc<dyn InputListener>], events: &[InputEvent]) {
    for event in events {
        for listener in listeners {
            listener.input_event(*event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keyboard::keysym;
    use crate::input::mouse::{WHEEL_DOWN_BIT, WHEEL_UP_BIT};
    use proptest::prelude::*;

    fn key_cycle(translator: &mut InputTranslator, code: u32) -> Vec<InputEvent> {
        let mut events = translator.key_event(code, true);
        events.extend(translator.key_event(code, false));
        events
    }

    #[test]
    fn test_letter_press_release_typed_order() {
        let mut translator = InputTranslator::new();
        let events = key_cycle(&mut translator, 'A' as u32);

        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            InputEvent::KeyPressed {
                key: LogicalKey::Char('A'),
                ch: Some('A'),
                ..
            }
        ));
        assert!(matches!(
            events[1],
            InputEvent::KeyReleased {
                key: LogicalKey::Char('A'),
                ..
            }
        ));
        assert!(matches!(events[2], InputEvent::KeyTyped { ch: 'A', .. }));
    }

    #[test]
    fn test_navigation_key_emits_no_typed() {
        let mut translator = InputTranslator::new();
        let events = key_cycle(&mut translator, keysym::ENTER);
        assert_eq!(events.len(), 2);
        assert!(!events
            .iter()
            .any(|e| matches!(e, InputEvent::KeyTyped { .. })));
    }

    #[test]
    fn test_modifier_state_reflects_own_transition() {
        let mut translator = InputTranslator::new();

        let down = translator.key_event(keysym::SHIFT_LEFT, true);
        match down[0] {
            InputEvent::KeyPressed { modifiers, .. } => {
                assert!(modifiers.contains(KeyModifiers::SHIFT))
            }
            _ => panic!("expected KeyPressed"),
        }

        let up = translator.key_event(keysym::SHIFT_LEFT, false);
        match up[0] {
            InputEvent::KeyReleased { modifiers, .. } => {
                assert!(!modifiers.contains(KeyModifiers::SHIFT))
            }
            _ => panic!("expected KeyReleased"),
        }
    }

    #[test]
    fn test_chorded_letter_carries_shift() {
        let mut translator = InputTranslator::new();
        translator.key_event(keysym::SHIFT_LEFT, true);

        let events = translator.key_event('a' as u32, true);
        match events[0] {
            InputEvent::KeyPressed { key, modifiers, .. } => {
                assert_eq!(key, LogicalKey::Char('A'));
                assert!(modifiers.contains(KeyModifiers::SHIFT));
            }
            _ => panic!("expected KeyPressed"),
        }
    }

    #[test]
    fn test_unknown_code_degrades_to_undefined() {
        let mut translator = InputTranslator::new();
        let events = translator.key_event(0xFF00, true);
        assert!(matches!(
            events[0],
            InputEvent::KeyPressed {
                key: LogicalKey::Undefined,
                ..
            }
        ));
    }

    #[test]
    fn test_pointer_move_once_per_position() {
        let mut translator = InputTranslator::new();
        let mut pointer = PointerShape::new();

        let events = translator.pointer_event(0, 10, 20, &mut pointer);
        assert_eq!(
            events,
            vec![InputEvent::PointerMoved {
                x: 10,
                y: 20,
                modifiers: KeyModifiers::empty()
            }]
        );
        assert_eq!(pointer.position(), (10, 20));

        // Same position again: no move event
        let events = translator.pointer_event(0, 10, 20, &mut pointer);
        assert!(events.is_empty());
    }

    #[test]
    fn test_move_precedes_button_events() {
        let mut translator = InputTranslator::new();
        let mut pointer = PointerShape::new();

        let events = translator.pointer_event(0b001, 5, 5, &mut pointer);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], InputEvent::PointerMoved { .. }));
        assert!(matches!(
            events[1],
            InputEvent::ButtonPressed { button: 1, .. }
        ));
    }

    #[test]
    fn test_wheel_bits_never_release() {
        let mut translator = InputTranslator::new();
        let mut pointer = PointerShape::new();

        let set = translator.pointer_event(1 << WHEEL_UP_BIT, 0, 0, &mut pointer);
        assert_eq!(
            set,
            vec![InputEvent::WheelMoved {
                direction: WheelDirection::Up,
                x: 0,
                y: 0,
                modifiers: KeyModifiers::empty()
            }]
        );

        let clear = translator.pointer_event(0, 0, 0, &mut pointer);
        assert!(clear.is_empty());
    }

    #[test]
    fn test_button_events_inherit_modifier_state() {
        let mut translator = InputTranslator::new();
        let mut pointer = PointerShape::new();
        translator.key_event(keysym::CTRL_LEFT, true);

        let events = translator.pointer_event(0b001, 0, 0, &mut pointer);
        match events[0] {
            InputEvent::ButtonPressed { modifiers, .. } => {
                assert!(modifiers.contains(KeyModifiers::CTRL))
            }
            _ => panic!("expected ButtonPressed"),
        }
    }

    #[test]
    fn test_reset_clears_held_state() {
        let mut translator = InputTranslator::new();
        let mut pointer = PointerShape::new();
        translator.key_event(keysym::SHIFT_LEFT, true);
        translator.pointer_event(0b111, 0, 0, &mut pointer);

        translator.reset();
        assert_eq!(translator.modifiers(), KeyModifiers::empty());
        assert_eq!(translator.button_mask(), 0);
    }

    proptest! {
        /// Every press for a button eventually pairs with a release when
        /// the final mask is all-clear (the documented exception requires
        /// the mask never to return to zero, which ending at zero rules
        /// out).
        #[test]
        fn prop_press_release_balance(masks in proptest::collection::vec(0u8..=255, 0..64)) {
            let mut translator = InputTranslator::new();
            let mut pointer = PointerShape::new();
            let mut presses = [0i32; 9];

            let mut all = Vec::new();
            for mask in masks {
                all.extend(translator.pointer_event(mask, 0, 0, &mut pointer));
            }
            all.extend(translator.pointer_event(0, 0, 0, &mut pointer));

            for event in all {
                match event {
                    InputEvent::ButtonPressed { button, .. } => presses[button as usize] += 1,
                    InputEvent::ButtonReleased { button, .. } => presses[button as usize] -= 1,
                    _ => {}
                }
            }
            prop_assert!(presses.iter().all(|&n| n == 0));
        }

        /// Wheel bits emit exactly one event per 0->1 transition and zero
        /// per 1->0 transition.
        #[test]
        fn prop_wheel_events_match_set_transitions(masks in proptest::collection::vec(0u8..=255, 0..64)) {
            let mut translator = InputTranslator::new();
            let mut pointer = PointerShape::new();

            let mut expected = 0usize;
            let mut prev = 0u8;
            for &mask in &masks {
                for bit in [WHEEL_UP_BIT, WHEEL_DOWN_BIT] {
                    if mask & (1 << bit) != 0 && prev & (1 << bit) == 0 {
                        expected += 1;
                    }
                }
                prev = mask;
            }

            let mut wheels = 0usize;
            for mask in masks {
                for event in translator.pointer_event(mask, 0, 0, &mut pointer) {
                    if matches!(event, InputEvent::WheelMoved { .. }) {
                        wheels += 1;
                    }
                }
            }
            prop_assert_eq!(wheels, expected);
        }
    }
}
