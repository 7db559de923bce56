//! Keyboard Translation
//!
//! Maps downstream RFB keysyms to the logical-key vocabulary dispatched
//! toward upstream input listeners, and tracks which modifier keys are
//! currently held so synthesized events carry correct modifier state.
//!
//! The mapping table covers modifier, navigation and function keys. Any
//! keysym outside the table is treated as a printable character code:
//! alphabetic codes are case-folded to their upper-case logical key, other
//! printable codes keep the character but resolve to an undefined logical
//! key. Nothing here fails on unknown input; unmapped codes degrade to
//! [`LogicalKey::Undefined`].

/// RFB (X11) keysym constants for the keys in the fixed mapping table
pub mod keysym {
    /// Left shift
    pub const SHIFT_LEFT: u32 = 0xFFE1;
    /// Right shift
    pub const SHIFT_RIGHT: u32 = 0xFFE2;
    /// Left control
    pub const CTRL_LEFT: u32 = 0xFFE3;
    /// Right control
    pub const CTRL_RIGHT: u32 = 0xFFE4;
    /// Left meta
    pub const META_LEFT: u32 = 0xFFE7;
    /// Right meta
    pub const META_RIGHT: u32 = 0xFFE8;
    /// Left alt
    pub const ALT_LEFT: u32 = 0xFFE9;
    /// Right alt (resolves to AltGraph)
    pub const ALT_RIGHT: u32 = 0xFFEA;

    /// Backspace
    pub const BACKSPACE: u32 = 0xFF08;
    /// Tab
    pub const TAB: u32 = 0xFF09;
    /// Enter / Return
    pub const ENTER: u32 = 0xFF0D;
    /// Escape
    pub const ESCAPE: u32 = 0xFF1B;
    /// Insert
    pub const INSERT: u32 = 0xFF63;
    /// Delete
    pub const DELETE: u32 = 0xFFFF;
    /// Home
    pub const HOME: u32 = 0xFF50;
    /// End
    pub const END: u32 = 0xFF57;
    /// Page up
    pub const PAGE_UP: u32 = 0xFF55;
    /// Page down
    pub const PAGE_DOWN: u32 = 0xFF56;
    /// Cursor left
    pub const LEFT: u32 = 0xFF51;
    /// Cursor up
    pub const UP: u32 = 0xFF52;
    /// Cursor right
    pub const RIGHT: u32 = 0xFF53;
    /// Cursor down
    pub const DOWN: u32 = 0xFF54;

    /// F1 (F2..F12 are consecutive)
    pub const F1: u32 = 0xFFBE;
    /// F12, the last function key in the table
    pub const F12: u32 = 0xFFC9;
}

/// Logical keys understood by the upstream input dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    /// Shift modifier
    Shift,
    /// Control modifier
    Control,
    /// Meta modifier
    Meta,
    /// Alt modifier
    Alt,
    /// AltGraph modifier (right alt)
    AltGraph,
    /// Function key F1..F12 (1-based number)
    Function(u8),
    /// Backspace
    Backspace,
    /// Tab
    Tab,
    /// Enter
    Enter,
    /// Escape
    Escape,
    /// Insert
    Insert,
    /// Delete
    Delete,
    /// Home
    Home,
    /// End
    End,
    /// Page up
    PageUp,
    /// Page down
    PageDown,
    /// Cursor left
    Left,
    /// Cursor right
    Right,
    /// Cursor up
    Up,
    /// Cursor down
    Down,
    /// Printable character key (upper-case logical key for letters)
    Char(char),
    /// No logical key resolved (printable char may still be present)
    Undefined,
}

/// Physical keyboard location of a key, for keys that exist on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyLocation {
    /// Standard single-location key
    Standard,
    /// Left-hand variant
    Left,
    /// Right-hand variant
    Right,
    /// Location not known
    Unknown,
}

/// Resolved form of one downstream key code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Logical key
    pub key: LogicalKey,
    /// Printable character, when the code resolved to one
    pub ch: Option<char>,
    /// Keyboard location
    pub location: KeyLocation,
}

/// Resolve a downstream keysym through the fixed mapping table
pub fn resolve(keysym: u32) -> ResolvedKey {
    use self::keysym::*;

    let (key, location) = match keysym {
        SHIFT_LEFT => (LogicalKey::Shift, KeyLocation::Left),
        SHIFT_RIGHT => (LogicalKey::Shift, KeyLocation::Right),
        CTRL_LEFT => (LogicalKey::Control, KeyLocation::Left),
        CTRL_RIGHT => (LogicalKey::Control, KeyLocation::Right),
        META_LEFT => (LogicalKey::Meta, KeyLocation::Left),
        META_RIGHT => (LogicalKey::Meta, KeyLocation::Right),
        ALT_LEFT => (LogicalKey::Alt, KeyLocation::Left),
        ALT_RIGHT => (LogicalKey::AltGraph, KeyLocation::Right),
        F1..=F12 => (
            LogicalKey::Function((keysym - F1 + 1) as u8),
            KeyLocation::Standard,
        ),
        BACKSPACE => (LogicalKey::Backspace, KeyLocation::Standard),
        TAB => (LogicalKey::Tab, KeyLocation::Standard),
        ENTER => (LogicalKey::Enter, KeyLocation::Standard),
        ESCAPE => (LogicalKey::Escape, KeyLocation::Standard),
        INSERT => (LogicalKey::Insert, KeyLocation::Standard),
        DELETE => (LogicalKey::Delete, KeyLocation::Standard),
        HOME => (LogicalKey::Home, KeyLocation::Standard),
        END => (LogicalKey::End, KeyLocation::Standard),
        PAGE_UP => (LogicalKey::PageUp, KeyLocation::Standard),
        PAGE_DOWN => (LogicalKey::PageDown, KeyLocation::Standard),
        LEFT => (LogicalKey::Left, KeyLocation::Standard),
        RIGHT => (LogicalKey::Right, KeyLocation::Standard),
        UP => (LogicalKey::Up, KeyLocation::Standard),
        DOWN => (LogicalKey::Down, KeyLocation::Standard),
        _ => return resolve_printable(keysym),
    };

    ResolvedKey {
        key,
        ch: None,
        location,
    }
}

/// Any code outside the table is a printable character code
fn resolve_printable(keysym: u32) -> ResolvedKey {
    let ch = char::from_u32(keysym);
    let key = match ch {
        Some(c) if c.is_ascii_alphabetic() => LogicalKey::Char(c.to_ascii_uppercase()),
        Some(c) if c.is_ascii_digit() => LogicalKey::Char(c),
        _ => LogicalKey::Undefined,
    };
    ResolvedKey {
        key,
        ch,
        location: KeyLocation::Unknown,
    }
}

/// Bitmask of currently-down modifier keys.
///
/// Mutated on every synthesized key event and consulted when constructing
/// subsequent events, so chorded input (shift+letter) reports correct
/// modifiers. The mask is per-bridge state: all downstream viewers share
/// one synthesized keyboard identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers(u8);

impl KeyModifiers {
    /// Shift bit
    pub const SHIFT: u8 = 1 << 0;
    /// Control bit
    pub const CTRL: u8 = 1 << 1;
    /// Alt bit
    pub const ALT: u8 = 1 << 2;
    /// Meta bit
    pub const META: u8 = 1 << 3;
    /// AltGraph bit
    pub const ALT_GRAPH: u8 = 1 << 4;

    /// Empty modifier state
    pub fn empty() -> Self {
        Self(0)
    }

    /// Raw bitmask value
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Check whether a modifier bit is set
    pub fn contains(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    /// Update the mask for a modifier key transition. Non-modifier keys
    /// leave the mask untouched. Returns the mask after the transition,
    /// which is the state synthesized events must carry.
    pub fn apply(&mut self, key: LogicalKey, down: bool) -> Self {
        let bit = match key {
            LogicalKey::Shift => Self::SHIFT,
            LogicalKey::Control => Self::CTRL,
            LogicalKey::Alt => Self::ALT,
            LogicalKey::Meta => Self::META,
            LogicalKey::AltGraph => Self::ALT_GRAPH,
            _ => return *self,
        };
        if down {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
        *self
    }
}
