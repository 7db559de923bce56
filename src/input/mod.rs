//! Input Translation
//!
//! Turns downstream keyboard and pointer primitives into the discrete
//! event vocabulary the upstream session injects into the remote desktop.
//!
//! ```text
//! key(code, down) ------> keyboard::resolve --+
//!                                             +--> InputTranslator --> InputEvent*
//! pointer(mask, x, y) --> ButtonState diff ---+
//! ```
//!
//! Submodules:
//! - `keyboard`: key code table, logical keys, modifier tracking
//! - `mouse`: button mask differencing and wheel semantics
//! - `translator`: event synthesis and listener fan-out

pub mod keyboard;
pub mod mouse;
pub mod translator;

pub use keyboard::{KeyLocation, KeyModifiers, LogicalKey};
pub use mouse::WheelDirection;
pub use translator::{InputEvent, InputListener, InputTranslator};
