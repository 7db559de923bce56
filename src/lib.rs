//! # rdp2vnc
//!
//! Display and input bridge between an upstream RDP session and a
//! downstream VNC (RFB) viewer server. The bridge owns the shared
//! framebuffer both protocol engines operate on, translates viewer
//! input into the event vocabulary the remote session expects, and
//! keeps damage, cursor and geometry changes flowing downstream.
//!
//! ```text
//!  remote desktop                                        VNC viewers
//!       |                                                     ^
//!       v                                                     |
//! +-----------+  RdpDisplay   +---------------+  DisplayDriver +---------+
//! | upstream  | ------------> | DisplayBridge | <------------- | viewer  |
//! | RDP engine|  pixels,      |  framebuffer  |  pixel reads,  | server  |
//! |           |  cursor,      |  pointer      |  key/pointer   |         |
//! |           |  damage,      |  translator   |  input, cut    |         |
//! |           |  resize       |  clipboard    |  text, resize  |         |
//! +-----------+               +---------------+                +---------+
//!       ^                            |
//!       |   DisplayControl /         | damage, resize,
//!       +-- ClipboardChannel <-------+ cursor fan-out
//! ```
//!
//! The two protocol engines are external: this crate defines the traits
//! they implement ([`session::UpstreamSession`], [`session::ViewerServer`],
//! [`damage::DisplayControl`], [`clipboard::ClipboardChannel`]) and the
//! surfaces it hands them ([`bridge::RdpDisplay`], [`bridge::DisplayDriver`]).
//! [`session::Session`] ties one of each together for the lifetime of a
//! bridged desktop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod clipboard;
pub mod color;
pub mod config;
pub mod damage;
pub mod framebuffer;
pub mod geometry;
pub mod input;
pub mod pointer;
pub mod session;

pub use bridge::{DisplayBridge, DisplayDriver, RdpDisplay};
pub use config::{AuthMethod, AuthPolicy, Config, Mode};
pub use damage::{DamageListener, DisplayControl, ResizeOutcome};
pub use framebuffer::{Framebuffer, FramebufferError};
pub use geometry::Rect;
pub use input::{InputEvent, InputListener};
pub use session::{Session, SessionError, SessionPhase, UpstreamSession, ViewerServer};
