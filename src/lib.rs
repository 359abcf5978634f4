//! bytewatch: per-byte change dispatch for raw HID input reports.
//!
//! A [`DeviceSession`] binds one HID device (by usage, vendor, product and
//! version) to a raw-input backend. Every report that passes the identity
//! filter goes to a [`ByteDiffDispatcher`], which diffs it against the previous
//! report and calls the handler registered for each changed byte offset.
//!
//! ```
//! use bytewatch::{ByteChange, ByteDiffDispatcher, OffsetHandlers};
//!
//! let handlers = OffsetHandlers::new().on(1, |c: &ByteChange<'_, ()>| {
//!     println!("offset 1: {:#04x} -> {:#04x}", c.previous, c.current);
//!     Ok(())
//! });
//! let mut dispatcher = ByteDiffDispatcher::new(vec![0u8; 4], handlers).unwrap();
//! let report = dispatcher.process(&[0, 0x80, 0, 0]).unwrap();
//! assert_eq!(report.dispatched, 1);
//! ```

pub mod backends;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod identity;
pub mod session;

pub use config::*;
pub use dispatcher::*;
pub use error::*;
pub use handler::*;
pub use identity::*;
pub use session::*;
