#![cfg(target_os = "windows")]

//! Windows input backends.
//!
//! - **Raw Input** registration and `WM_INPUT` unpacking for one HID device
//!
//! The host application owns the window and message loop. Create a
//! [`DeviceSession`](crate::session::DeviceSession) over [`RawInput`] with the
//! window handle as target and forward every `WM_INPUT` `lparam` to
//! `DeviceSession::on_wm_input`.

pub mod raw_input;

pub use raw_input::{RawInput, WmInput};
