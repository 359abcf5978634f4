//! Raw-input backends for `bytewatch`.
//!
//! A backend is the platform side of a [`DeviceSession`](crate::session::DeviceSession):
//! it registers interest in a device, and answers the handful of queries the
//! session makes against each notification envelope. Nothing here diffs or
//! dispatches; that is the dispatcher's job.
//!
//! # Feature flags
//! - **`hid`** enables the cross-platform [`hid`] polling backend built on `hidapi` (default).
//! - The Windows Raw Input backend ([`windows`]) is always built on Windows.

use crate::error::SubsystemError;
use crate::identity::{DeviceIdentity, RawDeviceInfo};
use std::fmt;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

/// HID payload carried by one notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawHidReport<'a> {
    /// Size of each report in bytes.
    pub size_hid: u32,
    /// Number of reports packed into `data`.
    pub count: u32,
    /// Raw payload; at least `size_hid * count` bytes for a well-formed notification.
    pub data: &'a [u8],
}

impl RawHidReport<'_> {
    /// Declared payload size (`size_hid * count`), saturating.
    pub fn byte_count(&self) -> usize {
        (self.size_hid as usize).saturating_mul(self.count as usize)
    }
}

/// Platform raw-input subsystem, as seen by a session.
///
/// Implementations must request background delivery when registering: the
/// device is read whether or not the host window has focus.
pub trait RawInputSubsystem {
    /// Where notifications are delivered (a window handle on Windows).
    type Target: ?Sized;
    /// One undecoded notification.
    type Envelope: ?Sized;
    /// Subsystem device handle carried by a notification.
    type Handle: Copy + fmt::Debug;

    fn register(&mut self, identity: &DeviceIdentity, target: &Self::Target) -> Result<(), SubsystemError>;

    fn unregister(&mut self, identity: &DeviceIdentity) -> Result<(), SubsystemError>;

    fn device_handle(&self, envelope: &Self::Envelope) -> Result<Self::Handle, SubsystemError>;

    fn device_info(&self, handle: Self::Handle) -> Result<RawDeviceInfo, SubsystemError>;

    fn hid_report<'e>(&self, envelope: &'e Self::Envelope) -> Result<RawHidReport<'e>, SubsystemError>;
}
