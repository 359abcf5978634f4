//! Device identity.
//!
//! [`DeviceIdentity`] names the one HID device a session listens to. The usage
//! pair is what the raw-input subsystem registers interest in; vendor, product
//! and version are what incoming notifications are filtered against, since other
//! HID devices with the same usage share the process's message queue.
//!
//! # Conventions
//! - `usage_page`/`usage` follow the HID usage tables (e.g. `0x01`/`0x04` = Joystick).
//! - `vendor_id`/`product_id`/`version` are widened to `u32` to match what the
//!   Windows `RID_DEVICE_INFO_HID` block reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable identity of the device a session is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// HID Usage Page used for registration.
    pub usage_page: u16,
    /// HID Usage within the page used for registration.
    pub usage: u16,
    /// USB Vendor ID (VID).
    pub vendor_id: u32,
    /// USB Product ID (PID).
    pub product_id: u32,
    /// Device release number (bcdDevice / `dwVersionNumber`).
    pub version: u32,
}

/// Kind of device that produced a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Mouse,
    Keyboard,
    Hid,
}

/// Device description as reported by the subsystem for one notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDeviceInfo {
    pub kind: DeviceKind,
    pub vendor_id: u32,
    pub product_id: u32,
    pub version: u32,
}

impl DeviceIdentity {
    /// `true` if `info` describes this device.
    ///
    /// Usage is not compared: registration already scoped delivery to the usage
    /// pair, and some stacks report a top-level collection usage that differs
    /// from the registered one.
    pub fn matches(&self, info: &RawDeviceInfo) -> bool {
        info.kind == DeviceKind::Hid
            && info.vendor_id == self.vendor_id
            && info.product_id == self.product_id
            && info.version == self.version
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vid=0x{:04x} pid=0x{:04x} ver=0x{:04x} up=0x{:02x} u=0x{:02x}",
            self.vendor_id, self.product_id, self.version, self.usage_page, self.usage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad() -> DeviceIdentity {
        DeviceIdentity {
            usage_page: 0x01,
            usage: 0x05,
            vendor_id: 0x045e,
            product_id: 0x028e,
            version: 0x0110,
        }
    }

    fn info(kind: DeviceKind, vendor_id: u32, product_id: u32, version: u32) -> RawDeviceInfo {
        RawDeviceInfo {
            kind,
            vendor_id,
            product_id,
            version,
        }
    }

    #[test]
    fn matches_exact_hid_device() {
        assert!(pad().matches(&info(DeviceKind::Hid, 0x045e, 0x028e, 0x0110)));
    }

    #[test]
    fn rejects_any_differing_field() {
        let id = pad();
        assert!(!id.matches(&info(DeviceKind::Hid, 0x045f, 0x028e, 0x0110)));
        assert!(!id.matches(&info(DeviceKind::Hid, 0x045e, 0x028f, 0x0110)));
        assert!(!id.matches(&info(DeviceKind::Hid, 0x045e, 0x028e, 0x0111)));
        assert!(!id.matches(&info(DeviceKind::Keyboard, 0x045e, 0x028e, 0x0110)));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(
            pad().to_string(),
            "vid=0x045e pid=0x028e ver=0x0110 up=0x01 u=0x05"
        );
    }
}
