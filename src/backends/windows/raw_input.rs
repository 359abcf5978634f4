//! Windows Raw Input backend (HID).
//!
//! Registration goes through `RegisterRawInputDevices` with `RIDEV_INPUTSINK`, so
//! `WM_INPUT` arrives at the target window even when it is not in the
//! foreground. The host owns the message loop and forwards each `WM_INPUT`
//! `lparam` to [`DeviceSession::on_wm_input`].
//!
//! ## Envelope layout
//! [`WmInput`] holds the bytes `GetRawInputData(RID_INPUT)` returned:
//! a `RAWINPUTHEADER`, then for HID devices a `RAWHID` block
//! (`dwSizeHid`, `dwCount`, then `dwSizeHid * dwCount` payload bytes).
//!
//! ## What you **don't** get
//! - No device enumeration (the identity is configured up front)
//! - No report-descriptor parsing; payload bytes are forwarded as-is

#![cfg(target_os = "windows")]

use crate::backends::{RawHidReport, RawInputSubsystem};
use crate::error::{ExtractionError, SubsystemError};
use crate::identity::{DeviceIdentity, DeviceKind, RawDeviceInfo};
use crate::session::{DeviceSession, NotificationOutcome};
use core::ffi::c_void;
use windows_sys::Win32::Foundation::{GetLastError, HANDLE, HWND};
use windows_sys::Win32::UI::Input::*;

// Local constants (avoid relying on module exports that vary by windows-sys version)
const RIDEV_REMOVE: u32 = 0x0000_0001;
const RIDEV_INPUTSINK: u32 = 0x0000_0100;
const RID_INPUT_CMD: u32 = 0x1000_0003;
const RIDI_DEVICEINFO_CMD: u32 = 0x2000_000b;

const RIM_TYPE_MOUSE: u32 = 0;
const RIM_TYPE_KEYBOARD: u32 = 1;
const RIM_TYPE_HID: u32 = 2;

/// `GetRawInputData` / `GetRawInputDeviceInfoW` failure sentinel.
const RAW_INPUT_ERROR: u32 = u32::MAX;

fn last_error(call: &'static str) -> SubsystemError {
    SubsystemError::new(call, unsafe { GetLastError() })
}

/// One `WM_INPUT` payload, copied out of the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WmInput {
    buf: Vec<u8>,
}

impl WmInput {
    /// Copy the `RID_INPUT` data behind a `WM_INPUT` `lparam`.
    pub fn read(lparam: isize) -> Result<Self, SubsystemError> {
        let hdr_sz = core::mem::size_of::<RAWINPUTHEADER>() as u32;
        unsafe {
            // Query size
            let mut size: u32 = 0;
            let r0 = GetRawInputData(
                lparam as _,
                RID_INPUT_CMD,
                core::ptr::null_mut(),
                &mut size,
                hdr_sz,
            );
            if r0 == RAW_INPUT_ERROR {
                return Err(last_error("GetRawInputData"));
            }
            if size == 0 {
                return Err(SubsystemError::new("GetRawInputData", 0));
            }

            let mut buf = vec![0u8; size as usize];
            let r1 = GetRawInputData(
                lparam as _,
                RID_INPUT_CMD,
                buf.as_mut_ptr() as *mut c_void,
                &mut size,
                hdr_sz,
            );
            if r1 == RAW_INPUT_ERROR {
                return Err(last_error("GetRawInputData"));
            }
            buf.truncate(r1 as usize);
            Ok(Self { buf })
        }
    }

    /// Wrap bytes previously copied from `GetRawInputData`.
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn header(&self) -> Option<RAWINPUTHEADER> {
        if self.buf.len() < core::mem::size_of::<RAWINPUTHEADER>() {
            return None;
        }
        // SAFETY: length checked above; the header is plain data.
        Some(unsafe { core::ptr::read_unaligned(self.buf.as_ptr() as *const RAWINPUTHEADER) })
    }
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// [`RawInputSubsystem`] over Win32 Raw Input.
#[derive(Debug, Default)]
pub struct RawInput;

impl RawInput {
    pub fn new() -> Self {
        Self
    }

    fn register_raw(identity: &DeviceIdentity, flags: u32, target: HWND) -> Result<(), SubsystemError> {
        let rid = RAWINPUTDEVICE {
            usUsagePage: identity.usage_page,
            usUsage: identity.usage,
            dwFlags: flags,
            hwndTarget: target,
        };
        let ok = unsafe {
            RegisterRawInputDevices(&rid, 1, core::mem::size_of::<RAWINPUTDEVICE>() as u32)
        };
        if ok == 0 {
            return Err(last_error("RegisterRawInputDevices"));
        }
        Ok(())
    }
}

impl RawInputSubsystem for RawInput {
    type Target = HWND;
    type Envelope = WmInput;
    type Handle = HANDLE;

    fn register(&mut self, identity: &DeviceIdentity, target: &HWND) -> Result<(), SubsystemError> {
        Self::register_raw(identity, RIDEV_INPUTSINK, *target)
    }

    fn unregister(&mut self, identity: &DeviceIdentity) -> Result<(), SubsystemError> {
        // RIDEV_REMOVE requires a null target.
        Self::register_raw(identity, RIDEV_REMOVE, core::ptr::null_mut())
    }

    fn device_handle(&self, envelope: &WmInput) -> Result<HANDLE, SubsystemError> {
        envelope
            .header()
            .map(|hdr| hdr.hDevice)
            .ok_or(SubsystemError::new("RAWINPUTHEADER", 0))
    }

    fn device_info(&self, handle: HANDLE) -> Result<RawDeviceInfo, SubsystemError> {
        unsafe {
            let mut info: RID_DEVICE_INFO = core::mem::zeroed();
            info.cbSize = core::mem::size_of::<RID_DEVICE_INFO>() as u32;
            let mut size = info.cbSize;
            let r = GetRawInputDeviceInfoW(
                handle,
                RIDI_DEVICEINFO_CMD,
                &mut info as *mut RID_DEVICE_INFO as *mut c_void,
                &mut size,
            );
            if r == RAW_INPUT_ERROR || r == 0 {
                return Err(last_error("GetRawInputDeviceInfoW"));
            }

            let kind = match info.dwType {
                RIM_TYPE_MOUSE => DeviceKind::Mouse,
                RIM_TYPE_KEYBOARD => DeviceKind::Keyboard,
                RIM_TYPE_HID => DeviceKind::Hid,
                _ => return Err(SubsystemError::new("RID_DEVICE_INFO", info.dwType)),
            };
            if kind != DeviceKind::Hid {
                return Ok(RawDeviceInfo {
                    kind,
                    vendor_id: 0,
                    product_id: 0,
                    version: 0,
                });
            }

            let hid = info.Anonymous.hid;
            Ok(RawDeviceInfo {
                kind,
                vendor_id: hid.dwVendorId,
                product_id: hid.dwProductId,
                version: hid.dwVersionNumber,
            })
        }
    }

    fn hid_report<'e>(&self, envelope: &'e WmInput) -> Result<RawHidReport<'e>, SubsystemError> {
        let hdr = envelope
            .header()
            .ok_or(SubsystemError::new("RAWINPUTHEADER", 0))?;
        if hdr.dwType != RIM_TYPE_HID {
            return Err(SubsystemError::new("RAWHID", hdr.dwType));
        }

        let at = core::mem::size_of::<RAWINPUTHEADER>();
        let buf = envelope.as_bytes();
        let size_hid = read_u32(buf, at).ok_or(SubsystemError::new("RAWHID", 0))?;
        let count = read_u32(buf, at + 4).ok_or(SubsystemError::new("RAWHID", 0))?;
        Ok(RawHidReport {
            size_hid,
            count,
            data: &buf[at + 8..],
        })
    }
}

impl<S: 'static> DeviceSession<RawInput, S> {
    /// Handle a `WM_INPUT` message by its `lparam`.
    pub fn on_wm_input(&mut self, lparam: isize) -> NotificationOutcome {
        match WmInput::read(lparam) {
            Ok(envelope) => self.on_notification(&envelope),
            Err(e) => self.drop_notification(ExtractionError::Payload(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hid_packet(size_hid: u32, count: u32, payload: &[u8]) -> WmInput {
        let hdr = RAWINPUTHEADER {
            dwType: RIM_TYPE_HID,
            dwSize: 0,
            hDevice: 0x1234 as HANDLE,
            wParam: 0,
        };
        let hdr_sz = core::mem::size_of::<RAWINPUTHEADER>();
        let mut buf = vec![0u8; hdr_sz];
        // SAFETY: buf is exactly one header long.
        unsafe {
            core::ptr::write_unaligned(buf.as_mut_ptr() as *mut RAWINPUTHEADER, hdr);
        }
        buf.extend_from_slice(&size_hid.to_ne_bytes());
        buf.extend_from_slice(&count.to_ne_bytes());
        buf.extend_from_slice(payload);
        WmInput::from_bytes(buf)
    }

    #[test]
    fn parses_rawhid_block() {
        let packet = hid_packet(3, 2, &[1, 2, 3, 4, 5, 6]);
        let backend = RawInput::new();

        assert_eq!(backend.device_handle(&packet).unwrap(), 0x1234 as HANDLE);
        let report = backend.hid_report(&packet).unwrap();
        assert_eq!(report.size_hid, 3);
        assert_eq!(report.count, 2);
        assert_eq!(report.byte_count(), 6);
        assert_eq!(report.data, &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let packet = WmInput::from_bytes(vec![0u8; 4]);
        let backend = RawInput::new();
        assert!(backend.device_handle(&packet).is_err());
        assert!(backend.hid_report(&packet).is_err());
    }
}
