//! `hidapi` polling backend.
//!
//! Cross-platform stand-in for a notification-driven subsystem: "registering"
//! opens the one `hidapi` entry matching the identity, and each successful read
//! becomes an envelope. The session pipeline is unchanged, so the identity
//! filter and dispatcher behave the same as under Windows Raw Input.
//!
//! Reads are passed through untouched. For devices with numbered reports the
//! first byte is the report ID and takes part in the diff like any other offset.

use crate::backends::{RawHidReport, RawInputSubsystem};
use crate::error::{ExtractionError, SubsystemError};
use crate::identity::{DeviceIdentity, DeviceKind, RawDeviceInfo};
use crate::session::{DeviceSession, NotificationOutcome};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use log::{debug, warn};

/// Maximum number of reports drained per [`DeviceSession::poll`] call.
///
/// Keeps a chatty device from starving the host loop.
const MAX_REPORTS_PER_TICK: usize = 32;

/// Read buffer size when none is configured.
const DEFAULT_REPORT_BUFFER: usize = 64;

/// `hidapi` has no numeric error codes; every failure carries this one.
const HIDAPI_ERROR: u32 = 0;

struct OpenDevice {
    raw: HidDevice,
    info: RawDeviceInfo,
}

/// One report read from the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HidReport {
    pub data: Vec<u8>,
}

/// [`RawInputSubsystem`] over `hidapi`.
pub struct HidSubsystem {
    api: HidApi,
    device: Option<OpenDevice>,
    buf: Vec<u8>,
    read_timeout_ms: i32,
}

impl HidSubsystem {
    pub fn new() -> Result<Self, SubsystemError> {
        let api = HidApi::new().map_err(|e| {
            warn!("[HID] init failed: {e}");
            SubsystemError::new("hid_init", HIDAPI_ERROR)
        })?;
        Ok(Self {
            api,
            device: None,
            buf: vec![0u8; DEFAULT_REPORT_BUFFER],
            read_timeout_ms: 0,
        })
    }

    /// Size of the read buffer; must cover the largest report (plus ID byte).
    pub fn with_buffer_len(mut self, len: usize) -> Self {
        self.buf = vec![0u8; len.max(1)];
        self
    }

    /// Milliseconds each read may block; `0` polls, `-1` blocks.
    pub fn with_read_timeout(mut self, ms: i32) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    /// Read one report, `Ok(None)` when nothing arrived within the timeout.
    pub fn read_report(&mut self) -> Result<Option<HidReport>, SubsystemError> {
        let dev = self
            .device
            .as_ref()
            .ok_or(SubsystemError::new("hid_read", HIDAPI_ERROR))?;
        match dev.raw.read_timeout(&mut self.buf, self.read_timeout_ms) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(HidReport {
                data: self.buf[..n].to_vec(),
            })),
            Err(e) => {
                warn!("[HID] read failed: {e}");
                Err(SubsystemError::new("hid_read", HIDAPI_ERROR))
            }
        }
    }
}

/// `hidapi` entry matching `identity`.
///
/// Usage is only compared when the platform reports one (some backends leave
/// it zero).
fn accept_device(info: &DeviceInfo, identity: &DeviceIdentity) -> bool {
    let usage_known = info.usage_page() != 0;
    u32::from(info.vendor_id()) == identity.vendor_id
        && u32::from(info.product_id()) == identity.product_id
        && u32::from(info.release_number()) == identity.version
        && (!usage_known || (info.usage_page() == identity.usage_page && info.usage() == identity.usage))
}

impl RawInputSubsystem for HidSubsystem {
    type Target = ();
    type Envelope = HidReport;
    type Handle = ();

    fn register(&mut self, identity: &DeviceIdentity, _target: &()) -> Result<(), SubsystemError> {
        if let Err(e) = self.api.refresh_devices() {
            warn!("[HID] refresh failed: {e}");
        }
        let info = self
            .api
            .device_list()
            .find(|info| accept_device(info, identity))
            .ok_or(SubsystemError::new("hid_find_device", HIDAPI_ERROR))?;

        let raw = info.open_device(&self.api).map_err(|e| {
            warn!("[HID] open failed for {identity}: {e}");
            SubsystemError::new("hid_open_device", HIDAPI_ERROR)
        })?;
        debug!(
            "[HID/OPEN] {identity} path={}",
            info.path().to_string_lossy()
        );

        self.device = Some(OpenDevice {
            raw,
            info: RawDeviceInfo {
                kind: DeviceKind::Hid,
                vendor_id: u32::from(info.vendor_id()),
                product_id: u32::from(info.product_id()),
                version: u32::from(info.release_number()),
            },
        });
        Ok(())
    }

    fn unregister(&mut self, _identity: &DeviceIdentity) -> Result<(), SubsystemError> {
        self.device = None;
        Ok(())
    }

    fn device_handle(&self, _envelope: &HidReport) -> Result<(), SubsystemError> {
        Ok(())
    }

    fn device_info(&self, _handle: ()) -> Result<RawDeviceInfo, SubsystemError> {
        self.device
            .as_ref()
            .map(|d| d.info)
            .ok_or(SubsystemError::new("hid_device_info", HIDAPI_ERROR))
    }

    fn hid_report<'e>(&self, envelope: &'e HidReport) -> Result<RawHidReport<'e>, SubsystemError> {
        let size_hid = u32::try_from(envelope.data.len())
            .map_err(|_| SubsystemError::new("hid_report", HIDAPI_ERROR))?;
        Ok(RawHidReport {
            size_hid,
            count: 1,
            data: &envelope.data,
        })
    }
}

impl<S: 'static> DeviceSession<HidSubsystem, S> {
    /// Drain up to [`MAX_REPORTS_PER_TICK`] reports through the dispatcher.
    ///
    /// Stops early when no report is pending or a read fails (the failure is
    /// returned as a [`NotificationOutcome::Dropped`]).
    pub fn poll(&mut self) -> Vec<NotificationOutcome> {
        let mut outcomes = Vec::new();
        while outcomes.len() < MAX_REPORTS_PER_TICK {
            match self.backend_mut().read_report() {
                Ok(Some(report)) => outcomes.push(self.on_notification(&report)),
                Ok(None) => break,
                Err(e) => {
                    outcomes.push(self.drop_notification(ExtractionError::Payload(e)));
                    break;
                }
            }
        }
        outcomes
    }
}
