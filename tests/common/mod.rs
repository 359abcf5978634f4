//! In-memory raw-input subsystem for driving sessions in tests.

#![allow(dead_code)]

use bytewatch::backends::{RawHidReport, RawInputSubsystem};
use bytewatch::{ByteChange, DeviceIdentity, DeviceKind, OffsetHandlers, RawDeviceInfo, SubsystemError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PAD: DeviceIdentity = DeviceIdentity {
    usage_page: 0x01,
    usage: 0x05,
    vendor_id: 0x045e,
    product_id: 0x028e,
    version: 0x0110,
};

pub const PAD_HANDLE: u32 = 1;
pub const OTHER_HANDLE: u32 = 2;
pub const UNKNOWN_HANDLE: u32 = 99;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Register(u16, u16),
    Unregister(u16, u16),
}

/// Which query of a notification should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailAt {
    Handle,
    Payload,
}

#[derive(Clone, Debug)]
pub struct Envelope {
    pub handle: u32,
    pub size_hid: u32,
    pub count: u32,
    pub data: Vec<u8>,
    pub fail: Option<FailAt>,
}

impl Envelope {
    /// Well-formed single report from `handle`.
    pub fn report(handle: u32, data: &[u8]) -> Self {
        Self {
            handle,
            size_hid: data.len() as u32,
            count: 1,
            data: data.to_vec(),
            fail: None,
        }
    }

    pub fn failing(handle: u32, at: FailAt) -> Self {
        Self {
            fail: Some(at),
            ..Self::report(handle, &[0])
        }
    }
}

pub struct Scripted {
    pub devices: HashMap<u32, RawDeviceInfo>,
    pub reject_register: bool,
    pub reject_unregister: bool,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl Scripted {
    /// The pad on `PAD_HANDLE` plus a different HID device on `OTHER_HANDLE`.
    pub fn new() -> Self {
        let mut devices = HashMap::new();
        devices.insert(
            PAD_HANDLE,
            RawDeviceInfo {
                kind: DeviceKind::Hid,
                vendor_id: PAD.vendor_id,
                product_id: PAD.product_id,
                version: PAD.version,
            },
        );
        devices.insert(
            OTHER_HANDLE,
            RawDeviceInfo {
                kind: DeviceKind::Hid,
                vendor_id: 0x046d,
                product_id: 0xc216,
                version: 0x0100,
            },
        );
        Self {
            devices,
            reject_register: false,
            reject_unregister: false,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        self.calls.clone()
    }
}

impl RawInputSubsystem for Scripted {
    type Target = ();
    type Envelope = Envelope;
    type Handle = u32;

    fn register(&mut self, identity: &DeviceIdentity, _target: &()) -> Result<(), SubsystemError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Register(identity.usage_page, identity.usage));
        if self.reject_register {
            return Err(SubsystemError::new("RegisterRawInputDevices", 87));
        }
        Ok(())
    }

    fn unregister(&mut self, identity: &DeviceIdentity) -> Result<(), SubsystemError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Unregister(identity.usage_page, identity.usage));
        if self.reject_unregister {
            return Err(SubsystemError::new("RegisterRawInputDevices", 5));
        }
        Ok(())
    }

    fn device_handle(&self, envelope: &Envelope) -> Result<u32, SubsystemError> {
        if envelope.fail == Some(FailAt::Handle) {
            return Err(SubsystemError::new("RAWINPUTHEADER", 0));
        }
        Ok(envelope.handle)
    }

    fn device_info(&self, handle: u32) -> Result<RawDeviceInfo, SubsystemError> {
        self.devices
            .get(&handle)
            .copied()
            .ok_or(SubsystemError::new("GetRawInputDeviceInfoW", 6))
    }

    fn hid_report<'e>(&self, envelope: &'e Envelope) -> Result<RawHidReport<'e>, SubsystemError> {
        if envelope.fail == Some(FailAt::Payload) {
            return Err(SubsystemError::new("RAWHID", 0));
        }
        Ok(RawHidReport {
            size_hid: envelope.size_hid,
            count: envelope.count,
            data: &envelope.data,
        })
    }
}

/// `(offset, current, previous)` per handler call, in call order.
pub type Log = Arc<Mutex<Vec<(usize, u8, u8)>>>;

/// Handlers on `offsets` that append to `log`.
pub fn logging_handlers<S: 'static>(log: &Log, offsets: &[usize]) -> OffsetHandlers<S> {
    let mut table = OffsetHandlers::new();
    for &offset in offsets {
        let log = log.clone();
        table = table.on(offset, move |c: &ByteChange<'_, S>| {
            log.lock().unwrap().push((c.offset, c.current, c.previous));
            Ok(())
        });
    }
    table
}
