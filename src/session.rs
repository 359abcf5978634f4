//! Device session.
//!
//! A [`DeviceSession`] binds one [`DeviceIdentity`] to a raw-input backend for
//! its whole lifetime and feeds validated reports to its
//! [`ByteDiffDispatcher`].
//!
//! ## Lifecycle
//! - [`DeviceSession::open`] registers the device. A rejected registration
//!   yields no session, so nothing is ever unregistered for it.
//! - [`DeviceSession::close`] unregisters and reports the outcome. If a session
//!   is dropped without `close`, `Drop` unregisters instead. Either way the
//!   release happens exactly once.
//!
//! ## Notifications
//! [`DeviceSession::on_notification`] never fails. Each envelope ends in one of
//! the [`NotificationOutcome`] variants; failures are logged here and returned
//! as data so the host can count them.

use crate::backends::RawInputSubsystem;
use crate::dispatcher::{ByteDiffDispatcher, DispatchReport};
use crate::error::{DispatchError, ExtractionError, RegistrationError};
use crate::identity::DeviceIdentity;
use log::{debug, error, warn};

/// Why a notification was skipped without being an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Sent by a different device sharing the message queue.
    DeviceMismatch,
    /// Declared zero payload bytes.
    EmptyReport,
}

/// Result of handling one notification.
#[derive(Debug)]
pub enum NotificationOutcome {
    /// The report reached the dispatcher.
    Dispatched(DispatchReport),
    Ignored(IgnoreReason),
    /// A subsystem query failed; the notification was dropped.
    Dropped(ExtractionError),
    /// The dispatcher refused the report (it is wider than the configured state).
    Rejected(DispatchError),
}

impl NotificationOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, NotificationOutcome::Dispatched(_))
    }

    pub fn dispatch_report(&self) -> Option<&DispatchReport> {
        match self {
            NotificationOutcome::Dispatched(r) => Some(r),
            _ => None,
        }
    }
}

/// One device registration plus its dispatcher.
pub struct DeviceSession<B: RawInputSubsystem, S> {
    backend: B,
    identity: DeviceIdentity,
    dispatcher: ByteDiffDispatcher<S>,
    registered: bool,
}

impl<B: RawInputSubsystem, S: 'static> DeviceSession<B, S> {
    /// Register `identity` with `backend`, delivering notifications to `target`.
    pub fn open(
        mut backend: B,
        identity: DeviceIdentity,
        target: &B::Target,
        dispatcher: ByteDiffDispatcher<S>,
    ) -> Result<Self, RegistrationError> {
        backend
            .register(&identity, target)
            .map_err(RegistrationError::Register)?;
        debug!("registered raw input for {identity}");

        Ok(Self {
            backend,
            identity,
            dispatcher,
            registered: true,
        })
    }

    /// Unregister the device.
    pub fn close(mut self) -> Result<(), RegistrationError> {
        self.release()
    }

    /// Handle one raw notification envelope.
    pub fn on_notification(&mut self, envelope: &B::Envelope) -> NotificationOutcome {
        let handle = match self.backend.device_handle(envelope) {
            Ok(h) => h,
            Err(e) => return self.drop_notification(ExtractionError::DeviceHandle(e)),
        };

        let info = match self.backend.device_info(handle) {
            Ok(info) => info,
            Err(e) => return self.drop_notification(ExtractionError::DeviceInfo(e)),
        };

        if !self.identity.matches(&info) {
            debug!(
                "ignoring notification from {handle:?} (vid=0x{:04x} pid=0x{:04x} ver=0x{:04x})",
                info.vendor_id, info.product_id, info.version
            );
            return NotificationOutcome::Ignored(IgnoreReason::DeviceMismatch);
        }

        let payload = match self.backend.hid_report(envelope) {
            Ok(p) => p,
            Err(e) => return self.drop_notification(ExtractionError::Payload(e)),
        };

        let byte_count = payload.byte_count();
        if byte_count < 1 {
            return NotificationOutcome::Ignored(IgnoreReason::EmptyReport);
        }
        if payload.data.len() < byte_count {
            return self.drop_notification(ExtractionError::Truncated {
                declared: byte_count,
                available: payload.data.len(),
            });
        }

        match self.dispatcher.process(&payload.data[..byte_count]) {
            Ok(report) => NotificationOutcome::Dispatched(report),
            Err(e) => NotificationOutcome::Rejected(e),
        }
    }

    pub(crate) fn drop_notification(&self, err: ExtractionError) -> NotificationOutcome {
        warn!("dropping notification for {}: {err}", self.identity);
        NotificationOutcome::Dropped(err)
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn dispatcher(&self) -> &ByteDiffDispatcher<S> {
        &self.dispatcher
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl<B: RawInputSubsystem, S> DeviceSession<B, S> {
    fn release(&mut self) -> Result<(), RegistrationError> {
        if !self.registered {
            return Ok(());
        }
        self.registered = false;
        self.backend
            .unregister(&self.identity)
            .map_err(RegistrationError::Unregister)?;
        debug!("unregistered raw input for {}", self.identity);
        Ok(())
    }
}

impl<B: RawInputSubsystem, S> Drop for DeviceSession<B, S> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("{e}");
        }
    }
}
