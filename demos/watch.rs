//! Print every byte change of one HID device.
//!
//! ```text
//! cargo run --example watch -- device.toml
//! ```
//!
//! `device.toml` holds a `ListenerConfig`; every offset of the report gets a
//! printing handler.

use bytewatch::backends::hid::HidSubsystem;
use bytewatch::{ByteChange, ByteDiffDispatcher, DeviceSession, ListenerConfig, NotificationOutcome, OffsetHandlers};
use std::time::Duration;

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "device.toml".to_string());
    let config = ListenerConfig::load(&path).expect("load config");

    let handlers = (0..config.width()).fold(OffsetHandlers::new(), |t, offset| {
        t.on(offset, |c: &ByteChange<'_, ()>| {
            println!(
                "[{:02}] {:#04x} -> {:#04x}",
                c.offset, c.previous, c.current
            );
            Ok(())
        })
    });
    let dispatcher = ByteDiffDispatcher::from_config(&config, handlers).expect("dispatcher");

    let backend = HidSubsystem::new()
        .expect("init hidapi")
        .with_buffer_len(config.width())
        .with_read_timeout(10);
    let mut session = DeviceSession::open(backend, config.identity, &(), dispatcher).expect("open device");
    println!("Listening to {}", session.identity());

    loop {
        for outcome in session.poll() {
            match outcome {
                NotificationOutcome::Dispatched(_) | NotificationOutcome::Ignored(_) => {}
                NotificationOutcome::Dropped(e) => {
                    eprintln!("read failed: {e}");
                    std::thread::sleep(Duration::from_millis(500));
                }
                NotificationOutcome::Rejected(e) => eprintln!("{e}"),
            }
        }
    }
}
