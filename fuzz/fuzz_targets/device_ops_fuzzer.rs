//! Fuzz target for device entry point sequences
//!
//! # Strategy
//!
//! - Opens and releases across a few rooms, including stale handles
//! - Reads with arbitrary byte budgets, including partial records
//! - Writes with arbitrary lengths, including past the maximum
//! - Control codes and seek origins outside the supported set
//!
//! # Invariants
//!
//! - No entry point panics
//! - Reads return whole records and never more than requested
//! - Unread count never exceeds the room's log length
//! - Oversized writes never append
//! - Shutdown releases every handle and empties the registry

#![no_main]

use arbitrary::Arbitrary;
use chatroom_device::{ChatDevice, DeviceConfig, Handle, SystemEnv};
use chatroom_proto::{ControlCode, MessageRecord, MAX_MESSAGE_LENGTH};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum DeviceOp {
    Open { room: u8 },
    Read { handle: u8, max_bytes: u16 },
    Write { handle: u8, len: u8, fill: u8 },
    Ioctl { handle: u8, code: u32 },
    Llseek { handle: u8, offset: i32, whence: i8 },
    Release { handle: u8 },
}

fuzz_target!(|ops: Vec<DeviceOp>| {
    let device = ChatDevice::new(DeviceConfig::default(), SystemEnv::new());
    let mut handles: Vec<Handle> = Vec::new();

    // Unknown handles are looked up as raw values beyond anything issued.
    let pick = |handles: &[Handle], index: u8| {
        handles.get(index as usize).copied().unwrap_or(Handle::from_raw(u64::from(index) + 1_000_000))
    };

    for op in ops.into_iter().take(256) {
        match op {
            DeviceOp::Open { room } => {
                let handle = device.open(&format!("room-{}", room % 4)).unwrap();
                handles.push(handle);
            },
            DeviceOp::Read { handle, max_bytes } => {
                let mut dest = Vec::new();
                if let Ok(n) = device.read(pick(&handles, handle), Some(&mut dest), max_bytes as usize) {
                    assert_eq!(n % MessageRecord::SIZE, 0);
                    assert!(n <= max_bytes as usize);
                    assert_eq!(n, dest.len());
                }
            },
            DeviceOp::Write { handle, len, fill } => {
                let before = device.registry().stats().messages;
                let payload = vec![fill; len as usize];
                let result = device.write(pick(&handles, handle), Some(&mut &payload[..]), payload.len());
                let after = device.registry().stats().messages;

                if payload.len() > MAX_MESSAGE_LENGTH || result.is_err() {
                    assert!(result.is_err());
                    assert_eq!(before, after);
                } else {
                    assert_eq!(result, Ok(payload.len()));
                    assert_eq!(after, before + 1);
                }
            },
            DeviceOp::Ioctl { handle, code } => {
                let result = device.ioctl(pick(&handles, handle), code);
                if ControlCode::from_u32(code).is_none() {
                    assert!(result.is_err());
                } else if let Ok(unread) = result {
                    let total = device.registry().stats().messages as i64;
                    assert!((0..=total).contains(&unread));
                }
            },
            DeviceOp::Llseek { handle, offset, whence } => {
                if let Ok(position) = device.llseek(pick(&handles, handle), i64::from(offset), i32::from(whence)) {
                    assert_eq!(whence, 0);
                    assert_eq!(position % MessageRecord::SIZE as i64, 0);
                    assert!(position <= i64::from(offset.max(0)));
                }
            },
            DeviceOp::Release { handle } => {
                let index = handle as usize;
                if index < handles.len() {
                    let handle = handles.remove(index);
                    device.release(handle).unwrap();
                    assert!(device.release(handle).is_err());
                }
            },
        }

        assert_eq!(device.open_handles(), handles.len());
        assert_eq!(device.registry().session_count(), handles.len());
    }

    assert_eq!(device.shutdown(), handles.len());
    assert_eq!(device.registry().room_count(), 0);
});
