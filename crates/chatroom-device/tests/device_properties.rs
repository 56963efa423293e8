//! Property-based tests for device byte accounting.
//!
//! Reads always move whole records, and seek positions are record-aligned
//! and clamped to the tail, whatever byte counts the caller passes.

use chatroom_core::Environment;
use chatroom_device::{ChatDevice, DeviceConfig};
use chatroom_proto::{ControlCode, MessageRecord};
use proptest::prelude::*;

const SIZE: usize = MessageRecord::SIZE;

#[derive(Clone)]
struct FixedEnv;

impl Environment for FixedEnv {
    fn wall_clock_secs(&self) -> i64 {
        0
    }

    fn sender_id(&self) -> i32 {
        1
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: read returns min(floor(max_bytes / 120), unread) records
    #[test]
    fn prop_read_returns_whole_records(
        messages in 0usize..20,
        reads in prop::collection::vec(0usize..(8 * SIZE), 1..10),
    ) {
        let device = ChatDevice::new(DeviceConfig::default(), FixedEnv);
        let handle = device.open("lobby").unwrap();
        for i in 0..messages {
            let text = format!("m{i}");
            device.write(handle, Some(&mut text.as_bytes()), text.len()).unwrap();
        }

        let mut unread = messages;
        for max_bytes in reads {
            let mut dest = Vec::new();
            let n = device.read(handle, Some(&mut dest), max_bytes).unwrap();

            let expected = (max_bytes / SIZE).min(unread);
            prop_assert_eq!(n, expected * SIZE);
            prop_assert_eq!(dest.len(), n);

            unread -= expected;
            prop_assert_eq!(device.ioctl(handle, ControlCode::COUNT_UNREAD).unwrap(), unread as i64);
        }
    }

    /// Property: llseek lands on min(offset / 120, len) * 120
    #[test]
    fn prop_llseek_is_record_aligned(messages in 0usize..20, offset in 0i64..(40 * SIZE as i64)) {
        let device = ChatDevice::new(DeviceConfig::default(), FixedEnv);
        let handle = device.open("lobby").unwrap();
        for _ in 0..messages {
            device.write(handle, Some(&mut &b"x"[..]), 1).unwrap();
        }

        let position = device.llseek(handle, offset, 0).unwrap();
        let index = (offset as usize / SIZE).min(messages);

        prop_assert_eq!(position, (index * SIZE) as i64);
        prop_assert_eq!(
            device.ioctl(handle, ControlCode::COUNT_UNREAD).unwrap(),
            (messages - index) as i64
        );
    }
}
