//! Fuzz target for MessageRecord::from_bytes
//!
//! Any 120-byte pattern is a valid record. The fuzzer checks that decoding
//! never panics, that short buffers are rejected, and that a decoded record
//! re-encodes to the exact bytes it came from.

#![no_main]

use chatroom_core::Message;
use chatroom_proto::{MessageRecord, ProtocolError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let record = match MessageRecord::from_bytes(data) {
        Ok(record) => record,
        Err(ProtocolError::BufferTooShort { expected, actual }) => {
            assert_eq!(expected, MessageRecord::SIZE);
            assert_eq!(actual, data.len());
            assert!(data.len() < MessageRecord::SIZE);
            return;
        },
        Err(err) => panic!("unexpected decode error: {err}"),
    };

    assert_eq!(&record.to_bytes()[..], &data[..MessageRecord::SIZE]);

    // Decoding drops trailing zero padding; re-encoding restores it, so the
    // fields survive but padding bytes are normalized to zero.
    let message = Message::from_record(record);
    let again = message.to_record();
    assert_eq!(again.sender_id(), record.sender_id());
    assert_eq!(again.timestamp(), record.timestamp());
    assert_eq!(again.payload_bytes(), record.payload_bytes());
    assert!(message.payload().len() <= chatroom_proto::MAX_MESSAGE_LENGTH);
});
