//! Property tests for message record encoding.

use chatroom_proto::{MAX_MESSAGE_LENGTH, MessageRecord, ProtocolError};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: Any in-bounds payload survives a record round trip once
    /// trailing padding is discounted.
    #[test]
    fn prop_record_preserves_fields(
        sender_id in any::<i32>(),
        timestamp in any::<i64>(),
        payload in prop::collection::vec(1u8.., 0..=MAX_MESSAGE_LENGTH)
    ) {
        let record = MessageRecord::new(sender_id, timestamp, &payload)?;
        let bytes = record.to_bytes();
        let parsed = MessageRecord::from_bytes(&bytes)?;

        prop_assert_eq!(parsed.sender_id(), sender_id);
        prop_assert_eq!(parsed.timestamp(), timestamp);
        prop_assert_eq!(parsed.payload(), &payload[..]);
    }

    /// Property: Oversized payloads never produce a record.
    #[test]
    fn prop_oversized_payload_rejected(
        extra in 1usize..64,
    ) {
        let payload = vec![b'a'; MAX_MESSAGE_LENGTH + extra];
        let result = MessageRecord::new(0, 0, &payload);
        prop_assert_eq!(
            result,
            Err(ProtocolError::PayloadTooLarge { size: MAX_MESSAGE_LENGTH + extra, max: MAX_MESSAGE_LENGTH })
        );
    }

    /// Property: Arbitrary bytes of record size always parse, and padding
    /// fields never leak into the accessors.
    #[test]
    fn prop_any_bytes_parse(bytes in prop::collection::vec(any::<u8>(), MessageRecord::SIZE..400)) {
        let record = MessageRecord::from_bytes(&bytes)?;
        prop_assert_eq!(record.sender_id(), i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        prop_assert_eq!(&record.payload_bytes()[..], &bytes[16..116]);
    }
}
