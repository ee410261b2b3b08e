//! Property-based test generators using proptest.
//!
//! Records are generated the way clients actually send them: any mix of
//! upper- and lower-case keys, with values that may be strings, numbers,
//! `null`, or missing altogether.

use proptest::prelude::*;
use serde_json::Value;
use syncrelay_protocol::RawRecord;

/// The recognized record fields as `(upper, lower)` key pairs.
pub const FIELD_KEYS: [(&str, &str); 4] = [
    ("CODE", "code"),
    ("NAME", "name"),
    ("ADDRESS", "address"),
    ("BRANCH", "branch"),
];

/// Strategy for a single field value as it may appear on the wire.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => "[A-Za-z0-9 ]{1,16}".prop_map(Value::from),
        1 => Just(Value::Null),
        1 => Just(Value::from("")),
        1 => any::<i32>().prop_map(Value::from),
    ]
}

/// Strategy for one raw record.
///
/// Each recognized field is independently absent, upper-case keyed,
/// lower-case keyed, or present under both keys.
pub fn raw_record_strategy() -> impl Strategy<Value = RawRecord> {
    let slot = || {
        (
            prop::option::of(field_value_strategy()),
            prop::option::of(field_value_strategy()),
        )
    };
    (slot(), slot(), slot(), slot()).prop_map(|(code, name, address, branch)| {
        let mut record = RawRecord::new();
        for ((upper, lower), (upper_value, lower_value)) in
            FIELD_KEYS.into_iter().zip([code, name, address, branch])
        {
            if let Some(value) = upper_value {
                record = record.with(upper, value);
            }
            if let Some(value) = lower_value {
                record = record.with(lower, value);
            }
        }
        record
    })
}

/// Strategy for a replace-sync batch of up to `max_len` records.
pub fn batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<RawRecord>> {
    prop::collection::vec(raw_record_strategy(), 0..=max_len)
}
