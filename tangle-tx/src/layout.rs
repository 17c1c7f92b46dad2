//! Static field offsets into the fixed `TX_TRITS`-trit transaction buffer.

macro_rules! field {
    ($offset_name:ident, $end_name:ident, $size_name:ident, $start:expr, $size:expr) => {
        pub const $size_name: usize = $size;
        pub const $offset_name: usize = $start;
        pub const $end_name: usize = $start + $size;
    };
}

field!(
    SIGNATURE_MESSAGE_FRAGMENT_OFFSET,
    SIGNATURE_MESSAGE_FRAGMENT_END,
    SIGNATURE_MESSAGE_FRAGMENT_SIZE,
    0,
    2187
);
field!(
    ADDRESS_OFFSET,
    ADDRESS_END,
    ADDRESS_SIZE,
    SIGNATURE_MESSAGE_FRAGMENT_END,
    243
);
field!(VALUE_OFFSET, VALUE_END, VALUE_SIZE, ADDRESS_END, 81);
field!(
    TIMESTAMP_OFFSET,
    TIMESTAMP_END,
    TIMESTAMP_SIZE,
    VALUE_END,
    27
);
field!(
    SHARD_MARKER_OFFSET,
    SHARD_MARKER_END,
    SHARD_MARKER_SIZE,
    TIMESTAMP_END,
    36
);
field!(
    TRUNK_HASH_OFFSET,
    TRUNK_HASH_END,
    TRUNK_HASH_SIZE,
    SHARD_MARKER_END,
    243
);
field!(
    BRANCH_HASH_OFFSET,
    BRANCH_HASH_END,
    BRANCH_HASH_SIZE,
    TRUNK_HASH_END,
    243
);
field!(HEAD_OFFSET, HEAD_END, HEAD_SIZE, BRANCH_HASH_END, 1);
field!(TAIL_OFFSET, TAIL_END, TAIL_SIZE, HEAD_END, 1);
field!(
    TRANSACTION_TYPE_OFFSET,
    TRANSACTION_TYPE_END,
    TRANSACTION_TYPE_SIZE,
    TAIL_END,
    9
);
field!(
    NONCE_OFFSET,
    NONCE_END,
    NONCE_SIZE,
    TRANSACTION_TYPE_END,
    81
);

/// Total size, in trits, of a marshalled transaction.
pub const TX_TRITS: usize = NONCE_END;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_contiguous_and_sized() {
        assert_eq!(TX_TRITS, 3152);
    }
}
