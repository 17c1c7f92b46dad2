use tangle_ternary::ConversionError;
use thiserror::Error;

use crate::layout::TX_TRITS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedTransaction {
    #[error("transaction trit buffer has length {got}, expected {TX_TRITS}")]
    WrongTritLength { got: usize },

    #[error("transaction byte buffer has length {got}, expected {expected}")]
    WrongByteLength { got: usize, expected: usize },

    #[error("field does not decode to valid ternary: {0}")]
    InvalidField(#[from] ConversionError),
}
