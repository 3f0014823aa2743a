use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the document/position model.
pub enum CoreError {
    #[error("{what} {value} out of range (limit {limit})")]
    /// A line, column or index fell outside the current document bounds.
    OutOfRange {
        /// Which coordinate was rejected (`"line"`, `"column"`, `"index"`, ...).
        what: &'static str,
        /// The rejected value.
        value: usize,
        /// The largest accepted value (or the exclusive bound for lines).
        limit: usize,
    },

    #[error("invalid range: start {start} is after end {end}")]
    /// A range whose start lies after its end.
    InvertedRange {
        /// Absolute start index.
        start: usize,
        /// Absolute end index.
        end: usize,
    },
}

impl CoreError {
    pub(crate) fn out_of_range(what: &'static str, value: usize, limit: usize) -> Self {
        Self::OutOfRange { what, value, limit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while decoding a flat span buffer.
pub enum CodecError {
    #[error("unsupported record stride {0} (expected 7 or 9)")]
    /// The stride is neither the style-id nor the inline-style record width.
    Stride(usize),

    #[error("buffer of {len} ints is not a whole number of {stride}-int records")]
    /// The buffer length does not match the record layout.
    Truncated {
        /// Number of ints in the buffer.
        len: usize,
        /// Record stride used for decoding.
        stride: usize,
    },

    #[error("negative value {value} in field `{field}`")]
    /// A coordinate field held a negative value.
    Negative {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: i32,
    },
}
