/// Errors that can occur while encoding or decoding buffer contents.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// A decode operation requested more bytes than remain in the buffer.
    #[error("out of data (need {requested} more bytes, {remaining} remaining)")]
    OutOfData { requested: usize, remaining: usize },

    /// A bit operation was attempted outside an active bit session, a byte
    /// operation was attempted inside one, or the session bracketing calls
    /// were themselves misused.
    #[error("invalid bit access state: {0}")]
    InvalidBitAccessState(&'static str),

    /// A range argument (cipher range, cursor jump) falls outside the buffer
    /// or violates the operation's alignment requirement.
    #[error("invalid range [{start}, {end}) for buffer of {len} bytes")]
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, BufferError>;
