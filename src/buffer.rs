use crate::error::{BufferError, Result};

/// Number of bits in a byte, used by the bit-packing sub-protocol.
pub(crate) const BYTE_SIZE: usize = 8;

/// `BIT_MASK[n]` is a mask of the low `n` bits.
pub(crate) const BIT_MASK: [u32; 33] = bit_masks();

const fn bit_masks() -> [u32; 33] {
    let mut masks = [0u32; 33];
    let mut i = 0;
    while i < 33 {
        masks[i] = if i == 32 { u32::MAX } else { (1u32 << i) - 1 };
        i += 1;
    }
    masks
}

/// Byte order used by every multi-byte primitive that has no explicit
/// order-suffixed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Most-significant byte first (network order). The default.
    #[default]
    BigEndian,
    /// Least-significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// The opposite order, used by the `*_reversed` codec variants.
    pub fn reversed(self) -> Self {
        match self {
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
        }
    }
}

/// Shared state of both cursor types: the backing bytes, the byte cursor,
/// the byte-order flag and the bit cursor.
///
/// A bit position of 0 means "no bit session": sessions may only start at a
/// byte position greater than zero, so 0 is never a legal active bit cursor.
#[derive(Debug, Clone)]
pub(crate) struct BufferCore {
    pub(crate) data: Vec<u8>,
    pub(crate) position: usize,
    pub(crate) order: ByteOrder,
    pub(crate) bit_position: usize,
}

impl BufferCore {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            order: ByteOrder::default(),
            bit_position: 0,
        }
    }

    pub(crate) fn order(&self) -> ByteOrder {
        self.order
    }

    pub(crate) fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the byte cursor by `delta` (may be negative). The new position
    /// must stay within `[0, len]`.
    pub(crate) fn jump(&mut self, delta: isize) -> Result<()> {
        let target = self.position as isize + delta;
        if target < 0 || target as usize > self.data.len() {
            return Err(BufferError::InvalidRange {
                start: self.position,
                end: target.max(0) as usize,
                len: self.data.len(),
            });
        }
        self.position = target as usize;
        Ok(())
    }

    pub(crate) fn has_bit_access(&self) -> bool {
        self.bit_position != 0
    }

    /// Guard for byte-oriented operations: they are illegal while a bit
    /// session is open.
    pub(crate) fn check_byte_access(&self) -> Result<()> {
        if self.has_bit_access() {
            return Err(BufferError::InvalidBitAccessState(
                "byte access during an active bit session",
            ));
        }
        Ok(())
    }

    /// Begin a bit session at the current byte cursor.
    pub(crate) fn start_bit_access(&mut self) -> Result<()> {
        if self.has_bit_access() {
            return Err(BufferError::InvalidBitAccessState(
                "bit session already active",
            ));
        }
        if self.position == 0 {
            return Err(BufferError::InvalidBitAccessState(
                "bit access cannot start at position 0",
            ));
        }
        self.bit_position = self.position * BYTE_SIZE;
        Ok(())
    }

    /// End the bit session, rounding the byte cursor up to the next whole
    /// byte.
    pub(crate) fn finish_bit_access(&mut self) -> Result<()> {
        if !self.has_bit_access() {
            return Err(BufferError::InvalidBitAccessState(
                "no bit session to finish",
            ));
        }
        self.position = (self.bit_position + (BYTE_SIZE - 1)) / BYTE_SIZE;
        self.bit_position = 0;
        Ok(())
    }
}
