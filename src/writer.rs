use bytes::Bytes;
use tracing::trace;

use crate::buffer::{BufferCore, ByteOrder, BIT_MASK, BYTE_SIZE};
use crate::charset;
use crate::error::{BufferError, Result};
use crate::reader::InputBuffer;
use crate::xtea::{self, XteaKey};

/// Sequential encode cursor over an auto-growing byte store.
///
/// Writes never fail for capacity reasons: a write past the current
/// allocation reallocates to exactly the required size. Capacity is
/// typically known in advance on this protocol, so growth is the rare path
/// and an amortized policy would only pad the common case.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    core: BufferCore,
}

impl OutputBuffer {
    /// Create an encode cursor with an initial capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            core: BufferCore::new(vec![0u8; capacity]),
        }
    }

    pub(crate) fn from_core(core: BufferCore) -> Self {
        Self { core }
    }

    /// Active byte order for multi-byte writes.
    pub fn byte_order(&self) -> ByteOrder {
        self.core.order()
    }

    /// Change the byte order for subsequent writes.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.core.set_order(order);
    }

    /// Current byte cursor.
    pub fn position(&self) -> usize {
        self.core.position
    }

    /// Bytes left before the next write triggers a reallocation.
    pub fn remaining(&self) -> usize {
        self.core.remaining()
    }

    /// True if at least one byte can be written without reallocating.
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Move the cursor by `delta` bytes within the current allocation.
    pub fn jump(&mut self, delta: isize) -> Result<()> {
        self.core.jump(delta)
    }

    /// Snapshot of the written prefix, `[0, position)`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.core.data[..self.core.position])
    }

    /// The full backing allocation, including any unwritten tail.
    pub fn raw(&self) -> &[u8] {
        &self.core.data
    }

    /// Grow the backing store so `position + extra` bytes fit.
    fn ensure_capacity(&mut self, extra: usize) {
        let required = self.core.position + extra;
        if required > self.core.data.len() {
            trace!(from = self.core.data.len(), to = required, "grow backing store");
            self.core.data.resize(required, 0);
        }
    }

    /// Grow the backing store to at least `len` bytes.
    fn grow_to(&mut self, len: usize) {
        if len > self.core.data.len() {
            trace!(from = self.core.data.len(), to = len, "grow backing store");
            self.core.data.resize(len, 0);
        }
    }

    /// Write one raw byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.core.check_byte_access()?;
        self.ensure_capacity(1);
        self.core.data[self.core.position] = value;
        self.core.position += 1;
        Ok(())
    }

    /// Write one signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    /// Write a boolean as one byte (`1` for true).
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    /// Write a byte slice.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.core.check_byte_access()?;
        self.ensure_capacity(bytes.len());
        let start = self.core.position;
        self.core.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.core.position += bytes.len();
        Ok(())
    }

    fn write_u16_order(&mut self, value: u16, order: ByteOrder) -> Result<()> {
        match order {
            ByteOrder::BigEndian => {
                self.write_u8((value >> 8) as u8)?;
                self.write_u8(value as u8)
            }
            ByteOrder::LittleEndian => {
                self.write_u8(value as u8)?;
                self.write_u8((value >> 8) as u8)
            }
        }
    }

    /// Write an unsigned 16-bit value in the active byte order.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_u16_order(value, self.core.order())
    }

    /// Write a signed 16-bit value in the active byte order.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    /// Write the low 24 bits of `value` as 3 bytes in the active byte order.
    pub fn write_u24(&mut self, value: u32) -> Result<()> {
        match self.core.order() {
            ByteOrder::BigEndian => {
                self.write_u8((value >> 16) as u8)?;
                self.write_u8((value >> 8) as u8)?;
                self.write_u8(value as u8)
            }
            ByteOrder::LittleEndian => {
                self.write_u8(value as u8)?;
                self.write_u8((value >> 8) as u8)?;
                self.write_u8((value >> 16) as u8)
            }
        }
    }

    fn write_u32_order(&mut self, value: u32, order: ByteOrder) -> Result<()> {
        match order {
            ByteOrder::BigEndian => {
                self.write_u8((value >> 24) as u8)?;
                self.write_u8((value >> 16) as u8)?;
                self.write_u8((value >> 8) as u8)?;
                self.write_u8(value as u8)
            }
            ByteOrder::LittleEndian => {
                self.write_u8(value as u8)?;
                self.write_u8((value >> 8) as u8)?;
                self.write_u8((value >> 16) as u8)?;
                self.write_u8((value >> 24) as u8)
            }
        }
    }

    /// Write a signed 32-bit value in the active byte order.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32_order(value as u32, self.core.order())
    }

    /// Write an unsigned 32-bit value in the active byte order.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u32_order(value, self.core.order())
    }

    /// Write a signed 32-bit value in the opposite of the active byte order.
    pub fn write_i32_reversed(&mut self, value: i32) -> Result<()> {
        self.write_u32_order(value as u32, self.core.order().reversed())
    }

    /// Write a signed 64-bit value in the active byte order.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        let value = value as u64;
        match self.core.order() {
            ByteOrder::BigEndian => {
                for shift in (0..8).rev() {
                    self.write_u8((value >> (shift * 8)) as u8)?;
                }
            }
            ByteOrder::LittleEndian => {
                for shift in 0..8 {
                    self.write_u8((value >> (shift * 8)) as u8)?;
                }
            }
        }
        Ok(())
    }

    /// Write a 32-bit float as its raw IEEE-754 bit pattern.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32_order(value.to_bits(), self.core.order())
    }

    /// Write a 32-bit float in the opposite of the active byte order.
    pub fn write_f32_reversed(&mut self, value: f32) -> Result<()> {
        self.write_u32_order(value.to_bits(), self.core.order().reversed())
    }

    fn write_u16_add_order(&mut self, value: u16, order: ByteOrder) -> Result<()> {
        let high = (value >> 8) as u8;
        let low = (value as u8).wrapping_add(128);
        match order {
            ByteOrder::BigEndian => {
                self.write_u8(high)?;
                self.write_u8(low)
            }
            ByteOrder::LittleEndian => {
                self.write_u8(low)?;
                self.write_u8(high)
            }
        }
    }

    /// Write an off-by-128 unsigned 16-bit value (low byte stored `+128`).
    pub fn write_u16_add(&mut self, value: u16) -> Result<()> {
        self.write_u16_add_order(value, self.core.order())
    }

    /// Write an off-by-128 signed 16-bit value.
    pub fn write_i16_add(&mut self, value: i16) -> Result<()> {
        self.write_u16_add(value as u16)
    }

    /// Write an off-by-128 unsigned 16-bit value in the opposite byte order.
    pub fn write_u16_add_reversed(&mut self, value: u16) -> Result<()> {
        self.write_u16_add_order(value, self.core.order().reversed())
    }

    /// Write a 32-bit value in the protocol's V1 swapped layout
    /// (`[v>>8, v, v>>24, v>>16]` on the wire).
    pub fn write_i32_v1(&mut self, value: i32) -> Result<()> {
        let v = value as u32;
        self.write_u8((v >> 8) as u8)?;
        self.write_u8(v as u8)?;
        self.write_u8((v >> 24) as u8)?;
        self.write_u8((v >> 16) as u8)
    }

    /// Write a 32-bit value in the protocol's V2 swapped layout
    /// (`[v>>16, v>>24, v, v>>8]` on the wire).
    pub fn write_i32_v2(&mut self, value: i32) -> Result<()> {
        let v = value as u32;
        self.write_u8((v >> 16) as u8)?;
        self.write_u8((v >> 24) as u8)?;
        self.write_u8(v as u8)?;
        self.write_u8((v >> 8) as u8)
    }

    /// Write a smart: one byte `value + 64` for −64..=63, else two bytes
    /// `value + 49152`.
    pub fn write_smart(&mut self, value: i32) -> Result<()> {
        if (-64..64).contains(&value) {
            self.write_u8((value + 64) as u8)
        } else {
            self.write_u16(value.wrapping_add(49152) as u16)
        }
    }

    /// Write an unsigned smart: one byte for 0..128, else two bytes
    /// `value + 32768`.
    pub fn write_unsigned_smart(&mut self, value: i32) -> Result<()> {
        if value < 128 {
            self.write_u8(value as u8)
        } else {
            self.write_u16(value.wrapping_add(32768) as u16)
        }
    }

    /// Write an accumulated smart: 32767-sentinel unsigned-smart chunks
    /// until the remainder fits in one terminal chunk.
    pub fn write_smart2(&mut self, value: i32) -> Result<()> {
        let mut remaining = value;
        while remaining >= i16::MAX as i32 {
            self.write_unsigned_smart(i16::MAX as i32)?;
            remaining -= i16::MAX as i32;
        }
        self.write_unsigned_smart(remaining)
    }

    /// Write a big smart: values ≥ 32767 take the sign-bit-flagged 32-bit
    /// form, smaller non-negative values the 16-bit form, and negative
    /// input the 32767 "no value" sentinel.
    pub fn write_big_smart(&mut self, value: i32) -> Result<()> {
        if value >= i16::MAX as i32 {
            self.write_i32(value.wrapping_sub(i32::MAX).wrapping_sub(1))
        } else if value >= 0 {
            self.write_u16(value as u16)
        } else {
            self.write_u16(i16::MAX as u16)
        }
    }

    /// Write a null-terminated string in the legacy character set.
    /// Unrepresentable characters are written as `?`.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        for c in value.chars() {
            self.write_u8(charset::encode_char(c))?;
        }
        self.write_u8(0)
    }

    /// Write a newline-terminated string with no substitution (legacy
    /// line-oriented fields).
    pub fn write_string_raw(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_u8(10)
    }

    /// Begin a bit session at the current byte cursor (which must be > 0).
    pub fn start_bit_access(&mut self) -> Result<()> {
        self.core.start_bit_access()
    }

    /// End the bit session, rounding the byte cursor up to a whole byte.
    pub fn finish_bit_access(&mut self) -> Result<()> {
        self.core.finish_bit_access()
    }

    /// True while a bit session is open.
    pub fn has_bit_access(&self) -> bool {
        self.core.has_bit_access()
    }

    /// Current bit cursor, 0 when no session is open.
    pub fn bit_position(&self) -> usize {
        self.core.bit_position
    }

    /// Write the low `width` bits of `value` (1..=32), MSB-first, spanning
    /// bytes as needed and growing the store for bytes that do not exist
    /// yet. Bits outside the addressed range keep their prior contents.
    pub fn write_bits(&mut self, width: u32, value: u32) -> Result<()> {
        assert!((1..=32).contains(&width), "bit width must be 1..=32");
        if !self.core.has_bit_access() {
            return Err(BufferError::InvalidBitAccessState(
                "bit write outside a bit session",
            ));
        }
        let end_byte = (self.core.bit_position + width as usize + BYTE_SIZE - 1) / BYTE_SIZE;
        self.grow_to(end_byte);

        let mut bits = width as usize;
        let mut byte_pos = self.core.bit_position >> 3;
        let mut bits_in_byte = BYTE_SIZE - (self.core.bit_position & (BYTE_SIZE - 1));
        self.core.bit_position += bits;

        while bits > bits_in_byte {
            let mask = BIT_MASK[bits_in_byte];
            let merged = (self.core.data[byte_pos] as u32 & !mask)
                | ((value >> (bits - bits_in_byte)) & mask);
            self.core.data[byte_pos] = merged as u8;
            byte_pos += 1;
            bits -= bits_in_byte;
            bits_in_byte = BYTE_SIZE;
        }
        if bits == bits_in_byte {
            let mask = BIT_MASK[bits_in_byte];
            let merged = (self.core.data[byte_pos] as u32 & !mask) | (value & mask);
            self.core.data[byte_pos] = merged as u8;
        } else {
            let mask = BIT_MASK[bits] << (bits_in_byte - bits);
            let merged = (self.core.data[byte_pos] as u32 & !mask)
                | ((value << (bits_in_byte - bits)) & mask);
            self.core.data[byte_pos] = merged as u8;
        }
        Ok(())
    }

    /// Encrypt `[start, end)` of the backing bytes in place with XTEA.
    /// The cursor is unaffected.
    pub fn encrypt_xtea(&mut self, key: &XteaKey, start: usize, end: usize) -> Result<()> {
        xtea::encrypt(&mut self.core.data, key, start, end)
    }

    /// Clone the backing bytes into a decode cursor. The byte-order flag is
    /// carried across; the cursor lands at the source position when
    /// `copy_position` is set, otherwise at 0.
    pub fn to_input(&self, copy_position: bool) -> InputBuffer {
        let mut core = self.core.clone();
        core.bit_position = 0;
        if !copy_position {
            core.position = 0;
        }
        InputBuffer::from_core(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_to_exact_required_size() {
        let mut buf = OutputBuffer::with_capacity(0);
        buf.write_u8(7).unwrap();
        assert_eq!(buf.raw().len(), 1);
        buf.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(buf.raw().len(), 4);
        assert_eq!(buf.position(), 4);
    }

    #[test]
    fn growth_preserves_written_bytes() {
        let mut buf = OutputBuffer::with_capacity(2);
        buf.write_u8(0xAA).unwrap();
        buf.write_u8(0xBB).unwrap();
        buf.write_i32(0x0102_0304).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0xAA, 0xBB, 1, 2, 3, 4]);
    }

    #[test]
    fn to_bytes_excludes_unwritten_tail() {
        let mut buf = OutputBuffer::with_capacity(16);
        buf.write_u16(0x0102).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[1, 2]);
        assert_eq!(buf.raw().len(), 16);
    }

    #[test]
    fn u16_respects_byte_order() {
        let mut buf = OutputBuffer::with_capacity(2);
        buf.write_u16(0x1234).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x12, 0x34]);

        let mut buf = OutputBuffer::with_capacity(2);
        buf.set_byte_order(ByteOrder::LittleEndian);
        buf.write_u16(0x1234).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x34, 0x12]);
    }

    #[test]
    fn reversed_int_forces_opposite_order() {
        let mut buf = OutputBuffer::with_capacity(8);
        buf.write_i32(0x0102_0304).unwrap();
        buf.write_i32_reversed(0x0102_0304).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[1, 2, 3, 4, 4, 3, 2, 1]);
    }

    #[test]
    fn off_by_128_short_layouts() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.write_u16_add(0x1234).unwrap();
        buf.write_u16_add_reversed(0x1234).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x12, 0xB4, 0xB4, 0x12]);
    }

    #[test]
    fn v1_and_v2_layouts() {
        let mut buf = OutputBuffer::with_capacity(8);
        buf.write_i32_v1(0x0102_0304).unwrap();
        buf.write_i32_v2(0x0102_0304).unwrap();
        assert_eq!(
            buf.to_bytes().as_ref(),
            &[0x03, 0x04, 0x01, 0x02, 0x02, 0x01, 0x04, 0x03]
        );
    }

    #[test]
    fn smart_boundary_encodings() {
        let cases: [(i32, &[u8]); 4] = [
            (-64, &[0]),
            (63, &[127]),
            (64, &[0xC0, 0x40]),
            (-65, &[0xBF, 0xBF]),
        ];
        for (value, wire) in cases {
            let mut buf = OutputBuffer::with_capacity(2);
            buf.write_smart(value).unwrap();
            assert_eq!(buf.to_bytes().as_ref(), wire, "smart({value})");
        }
    }

    #[test]
    fn unsigned_smart_boundary_encodings() {
        let cases: [(i32, &[u8]); 3] = [(0, &[0]), (127, &[127]), (128, &[0x80, 0x80])];
        for (value, wire) in cases {
            let mut buf = OutputBuffer::with_capacity(2);
            buf.write_unsigned_smart(value).unwrap();
            assert_eq!(buf.to_bytes().as_ref(), wire, "unsigned_smart({value})");
        }
    }

    #[test]
    fn big_smart_wide_form_sets_sign_bit() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.write_big_smart(32767).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x80, 0x00, 0x7F, 0xFF]);
    }

    #[test]
    fn big_smart_negative_writes_sentinel() {
        let mut buf = OutputBuffer::with_capacity(2);
        buf.write_big_smart(-1).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x7F, 0xFF]);
    }

    #[test]
    fn float_is_raw_bit_pattern() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.write_f32(1.5).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &1.5f32.to_bits().to_be_bytes());
    }

    #[test]
    fn string_terminates_with_zero_and_substitutes() {
        let mut buf = OutputBuffer::with_capacity(8);
        buf.write_string("a\u{20ac}\u{4e2d}").unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[b'a', 0x80, b'?', 0]);
    }

    #[test]
    fn raw_string_terminates_with_newline() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.write_string_raw("hi").unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[b'h', b'i', 10]);
    }

    #[test]
    fn byte_write_during_bit_session_fails() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.write_u8(1).unwrap();
        buf.start_bit_access().unwrap();
        assert!(matches!(
            buf.write_u8(2),
            Err(BufferError::InvalidBitAccessState(_))
        ));
    }

    #[test]
    fn bit_write_outside_session_fails() {
        let mut buf = OutputBuffer::with_capacity(4);
        assert!(matches!(
            buf.write_bits(4, 0xF),
            Err(BufferError::InvalidBitAccessState(_))
        ));
    }

    #[test]
    fn bit_writes_grow_the_store() {
        let mut buf = OutputBuffer::with_capacity(1);
        buf.write_u8(0).unwrap();
        buf.start_bit_access().unwrap();
        buf.write_bits(32, 0xDEAD_BEEF).unwrap();
        buf.finish_bit_access().unwrap();
        assert_eq!(buf.position(), 5);
        assert_eq!(&buf.raw()[1..5], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn bit_writes_keep_neighboring_bits() {
        let mut buf = OutputBuffer::with_capacity(2);
        buf.write_u8(0b1010_1010).unwrap();
        buf.start_bit_access().unwrap();
        buf.write_bits(3, 0b111).unwrap();
        buf.write_bits(2, 0b00).unwrap();
        buf.finish_bit_access().unwrap();
        // First byte untouched, second byte 111 00 xxx with unwritten zeros.
        assert_eq!(buf.raw()[0], 0b1010_1010);
        assert_eq!(buf.raw()[1], 0b1110_0000);
    }

    #[test]
    fn jump_rewrites_in_place() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.write_i32(0).unwrap();
        buf.jump(-4).unwrap();
        buf.write_i32(0x0102_0304).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[1, 2, 3, 4]);
    }
}
