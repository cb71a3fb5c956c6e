use bytes::Bytes;

use crate::buffer::{BufferCore, ByteOrder, BIT_MASK, BYTE_SIZE};
use crate::charset;
use crate::error::{BufferError, Result};
use crate::writer::OutputBuffer;
use crate::xtea::{self, XteaKey};

/// Sequential decode cursor over a fixed byte region.
///
/// Reads advance the cursor and fail with [`BufferError::OutOfData`] once the
/// region is exhausted; the backing bytes never grow. Multi-byte reads follow
/// the active [`ByteOrder`] unless the method name says otherwise.
#[derive(Debug, Clone)]
pub struct InputBuffer {
    core: BufferCore,
}

impl InputBuffer {
    /// Create a decode cursor over `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            core: BufferCore::new(data.into()),
        }
    }

    pub(crate) fn from_core(core: BufferCore) -> Self {
        Self { core }
    }

    /// Active byte order for multi-byte reads.
    pub fn byte_order(&self) -> ByteOrder {
        self.core.order()
    }

    /// Change the byte order for subsequent reads.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.core.set_order(order);
    }

    /// Current byte cursor.
    pub fn position(&self) -> usize {
        self.core.position
    }

    /// Bytes left between the cursor and the end of the region.
    pub fn remaining(&self) -> usize {
        self.core.remaining()
    }

    /// True if at least one byte is left to read.
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Move the cursor by `delta` bytes (may be negative).
    pub fn jump(&mut self, delta: isize) -> Result<()> {
        self.core.jump(delta)
    }

    /// Copy of the bytes read so far, `[0, position)`.
    pub fn consumed(&self) -> Bytes {
        Bytes::copy_from_slice(&self.core.data[..self.core.position])
    }

    /// The unread bytes, `[position, len)`.
    pub fn remaining_bytes(&self) -> &[u8] {
        &self.core.data[self.core.position..]
    }

    /// The full backing region, independent of the cursor.
    pub fn raw(&self) -> &[u8] {
        &self.core.data
    }

    fn out_of_data(&self, requested: usize) -> BufferError {
        BufferError::OutOfData {
            requested,
            remaining: self.remaining(),
        }
    }

    /// Read one raw byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.core.check_byte_access()?;
        let byte = *self
            .core
            .data
            .get(self.core.position)
            .ok_or_else(|| self.out_of_data(1))?;
        self.core.position += 1;
        Ok(byte)
    }

    /// Read one signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a boolean encoded as one byte (`1` is true).
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? == 1)
    }

    /// Read `len` bytes into a fresh vector.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.read_into(&mut out)?;
        Ok(out)
    }

    /// Fill `dst` from the cursor.
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<()> {
        self.core.check_byte_access()?;
        if dst.len() > self.remaining() {
            return Err(self.out_of_data(dst.len()));
        }
        let start = self.core.position;
        dst.copy_from_slice(&self.core.data[start..start + dst.len()]);
        self.core.position += dst.len();
        Ok(())
    }

    /// Peek at the byte under the cursor without consuming it.
    fn peek_u8(&self) -> Result<u8> {
        self.core.check_byte_access()?;
        self.core
            .data
            .get(self.core.position)
            .copied()
            .ok_or_else(|| self.out_of_data(1))
    }

    /// Read an unsigned 16-bit value in the active byte order.
    pub fn read_u16(&mut self) -> Result<u16> {
        let a = self.read_u8()? as u16;
        let b = self.read_u8()? as u16;
        Ok(match self.core.order() {
            ByteOrder::BigEndian => (a << 8) | b,
            ByteOrder::LittleEndian => a | (b << 8),
        })
    }

    /// Read a signed 16-bit value in the active byte order.
    ///
    /// Sign reconstruction is explicit arithmetic (`> 32767` subtracts 65536)
    /// so the behavior is identical across targets, per the wire contract.
    pub fn read_i16(&mut self) -> Result<i16> {
        let mut value = self.read_u16()? as i32;
        if value > i16::MAX as i32 {
            value -= 65536;
        }
        Ok(value as i16)
    }

    /// Read an unsigned 24-bit value (3 bytes, no sign extension).
    pub fn read_u24(&mut self) -> Result<u32> {
        let a = self.read_u8()? as u32;
        let b = self.read_u8()? as u32;
        let c = self.read_u8()? as u32;
        Ok(match self.core.order() {
            ByteOrder::BigEndian => (a << 16) | (b << 8) | c,
            ByteOrder::LittleEndian => a | (b << 8) | (c << 16),
        })
    }

    fn read_u32_order(&mut self, order: ByteOrder) -> Result<u32> {
        let a = self.read_u8()? as u32;
        let b = self.read_u8()? as u32;
        let c = self.read_u8()? as u32;
        let d = self.read_u8()? as u32;
        Ok(match order {
            ByteOrder::BigEndian => (a << 24) | (b << 16) | (c << 8) | d,
            ByteOrder::LittleEndian => a | (b << 8) | (c << 16) | (d << 24),
        })
    }

    /// Read a signed 32-bit value in the active byte order.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32_order(self.core.order())? as i32)
    }

    /// Read an unsigned 32-bit value in the active byte order.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_u32_order(self.core.order())
    }

    /// Read a signed 32-bit value in the opposite of the active byte order.
    pub fn read_i32_reversed(&mut self) -> Result<i32> {
        Ok(self.read_u32_order(self.core.order().reversed())? as i32)
    }

    /// Read a signed 64-bit value in the active byte order.
    pub fn read_i64(&mut self) -> Result<i64> {
        let mut value = 0u64;
        match self.core.order() {
            ByteOrder::BigEndian => {
                for _ in 0..8 {
                    value = (value << 8) | self.read_u8()? as u64;
                }
            }
            ByteOrder::LittleEndian => {
                for shift in 0..8 {
                    value |= (self.read_u8()? as u64) << (shift * 8);
                }
            }
        }
        Ok(value as i64)
    }

    /// Read a 32-bit float stored as its raw IEEE-754 bit pattern.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_i32()? as u32))
    }

    /// Read a 32-bit float in the opposite of the active byte order.
    pub fn read_f32_reversed(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_i32_reversed()? as u32))
    }

    fn read_u16_add_order(&mut self, order: ByteOrder) -> Result<u16> {
        let (high, low) = match order {
            ByteOrder::BigEndian => {
                let high = self.read_u8()?;
                let low = self.read_u8()?.wrapping_sub(128);
                (high, low)
            }
            ByteOrder::LittleEndian => {
                let low = self.read_u8()?.wrapping_sub(128);
                let high = self.read_u8()?;
                (high, low)
            }
        };
        Ok(((high as u16) << 8) | low as u16)
    }

    /// Read an off-by-128 unsigned 16-bit value (low byte stored `+128`).
    pub fn read_u16_add(&mut self) -> Result<u16> {
        self.read_u16_add_order(self.core.order())
    }

    /// Read an off-by-128 signed 16-bit value.
    pub fn read_i16_add(&mut self) -> Result<i16> {
        let mut value = self.read_u16_add()? as i32;
        if value > i16::MAX as i32 {
            value -= 65536;
        }
        Ok(value as i16)
    }

    /// Read an off-by-128 unsigned 16-bit value in the opposite byte order.
    pub fn read_u16_add_reversed(&mut self) -> Result<u16> {
        self.read_u16_add_order(self.core.order().reversed())
    }

    /// Read a 32-bit value in the protocol's V1 swapped layout
    /// (`[v>>8, v, v>>24, v>>16]` on the wire).
    pub fn read_i32_v1(&mut self) -> Result<i32> {
        let a = self.read_u8()? as u32;
        let b = self.read_u8()? as u32;
        let c = self.read_u8()? as u32;
        let d = self.read_u8()? as u32;
        Ok(((a << 8) | b | (c << 24) | (d << 16)) as i32)
    }

    /// Read a 32-bit value in the protocol's V2 swapped layout
    /// (`[v>>16, v>>24, v, v>>8]` on the wire).
    pub fn read_i32_v2(&mut self) -> Result<i32> {
        let a = self.read_u8()? as u32;
        let b = self.read_u8()? as u32;
        let c = self.read_u8()? as u32;
        let d = self.read_u8()? as u32;
        Ok(((a << 16) | (b << 24) | c | (d << 8)) as i32)
    }

    /// Read a smart: one byte biased by 64 for small values, two bytes
    /// biased by 49152 otherwise.
    pub fn read_smart(&mut self) -> Result<i32> {
        if self.peek_u8()? < 128 {
            Ok(self.read_u8()? as i32 - 64)
        } else {
            Ok(self.read_u16()? as i32 - 49152)
        }
    }

    /// Read an unsigned smart: one byte for values under 128, two bytes
    /// biased by 32768 otherwise.
    pub fn read_unsigned_smart(&mut self) -> Result<i32> {
        if self.peek_u8()? < 128 {
            Ok(self.read_u8()? as i32)
        } else {
            Ok(self.read_u16()? as i32 - 32768)
        }
    }

    /// Read an accumulated smart: unsigned-smart chunks where 32767 is a
    /// continuation sentinel, summed until a terminal chunk arrives.
    pub fn read_smart2(&mut self) -> Result<i32> {
        let mut total = 0i32;
        let mut chunk = self.read_unsigned_smart()?;
        while chunk == i16::MAX as i32 {
            chunk = self.read_unsigned_smart()?;
            total += i16::MAX as i32;
        }
        Ok(total + chunk)
    }

    /// Read a big smart: a sign-bit-flagged 32-bit form, or a 16-bit form
    /// where 32767 means "no value" and decodes as −1.
    pub fn read_big_smart(&mut self) -> Result<i32> {
        if (self.peek_u8()? as i8) < 0 {
            return Ok(self.read_i32()? & 0x7FFF_FFFF);
        }
        let value = self.read_u16()?;
        if value == i16::MAX as u16 {
            return Ok(-1);
        }
        Ok(value as i32)
    }

    /// Read a null-terminated string in the legacy character set.
    ///
    /// Zero bytes inside the span are treated as padding and skipped.
    pub fn read_string(&mut self) -> Result<String> {
        self.core.check_byte_access()?;
        let start = self.core.position;
        while self.read_u8()? != 0 {}
        let span = &self.core.data[start..self.core.position - 1];
        let mut out = String::with_capacity(span.len());
        for &byte in span {
            if byte == 0 {
                continue;
            }
            out.push(charset::decode_byte(byte));
        }
        Ok(out)
    }

    /// Read a newline-terminated string with no substitution (legacy
    /// line-oriented fields).
    pub fn read_string_raw(&mut self) -> Result<String> {
        self.core.check_byte_access()?;
        let start = self.core.position;
        while self.read_u8()? != 10 {}
        let span = &self.core.data[start..self.core.position - 1];
        Ok(span.iter().map(|&b| b as char).collect())
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

    /// Read `width` bits (1..=32), MSB-first, spanning bytes as needed.
    pub fn read_bits(&mut self, width: u32) -> Result<u32> {
        assert!((1..=32).contains(&width), "bit width must be 1..=32");
        if !self.core.has_bit_access() {
            return Err(BufferError::InvalidBitAccessState(
                "bit read outside a bit session",
            ));
        }
        let end_byte = (self.core.bit_position + width as usize + BYTE_SIZE - 1) / BYTE_SIZE;
        if end_byte > self.core.data.len() {
            return Err(BufferError::OutOfData {
                requested: end_byte - self.core.data.len(),
                remaining: 0,
            });
        }

        let mut bits = width as usize;
        let mut byte_pos = self.core.bit_position >> 3;
        let mut bits_in_byte = BYTE_SIZE - (self.core.bit_position & (BYTE_SIZE - 1));
        self.core.bit_position += bits;

        let mut value = 0u32;
        while bits > bits_in_byte {
            value |= (self.core.data[byte_pos] as u32 & BIT_MASK[bits_in_byte])
                << (bits - bits_in_byte);
            byte_pos += 1;
            bits -= bits_in_byte;
            bits_in_byte = BYTE_SIZE;
        }
        if bits == bits_in_byte {
            value |= self.core.data[byte_pos] as u32 & BIT_MASK[bits_in_byte];
        } else {
            value |= (self.core.data[byte_pos] as u32 >> (bits_in_byte - bits)) & BIT_MASK[bits];
        }
        Ok(value)
    }

    /// Decrypt `[start, end)` of the backing bytes in place with XTEA.
    /// The cursor is unaffected.
    pub fn decrypt_xtea(&mut self, key: &XteaKey, start: usize, end: usize) -> Result<()> {
        xtea::decrypt(&mut self.core.data, key, start, end)
    }

    /// Clone the backing bytes into an encode cursor. The byte-order flag is
    /// carried across; the cursor lands at the source position when
    /// `copy_position` is set, otherwise at the end of the data.
    pub fn to_output(&self, copy_position: bool) -> OutputBuffer {
        let mut core = self.core.clone();
        core.bit_position = 0;
        if !copy_position {
            core.position = core.data.len();
        }
        OutputBuffer::from_core(core)
    }
}
