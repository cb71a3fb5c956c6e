//! In-place XTEA block transform.
//!
//! 64-bit blocks, 128-bit key, 32 Feistel rounds. Words are read and written
//! big-endian regardless of the buffer's byte-order mode. Used to protect
//! update and login payloads inside an already-assembled buffer.

use tracing::trace;

use crate::error::{BufferError, Result};

/// Four 32-bit key words, caller-supplied per call.
pub type XteaKey = [u32; 4];

const DELTA: u32 = 0x9E37_79B9;
const ROUNDS: u32 = 32;
const BLOCK_SIZE: usize = 8;

/// Validate `[start, end)` as an in-bounds, block-aligned cipher range.
///
/// Misaligned ranges fail rather than silently flooring to whole blocks, so
/// framing bugs surface at the call site instead of as garbage plaintext.
fn check_range(data: &[u8], start: usize, end: usize) -> Result<()> {
    if start > end || end > data.len() || (end - start) % BLOCK_SIZE != 0 {
        return Err(BufferError::InvalidRange {
            start,
            end,
            len: data.len(),
        });
    }
    Ok(())
}

/// Encrypt `[start, end)` of `data` in place.
pub(crate) fn encrypt(data: &mut [u8], key: &XteaKey, start: usize, end: usize) -> Result<()> {
    check_range(data, start, end)?;
    trace!(start, end, blocks = (end - start) / BLOCK_SIZE, "xtea encrypt");
    for block in data[start..end].chunks_exact_mut(BLOCK_SIZE) {
        let (mut v0, mut v1) = load_block(block);
        let mut sum = 0u32;
        for _ in 0..ROUNDS {
            v0 = v0.wrapping_add(
                (v1.wrapping_add((v1 >> 5) ^ (v1 << 4)))
                    ^ sum.wrapping_add(key[(sum & 3) as usize]),
            );
            sum = sum.wrapping_add(DELTA);
            v1 = v1.wrapping_add(
                (v0.wrapping_add((v0 >> 5) ^ (v0 << 4)))
                    ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize]),
            );
        }
        store_block(block, v0, v1);
    }
    Ok(())
}

/// Decrypt `[start, end)` of `data` in place.
pub(crate) fn decrypt(data: &mut [u8], key: &XteaKey, start: usize, end: usize) -> Result<()> {
    check_range(data, start, end)?;
    trace!(start, end, blocks = (end - start) / BLOCK_SIZE, "xtea decrypt");
    for block in data[start..end].chunks_exact_mut(BLOCK_SIZE) {
        let (mut v0, mut v1) = load_block(block);
        let mut sum = DELTA.wrapping_mul(ROUNDS);
        for _ in 0..ROUNDS {
            v1 = v1.wrapping_sub(
                (v0.wrapping_add((v0 >> 5) ^ (v0 << 4)))
                    ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize]),
            );
            sum = sum.wrapping_sub(DELTA);
            v0 = v0.wrapping_sub(
                (v1.wrapping_add((v1 >> 5) ^ (v1 << 4)))
                    ^ sum.wrapping_add(key[(sum & 3) as usize]),
            );
        }
        store_block(block, v0, v1);
    }
    Ok(())
}

fn load_block(block: &[u8]) -> (u32, u32) {
    let v0 = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
    let v1 = u32::from_be_bytes([block[4], block[5], block[6], block[7]]);
    (v0, v1)
}

fn store_block(block: &mut [u8], v0: u32, v1: u32) {
    block[0..4].copy_from_slice(&v0.to_be_bytes());
    block[4..8].copy_from_slice(&v1.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let original: Vec<u8> = (0u8..32).collect();
        let key = [0xDEAD_BEEF, 0x0BAD_F00D, 0x1234_5678, 0x9ABC_DEF0];

        let mut data = original.clone();
        encrypt(&mut data, &key, 0, 32).unwrap();
        assert_ne!(data, original);
        decrypt(&mut data, &key, 0, 32).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn partial_range_leaves_rest_untouched() {
        let original: Vec<u8> = (0u8..24).collect();
        let key = [1, 2, 3, 4];

        let mut data = original.clone();
        encrypt(&mut data, &key, 8, 16).unwrap();
        assert_eq!(&data[0..8], &original[0..8]);
        assert_eq!(&data[16..24], &original[16..24]);
        assert_ne!(&data[8..16], &original[8..16]);

        decrypt(&mut data, &key, 8, 16).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn wrong_key_does_not_round_trip() {
        let original: Vec<u8> = (100u8..116).collect();
        let mut data = original.clone();
        encrypt(&mut data, &[9, 5, 6, 4], 0, 16).unwrap();
        decrypt(&mut data, &[9, 5, 6, 5], 0, 16).unwrap();
        assert_ne!(data, original);
    }

    #[test]
    fn misaligned_range_rejected() {
        let mut data = vec![0u8; 12];
        let err = encrypt(&mut data, &[0; 4], 0, 12).unwrap_err();
        assert!(matches!(err, BufferError::InvalidRange { .. }));
    }

    #[test]
    fn out_of_bounds_range_rejected() {
        let mut data = vec![0u8; 8];
        assert!(encrypt(&mut data, &[0; 4], 0, 16).is_err());
        assert!(decrypt(&mut data, &[0; 4], 8, 0).is_err());
    }

    #[test]
    fn empty_range_is_a_no_op() {
        let mut data = vec![7u8; 8];
        encrypt(&mut data, &[1, 2, 3, 4], 4, 4).unwrap();
        assert_eq!(data, vec![7u8; 8]);
    }
}
