//! Dual-cursor binary buffer for a legacy game network and cache protocol.
//!
//! Two cursor types over one growable byte store:
//! - [`InputBuffer`] decodes a fixed byte region sequentially
//! - [`OutputBuffer`] encodes sequentially, growing the store on demand
//!
//! Both share the same codec surface:
//! - Byte-order-aware fixed-width primitives, including the protocol's
//!   off-by-128 16-bit family and the historically swapped 32-bit layouts
//! - The "smart" variable-length integer family
//! - A bit-packing sub-protocol bracketed by explicit session calls
//! - In-place XTEA over byte ranges (update/login payload protection)
//! - A null-terminated legacy text codec with a substitution table for
//!   bytes `0x80..=0x9F`
//!
//! This is not a stream abstraction: everything operates on an in-memory
//! byte sequence, and framing/schemas belong to the layers above.

pub mod buffer;
mod charset;
pub mod error;
pub mod reader;
pub mod writer;
pub mod xtea;

pub use buffer::ByteOrder;
pub use error::{BufferError, Result};
pub use reader::InputBuffer;
pub use writer::OutputBuffer;
pub use xtea::XteaKey;
