//! Bit-level encoding primitives for the asset instruction format
//!
//! - `bitstream`: append-only bit buffer packed MSB-first
//! - `precision`: variable-length, exponent-compressed integer encoding

pub mod bitstream;
pub mod precision;

pub use bitstream::BitStream;
