//! # `packints`: Bit-packed integer storage in Rust
//!
//! `packints` stores large sequences of integers in space proportional to the bits they need.
//!
//! ## Data structures
//!
//! - [`FixedWidthArray`](packed::FixedWidthArray)
//!   - Array in which every value occupies the same number of bits, in one of two layouts.
//! - [`GrowableArray`](packed::GrowableArray)
//!   - Array that widens itself when a stored value no longer fits.
//! - [`PagedArray`](packed::PagedArray)
//!   - Resizable array split into fixed-size pages, each widened independently when growable.
//! - [`AppendBuffer`](packed::AppendBuffer)
//!   - Append-only buffer that compresses every full page with a delta, monotonic or plain codec.
//! - [`PackedWriter`](packed::PackedWriter), [`PackedReaderIterator`](packed::PackedReaderIterator)
//!   and [`DirectReader`](packed::DirectReader)
//!   - Streaming write, sequential read and in-place random access of a serialized array.
//! - [`BlockPackedWriter`] and [`BlockPackedReader`]
//!   - Streaming codec writing blocks of packed deltas with a one-byte header each.
//! - [`EliasFanoEncoder`] and [`EliasFanoDecoder`]
//!   - Compressed non-decreasing sequence with a sparse skip index and a bidirectional cursor.
//!
//! ## Errors
//!
//! Every fallible operation returns [`anyhow::Result`].
//! Errors raised by this crate wrap an [`Error`]; errors of the underlying byte streams
//! wrap a [`std::io::Error`].
//!
//! ## Limitation
//!
//! This library is designed to run on 64-bit machines.
#![deny(missing_docs)]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("`target_pointer_width` must be 64");

pub mod bit_vector;
pub mod block_stream;
pub mod broadword;
pub mod data_io;
pub mod elias_fano;
pub mod error;
pub mod packed;
pub mod serial;
pub mod utils;

pub use bit_vector::BitVector;
pub use block_stream::BlockPackedReader;
pub use block_stream::BlockPackedWriter;
pub use elias_fano::EliasFanoDecoder;
pub use elias_fano::EliasFanoEncoder;
pub use error::Error;
pub use serial::Serializable;
