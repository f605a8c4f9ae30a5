//! The packed prelude.
//!
//! The purpose of this module is to alleviate imports of many common traits
//! of the packed arrays.
//!
//! ```
//! # #![allow(unused_imports)]
//! use packints::packed::prelude::*;
//! ```
pub use crate::packed::Access;
pub use crate::packed::NumVals;
pub use crate::packed::RamBytesUsed;
pub use crate::packed::Update;
