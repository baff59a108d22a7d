//! # palaver-shared
//!
//! Types and crypto primitives shared between the Palaver store and server
//! crates: channel/role vocabulary, the error taxonomy used across the
//! workspace, and the symmetric cipher used for private-channel payloads.

pub mod constants;
pub mod crypto;
pub mod types;

mod error;

pub use error::CryptoError;
pub use types::*;
