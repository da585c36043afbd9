//! Access token payload decoding.
//!
//! Tokens are decoded without signature verification. The decoded role is a
//! display hint for routing; the backend re-checks every request.

pub mod claims;
pub mod decoder;

pub use claims::TokenClaims;
pub use decoder::decode_unverified;
