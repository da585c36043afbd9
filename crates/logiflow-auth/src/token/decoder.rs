//! Unverified decoding of the JWT payload segment.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::claims::TokenClaims;

/// URL-safe engine that accepts the payload with or without `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the claims of a compact JWT without checking its signature.
///
/// Returns `None` for anything that is not three dot-separated segments
/// with a base64url JSON object in the middle.
pub fn decode_unverified(token: &str) -> Option<TokenClaims> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = PAYLOAD_ENGINE.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
pub(crate) fn encode_for_test(claims: &serde_json::Value) -> String {
    let header = PAYLOAD_ENGINE.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = PAYLOAD_ENGINE.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
