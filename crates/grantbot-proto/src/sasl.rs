//! SASL PLAIN (RFC 4616) payload encoding for `AUTHENTICATE`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// `AUTHENTICATE` payloads are sent in chunks of at most this many bytes.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Encode `authzid NUL authcid NUL password` with an empty authzid.
pub fn encode_plain(username: &str, password: &str) -> String {
    let payload = format!("\0{}\0{}", username, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded payload into `AUTHENTICATE` arguments.
///
/// A payload that is an exact multiple of the chunk size (including empty)
/// is terminated with a lone `+`.
pub fn chunk_response(encoded: &str) -> Vec<String> {
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();

    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_string());
    }
    chunks
}
