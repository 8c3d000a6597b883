//! HMAC-SHA256 request signing, as used by Binance signed (SAPI) endpoints.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature of a canonical query string.
///
/// The key is the raw UTF-8 bytes of the secret key, and the result is the
/// lowercase hex encoding of the 32 byte mac.
pub fn sign(canonical_query: &str, secret_key: &str) -> Result<String> {
    if secret_key.is_empty() {
        return Err(Error::MissingCredentials);
    }
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).expect("Hmac should work with any key length");
    mac.update(canonical_query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
