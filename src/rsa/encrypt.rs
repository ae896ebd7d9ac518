// RSA Encryption Implementation
// Textbook encoding of an integer message: c = m^e mod n

use num_traits::Zero;

use super::bigint::{from_u64, mod_pow, RsaBigInt};
use super::error::{RsaError, RsaResult};
use super::keygen::RsaPublicKey;

/// Encode the message `m` with the public key. Requires 0 < m < n.
pub fn encode(public_key: &RsaPublicKey, m: &RsaBigInt) -> RsaResult<RsaBigInt> {
    let n = public_key.n();
    if m.is_zero() || m >= n {
        return Err(RsaError::invalid(format!(
            "message m = {} is outside [1, {})",
            m, n
        )));
    }

    // Compute c = m^e mod n
    Ok(mod_pow(m, public_key.e(), n))
}

/// Encode a u64 message using RSA public key
pub fn encode_u64(public_key: &RsaPublicKey, m: u64) -> RsaResult<RsaBigInt> {
    encode(public_key, &from_u64(m))
}
