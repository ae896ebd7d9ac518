// RSA Decryption Implementation
// Textbook decoding of an integer ciphertext: m = c^d mod n

use super::bigint::{mod_pow, to_u64, RsaBigInt};
use super::error::{RsaError, RsaResult};
use super::keygen::{RsaPrivateKey, RsaPublicKey};

/// Decode the ciphertext `c` with the private key; `n` comes from the public key.
/// Requires c in [0, n) and a private key whose p*q equals n.
pub fn decode(
    public_key: &RsaPublicKey,
    private_key: &RsaPrivateKey,
    c: &RsaBigInt,
) -> RsaResult<RsaBigInt> {
    let n = public_key.n();
    if &private_key.modulus() != n {
        return Err(RsaError::invalid(format!(
            "private key factors {} * {} do not match modulus n = {}",
            private_key.p(),
            private_key.q(),
            n
        )));
    }
    if c >= n {
        return Err(RsaError::invalid(format!(
            "ciphertext c = {} is outside [0, {})",
            c, n
        )));
    }

    // Compute m = c^d mod n
    Ok(mod_pow(c, private_key.d(), n))
}

/// Decode ciphertext to u64
pub fn decode_to_u64(
    public_key: &RsaPublicKey,
    private_key: &RsaPrivateKey,
    c: &RsaBigInt,
) -> RsaResult<u64> {
    let m = decode(public_key, private_key, c)?;
    to_u64(&m)
}
