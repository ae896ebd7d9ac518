// RSA Key Generation
// Derives the public and private keys from two caller-supplied primes

use num_traits::One;
use tracing::debug;

use super::bigint::{are_coprime, mod_inverse, totient, RsaBigInt};
use super::error::{RsaError, RsaResult};

/// RSA Public Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: RsaBigInt, // Modulus
    e: RsaBigInt, // Public exponent
}

/// RSA Private Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    p: RsaBigInt, // First prime factor
    q: RsaBigInt, // Second prime factor
    d: RsaBigInt, // Private exponent
}

/// RSA Key Pair (both public and private keys)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
}

impl RsaPublicKey {
    /// Build a public key from stored values. Requires 1 < e < n.
    pub fn new(n: RsaBigInt, e: RsaBigInt) -> RsaResult<Self> {
        if e <= RsaBigInt::one() || e >= n {
            return Err(RsaError::invalid(format!(
                "public exponent e = {} must satisfy 1 < e < n = {}",
                e, n
            )));
        }
        Ok(Self { n, e })
    }

    pub fn n(&self) -> &RsaBigInt {
        &self.n
    }

    pub fn e(&self) -> &RsaBigInt {
        &self.e
    }

    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }
}

impl RsaPrivateKey {
    /// Build a private key from stored values. Requires p, q distinct primes
    /// and 1 <= d < φ.
    pub fn new(p: RsaBigInt, q: RsaBigInt, d: RsaBigInt) -> RsaResult<Self> {
        let phi = totient(&(&p * &q), &p, &q)?;
        if d < RsaBigInt::one() || d >= phi {
            return Err(RsaError::invalid(format!(
                "private exponent d = {} must satisfy 1 <= d < φ(n) = {}",
                d, phi
            )));
        }
        Ok(Self { p, q, d })
    }

    pub fn p(&self) -> &RsaBigInt {
        &self.p
    }

    pub fn q(&self) -> &RsaBigInt {
        &self.q
    }

    pub fn d(&self) -> &RsaBigInt {
        &self.d
    }

    /// Modulus implied by the prime factors
    pub fn modulus(&self) -> RsaBigInt {
        &self.p * &self.q
    }
}

impl RsaKeyPair {
    /// Pair up separately stored keys, checking they belong together:
    /// n = p*q and e*d ≡ 1 (mod φ(n))
    pub fn from_parts(public_key: RsaPublicKey, private_key: RsaPrivateKey) -> RsaResult<Self> {
        let phi = totient(&public_key.n, &private_key.p, &private_key.q)?;

        if !are_coprime(&public_key.e, &phi) {
            return Err(RsaError::invalid(format!(
                "e = {} is not coprime with φ(n) = {}",
                public_key.e, phi
            )));
        }
        if (&public_key.e * &private_key.d) % &phi != RsaBigInt::one() {
            return Err(RsaError::invalid(format!(
                "e * d = {} * {} is not 1 mod φ(n) = {}",
                public_key.e, private_key.d, phi
            )));
        }

        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Get the bit length of the key
    pub fn bit_length(&self) -> u64 {
        self.public_key.bit_length()
    }
}

/// Derive the public key (n, e) from primes p and q.
///
/// e is the smallest value >= 2 coprime with φ(n); the scan stops at φ(n)
/// and reports `NoValidExponent` instead of running on.
pub fn public_key(p: &RsaBigInt, q: &RsaBigInt) -> RsaResult<RsaPublicKey> {
    let n = p * q;
    let phi = totient(&n, p, q)?;
    debug!(%n, %phi, "derived modulus and totient");

    let mut e = RsaBigInt::from(2u8);
    while e < phi {
        if are_coprime(&e, &phi) {
            debug!(%e, "selected public exponent");
            return Ok(RsaPublicKey { n, e });
        }
        e += 1u8;
    }

    Err(RsaError::NoValidExponent { phi })
}

/// Derive the private key (p, q, d) matching `public_key`.
///
/// d is the unique value in [1, φ) with e*d mod φ == 1, i.e. the smallest
/// (1 + k*φ) / e that divides exactly, found with the extended Euclidean
/// algorithm.
pub fn private_key(
    p: &RsaBigInt,
    q: &RsaBigInt,
    public_key: &RsaPublicKey,
) -> RsaResult<RsaPrivateKey> {
    let phi = totient(&public_key.n, p, q)?;
    let d = mod_inverse(&public_key.e, &phi).ok_or_else(|| {
        RsaError::invalid(format!(
            "e = {} has no inverse modulo φ(n) = {}",
            public_key.e, phi
        ))
    })?;
    debug!(%d, "derived private exponent");

    Ok(RsaPrivateKey {
        p: p.clone(),
        q: q.clone(),
        d,
    })
}

/// Generate both keys from the primes p and q
pub fn generate_keypair(p: &RsaBigInt, q: &RsaBigInt) -> RsaResult<RsaKeyPair> {
    let public_key = public_key(p, q)?;
    let private_key = private_key(p, q, &public_key)?;

    Ok(RsaKeyPair {
        public_key,
        private_key,
    })
}
