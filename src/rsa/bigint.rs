// RSA Big Integer Operations
// Number theory over num-bigint: primality, divisors, coprimality, totient, powers

use std::mem;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use super::error::{RsaError, RsaResult};

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Narrow a big integer to u64, failing with `ArithmeticOverflow` if it does not fit
pub fn to_u64(n: &RsaBigInt) -> RsaResult<u64> {
    n.to_u64().ok_or_else(|| RsaError::ArithmeticOverflow {
        value: n.clone(),
        target: "u64",
    })
}

/// Trial division primality test.
///
/// `x` is prime iff no `i` with `2 <= i < x` divides it. Cost is linear in `x`,
/// so this is only usable for small factors. 0 and 1 are not prime.
pub fn is_prime(x: &RsaBigInt) -> bool {
    let mut i = from_u64(2);
    if x < &i {
        return false;
    }

    while &i < x {
        if (x % &i).is_zero() {
            return false;
        }
        i += 1u8;
    }

    true
}

/// All positive divisors of `x` in ascending order, including 1 and `x`
pub fn divisors(x: &RsaBigInt) -> Vec<RsaBigInt> {
    let mut found = Vec::new();
    let mut i = RsaBigInt::one();

    while &i <= x {
        if (x % &i).is_zero() {
            found.push(i.clone());
        }
        i += 1u8;
    }

    found
}

/// Greatest common divisor
pub fn gcd(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    a.gcd(b)
}

/// Two integers are coprime when their greatest common divisor is 1.
/// Anything is coprime with 1.
pub fn are_coprime(a: &RsaBigInt, b: &RsaBigInt) -> bool {
    if a.is_one() || b.is_one() {
        return true;
    }
    gcd(a, b).is_one()
}

/// Both factors must be prime and distinct for φ(p*q) = (p-1)(q-1) to hold
pub(crate) fn ensure_distinct_primes(p: &RsaBigInt, q: &RsaBigInt) -> RsaResult<()> {
    if !is_prime(p) {
        return Err(RsaError::invalid(format!("p = {} is not prime", p)));
    }
    if !is_prime(q) {
        return Err(RsaError::invalid(format!("q = {} is not prime", q)));
    }
    if p == q {
        return Err(RsaError::invalid(format!("p and q must differ, both are {}", p)));
    }
    Ok(())
}

/// Euler's totient of n = p*q for distinct primes p and q: (p-1)(q-1)
pub fn totient(n: &RsaBigInt, p: &RsaBigInt, q: &RsaBigInt) -> RsaResult<RsaBigInt> {
    ensure_distinct_primes(p, q)?;

    let product = p * q;
    if &product != n {
        return Err(RsaError::invalid(format!(
            "p * q = {} * {} = {} does not equal n = {}",
            p, q, product, n
        )));
    }

    Ok((p - 1u8) * (q - 1u8))
}

/// Integer power by repeated multiplication: base^0 = 1, otherwise base * ... * base
/// (`exponent` times). Callers reduce mod n themselves.
pub fn power(base: &RsaBigInt, exponent: &RsaBigInt) -> RsaBigInt {
    let mut result = RsaBigInt::one();
    let mut remaining = exponent.clone();

    while !remaining.is_zero() {
        result *= base;
        remaining -= 1u8;
    }

    result
}

/// Modular exponentiation: base^exp mod modulus
/// Uses square-and-multiply algorithm
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }

    let mut result = RsaBigInt::one();
    let mut base = base % modulus;
    let mut exp = exp.clone();

    while !exp.is_zero() {
        if exp.is_odd() {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exp >>= 1;
    }

    result
}

/// Extended Euclidean Algorithm
/// Returns (gcd, x, y) such that a*x + b*y = gcd = gcd(a, b)
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quotient = &old_r / &r;

        let next_r = &old_r - &quotient * &r;
        old_r = mem::replace(&mut r, next_r);

        let next_x = &old_x - &quotient * &x;
        old_x = mem::replace(&mut x, next_x);

        let next_y = &old_y - &quotient * &y;
        old_y = mem::replace(&mut y, next_y);
    }

    (old_r, old_x, old_y)
}

/// Compute modular inverse: the unique d in [1, m) with a*d mod m == 1
/// Returns None if inverse doesn't exist
pub fn mod_inverse(a: &RsaBigInt, m: &RsaBigInt) -> Option<RsaBigInt> {
    if m <= &RsaBigInt::one() {
        return None;
    }

    let modulus = BigInt::from(m.clone());
    let (gcd, x, _) = extended_gcd(&BigInt::from(a.clone()), &modulus);

    if !gcd.is_one() {
        // Inverse doesn't exist
        return None;
    }

    x.mod_floor(&modulus).to_biguint()
}
