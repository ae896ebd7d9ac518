// RSA Module - Main module file
// Exports number theory, key generation and the integer cipher

pub mod bigint;
pub mod error;
pub mod keygen;
pub mod encrypt;
pub mod decrypt;

pub use bigint::RsaBigInt;
pub use error::{RsaError, RsaResult};
pub use keygen::{generate_keypair, private_key, public_key, RsaKeyPair, RsaPublicKey, RsaPrivateKey};
pub use encrypt::{encode, encode_u64};
pub use decrypt::{decode, decode_to_u64};
