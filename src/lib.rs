// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! This is pemstore
//!
//! An object store exposing certificates and RSA private keys found in
//! PEM/DER files with Cryptoki semantics. Objects are looked up by
//! attribute template in the [registry::Registry] and private key
//! operations are run through a [session::CryptoSession].

pub mod pkcs11;

pub mod attribute;
pub mod config;
pub mod error;
pub mod loader;
pub mod log;
pub mod mechanism;
pub mod object;
pub mod registry;
pub mod rsa;
pub mod session;

/* Helper code */
pub mod codec;
pub mod kasn1;
pub mod misc;

pub use error::{Error, ErrorKind, Result};
pub use registry::Registry;
pub use session::CryptoSession;

#[cfg(test)]
mod tests;
