// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

//! RSA private key codec
//!
//! Decodes a DER buffer holding either a PKCS#8 `PrivateKeyInfo` or a bare
//! PKCS#1 `RSAPrivateKey` into an [RsaPrivateKey]. Decoding is stateless,
//! the same input always yields the same value.

use std::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::kasn1::pkcs::{
    rsa_public_key_info, AlgorithmIdentifier, PrivateKeyInfo,
    RsaPrivateKeyAsn1,
};
use crate::kasn1::UnsignedInteger;

use log::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Copies a buffer reporting allocation failures as errors
pub fn copy_bytes(src: &[u8]) -> Result<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(src.len())?;
    v.extend_from_slice(src);
    Ok(v)
}

/// The numeric fields of a two prime RSA private key
///
/// Each field holds the big endian content octets of the DER INTEGER,
/// including the leading zero octet when the encoder emitted one.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RsaPrivateKey {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
    pub private_exponent: Vec<u8>,
    pub prime1: Vec<u8>,
    pub prime2: Vec<u8>,
    pub exponent1: Vec<u8>,
    pub exponent2: Vec<u8>,
    pub coefficient: Vec<u8>,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("modulus", &hex::encode(&self.modulus))
            .field("public_exponent", &hex::encode(&self.public_exponent))
            .finish_non_exhaustive()
    }
}

fn uint(data: &[u8]) -> Result<UnsignedInteger<'_>> {
    match UnsignedInteger::new(data) {
        Some(u) => Ok(u),
        None => Err(ErrorKind::GeneralError)?,
    }
}

impl RsaPrivateKey {
    fn from_asn1(key: &RsaPrivateKeyAsn1) -> Result<RsaPrivateKey> {
        Ok(RsaPrivateKey {
            modulus: copy_bytes(key.modulus.as_bytes())?,
            public_exponent: copy_bytes(key.public_exponent.as_bytes())?,
            private_exponent: copy_bytes(key.private_exponent.as_bytes())?,
            prime1: copy_bytes(key.prime1.as_bytes())?,
            prime2: copy_bytes(key.prime2.as_bytes())?,
            exponent1: copy_bytes(key.exponent1.as_bytes())?,
            exponent2: copy_bytes(key.exponent2.as_bytes())?,
            coefficient: copy_bytes(key.coefficient.as_bytes())?,
        })
    }

    /// Size in bytes of the key, the modulus length not counting a
    /// leading zero octet
    pub fn private_modulus_len(&self) -> usize {
        private_modulus_len(&self.modulus)
    }

    /// Re-encodes the key as a PKCS#1 `RSAPrivateKey`
    pub fn to_pkcs1_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let asn1key = RsaPrivateKeyAsn1 {
            version: 0,
            modulus: uint(&self.modulus)?,
            public_exponent: uint(&self.public_exponent)?,
            private_exponent: uint(&self.private_exponent)?,
            prime1: uint(&self.prime1)?,
            prime2: uint(&self.prime2)?,
            exponent1: uint(&self.exponent1)?,
            exponent2: uint(&self.exponent2)?,
            coefficient: uint(&self.coefficient)?,
        };
        match asn1::write_single(&asn1key) {
            Ok(der) => Ok(Zeroizing::new(der)),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    /// Re-encodes the key wrapped in a PKCS#8 `PrivateKeyInfo`
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let pkcs1 = self.to_pkcs1_der()?;
        let pki = PrivateKeyInfo::new(&pkcs1, AlgorithmIdentifier::rsa()?);
        match asn1::write_single(&pki) {
            Ok(der) => Ok(Zeroizing::new(der)),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    /// DER SubjectPublicKeyInfo for the public half of the key
    pub fn public_key_info(&self) -> Result<Vec<u8>> {
        rsa_public_key_info(&self.modulus, &self.public_exponent)
    }
}

/// Modulus length in bytes, minus one when the first octet is the zero
/// padding emitted for unsigned values
pub fn private_modulus_len(modulus: &[u8]) -> usize {
    match modulus.first() {
        Some(0) => modulus.len() - 1,
        _ => modulus.len(),
    }
}

/// Selects the PKCS#1 bytes: the payload of a PKCS#8 wrapper when the
/// buffer parses as one, the whole buffer otherwise
fn pkcs1_payload(der: &[u8]) -> Result<&[u8]> {
    match asn1::parse_single::<PrivateKeyInfo>(der) {
        Ok(pki) => {
            let alg = pki.get_algorithm();
            if !alg.is_rsa() {
                debug!("PKCS#8 key with unsupported algorithm {}", alg.oid);
                return Err(Error::with_errmsg(
                    ErrorKind::UnsupportedAlgorithm,
                    alg.oid.to_string(),
                ));
            }
            Ok(pki.get_private_key())
        }
        Err(_) => Ok(der),
    }
}

/// Decodes an RSA private key from PKCS#8 or PKCS#1 DER
pub fn decode_rsa_private_key(der: &[u8]) -> Result<RsaPrivateKey> {
    let pkcs1 = pkcs1_payload(der)?;
    let asn1key = match asn1::parse_single::<RsaPrivateKeyAsn1>(pkcs1) {
        Ok(k) => k,
        Err(e) => {
            debug!("Failed to parse RSAPrivateKey: {}", e);
            return Err(e)?;
        }
    };
    if asn1key.version != 0 {
        return Err(Error::with_errmsg(
            ErrorKind::BadEncoding,
            format!("unsupported RSAPrivateKey version {}", asn1key.version),
        ));
    }
    RsaPrivateKey::from_asn1(&asn1key)
}
