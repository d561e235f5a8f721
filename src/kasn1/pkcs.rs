// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! This module provides the [asn1] objects defined by the
//! [PKCS](https://en.wikipedia.org/wiki/PKCS) standards that carry RSA
//! keys: PKCS#1 `RSAPrivateKey`/`RSAPublicKey` and the PKCS#8
//! `PrivateKeyInfo` wrapper.

use crate::error::{ErrorKind, Result};
use crate::kasn1::{oid, DerEncBigUint, UnsignedInteger, Version};

use asn1;

/// DER of the NULL parameters that follow rsaEncryption
const NULL_DER: &[u8] = &[0x05, 0x00];

/// Identifies an algorithm by OID, parameters are kept undecoded
#[derive(asn1::Asn1Read, asn1::Asn1Write, Clone, Debug, PartialEq, Eq)]
pub struct AlgorithmIdentifier<'a> {
    pub oid: asn1::ObjectIdentifier,
    pub params: Option<asn1::Tlv<'a>>,
}

impl AlgorithmIdentifier<'_> {
    /// The rsaEncryption identifier with NULL parameters
    pub fn rsa() -> Result<AlgorithmIdentifier<'static>> {
        let null = asn1::parse_single::<asn1::Tlv<'static>>(NULL_DER)?;
        Ok(AlgorithmIdentifier {
            oid: oid::RSA_OID,
            params: Some(null),
        })
    }

    pub fn is_rsa(&self) -> bool {
        self.oid == oid::RSA_OID
    }
}

/// Defined in [RFC 5958](https://www.rfc-editor.org/rfc/rfc5958)
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct PrivateKeyInfo<'a> {
    version: Version,
    algorithm: AlgorithmIdentifier<'a>,
    private_key: &'a [u8],
    #[implicit(0)]
    attributes: Option<asn1::SetOf<'a, asn1::Tlv<'a>>>,
    #[implicit(1)]
    public_key: Option<asn1::BitString<'a>>,
}

impl<'a> PrivateKeyInfo<'a> {
    /// Wraps an encoded private key identified by the algorithm
    pub fn new(
        private_key_asn1: &'a [u8],
        algorithm: AlgorithmIdentifier<'a>,
    ) -> PrivateKeyInfo<'a> {
        PrivateKeyInfo {
            version: 0,
            algorithm: algorithm,
            private_key: private_key_asn1,
            attributes: None,
            public_key: None,
        }
    }

    /// Returns the key type (as an OID)
    pub fn get_algorithm(&self) -> &AlgorithmIdentifier<'a> {
        &self.algorithm
    }

    /// Returns a reference to the encoded private key
    pub fn get_private_key(&self) -> &'a [u8] {
        self.private_key
    }
}

/// Defined in [RFC 8017](https://www.rfc-editor.org/rfc/rfc8017)
///
/// Only two prime keys are supported, a trailing otherPrimeInfos
/// sequence makes the parse fail.
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct RsaPrivateKeyAsn1<'a> {
    pub version: Version,
    pub modulus: UnsignedInteger<'a>,
    pub public_exponent: UnsignedInteger<'a>,
    pub private_exponent: UnsignedInteger<'a>,
    pub prime1: UnsignedInteger<'a>,
    pub prime2: UnsignedInteger<'a>,
    pub exponent1: UnsignedInteger<'a>,
    pub exponent2: UnsignedInteger<'a>,
    pub coefficient: UnsignedInteger<'a>,
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct RsaPublicKey<'a> {
    modulus: DerEncBigUint<'a>,
    public_exponent: DerEncBigUint<'a>,
}

impl RsaPublicKey<'_> {
    /// Constructs an `RsaPublicKey` ASN.1 structure from byte slices of
    /// its components.
    pub fn new<'a>(
        modulus: &'a [u8],
        public_exponent: &'a [u8],
    ) -> Result<RsaPublicKey<'a>> {
        Ok(RsaPublicKey {
            modulus: DerEncBigUint::new(modulus)?,
            public_exponent: DerEncBigUint::new(public_exponent)?,
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        match asn1::write_single(self) {
            Ok(der) => Ok(der),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct SubjectPublicKeyInfo<'a> {
    algorithm: AlgorithmIdentifier<'a>,
    subject_public_key: asn1::BitString<'a>,
}

impl SubjectPublicKeyInfo<'_> {
    pub fn new<'a>(
        alg: AlgorithmIdentifier<'a>,
        pubkey: &'a [u8],
    ) -> Result<SubjectPublicKeyInfo<'a>> {
        Ok(SubjectPublicKeyInfo {
            algorithm: alg,
            subject_public_key: asn1::BitString::new(pubkey, 0)
                .ok_or(ErrorKind::GeneralError)?,
        })
    }

    // DER-encode SubjectPublicKeyInfo.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        match asn1::write_single(self) {
            Ok(der) => Ok(der),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }
}

/// Builds the DER SubjectPublicKeyInfo of an RSA public key
pub fn rsa_public_key_info(
    modulus: &[u8],
    exponent: &[u8],
) -> Result<Vec<u8>> {
    let pubkey = RsaPublicKey::new(modulus, exponent)?.serialize()?;
    SubjectPublicKeyInfo::new(AlgorithmIdentifier::rsa()?, &pubkey)?
        .serialize()
}
