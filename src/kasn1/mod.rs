// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module provides helpers to (de)serialize the key and certificate
//! structures found in PEM/DER files using Abstract Syntax Notation One
//! (ASN.1) abstractions with DER (Distinguished Encoding Rules) encoding.

use std::borrow::Cow;

use crate::error::{ErrorKind, Result};

use asn1;
use zeroize::Zeroize;

/* Helper routines to use with rust/asn1 */

/// Wrapper object to properly handle DER Encoded
/// Big Unsigned Integers
pub struct DerEncBigUint<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> DerEncBigUint<'a> {
    /// Creates a DER Encoded Big Uint from a byte buffer
    ///
    /// When the higher order bit is set a new copy of the buffer is
    /// allocated with a 0 byte prepended, as in ASN.1 the leading bit is
    /// the sign bit. Redundant leading zeroes are skipped otherwise.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ErrorKind::GeneralError)?;
        }
        let de = if data[0] & 0x80 == 0x80 {
            let mut v = Vec::with_capacity(data.len() + 1);
            v.push(0);
            v.extend_from_slice(data);
            DerEncBigUint {
                data: Cow::Owned(v),
            }
        } else {
            let mut skip = 0;
            while data[skip] == 0
                && skip + 1 < data.len()
                && data[skip + 1] & 0x80 == 0
            {
                skip += 1;
            }
            DerEncBigUint {
                data: Cow::from(&data[skip..]),
            }
        };
        /* check it works */
        match asn1::BigUint::new(&de.data) {
            Some(_) => Ok(de),
            None => Err(ErrorKind::GeneralError)?,
        }
    }

    /// Returns a reference to the internal byte buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for DerEncBigUint<'_> {
    fn drop(&mut self) {
        if let Cow::Owned(_) = &self.data {
            self.data.to_mut().zeroize();
        }
    }
}

impl<'a> asn1::SimpleAsn1Readable<'a> for DerEncBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn parse_data(data: &'a [u8]) -> asn1::ParseResult<Self> {
        match DerEncBigUint::new(data) {
            Ok(x) => Ok(x),
            Err(_) => {
                Err(asn1::ParseError::new(asn1::ParseErrorKind::InvalidValue))
            }
        }
    }
}

impl<'a> asn1::SimpleAsn1Writable for DerEncBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn write_data(&self, dest: &mut asn1::WriteBuf) -> asn1::WriteResult {
        dest.push_slice(self.as_bytes())
    }
}

/// An INTEGER read as a non negative value
///
/// RSA parameters are unsigned by definition, the content octets are kept
/// verbatim (a leading zero octet included) and the sign bit is ignored,
/// so keys produced by encoders that omit the padding octet still load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsignedInteger<'a> {
    data: &'a [u8],
}

impl<'a> UnsignedInteger<'a> {
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        Some(UnsignedInteger { data: data })
    }

    /// The content octets as found in the encoding
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }
}

impl<'a> asn1::SimpleAsn1Readable<'a> for UnsignedInteger<'a> {
    const TAG: asn1::Tag = asn1::Tag::primitive(0x02);
    fn parse_data(data: &'a [u8]) -> asn1::ParseResult<Self> {
        match UnsignedInteger::new(data) {
            Some(x) => Ok(x),
            None => {
                Err(asn1::ParseError::new(asn1::ParseErrorKind::InvalidValue))
            }
        }
    }
}

impl<'a> asn1::SimpleAsn1Writable for UnsignedInteger<'a> {
    const TAG: asn1::Tag = asn1::Tag::primitive(0x02);
    fn write_data(&self, dest: &mut asn1::WriteBuf) -> asn1::WriteResult {
        dest.push_slice(self.data)
    }
}

/// This type is used in PrivateKeyInfo and RSAPrivateKey
type Version = u64;

pub mod oid;
pub mod pkcs;
pub mod x509;
