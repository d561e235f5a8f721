// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

//! Minimal X.509 reader, defined in
//! [RFC 5280](https://www.rfc-editor.org/rfc/rfc5280)
//!
//! Only the fields a token exposes as attributes are retained, each as
//! its complete DER encoding.

use crate::error::Result;

use asn1;

#[derive(asn1::Asn1Read)]
struct Certificate<'a> {
    tbs_certificate: TbsCertificate<'a>,
    _signature_algorithm: asn1::Tlv<'a>,
    _signature_value: asn1::BitString<'a>,
}

#[derive(asn1::Asn1Read)]
struct TbsCertificate<'a> {
    #[explicit(0)]
    _version: Option<u64>,
    serial_number: asn1::Tlv<'a>,
    _signature: asn1::Tlv<'a>,
    issuer: asn1::Tlv<'a>,
    _validity: asn1::Tlv<'a>,
    subject: asn1::Tlv<'a>,
    subject_public_key_info: asn1::Tlv<'a>,
    #[implicit(1)]
    _issuer_unique_id: Option<asn1::BitString<'a>>,
    #[implicit(2)]
    _subject_unique_id: Option<asn1::BitString<'a>>,
    #[explicit(3)]
    _extensions: Option<asn1::Sequence<'a>>,
}

/// The DER fields of a certificate, borrowed from its encoding
#[derive(Debug)]
pub struct CertificateFields<'a> {
    pub serial_number: &'a [u8],
    pub issuer: &'a [u8],
    pub subject: &'a [u8],
    pub subject_public_key_info: &'a [u8],
}

impl CertificateFields<'_> {
    pub fn parse(der: &[u8]) -> Result<CertificateFields<'_>> {
        let cert = asn1::parse_single::<Certificate>(der)?;
        let tbs = cert.tbs_certificate;
        Ok(CertificateFields {
            serial_number: tbs.serial_number.full_data(),
            issuer: tbs.issuer.full_data(),
            subject: tbs.subject.full_data(),
            subject_public_key_info: tbs.subject_public_key_info.full_data(),
        })
    }
}
