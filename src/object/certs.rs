// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

use crate::attribute::Attribute;
use crate::codec::copy_bytes;
use crate::error::{Error, Result};
use crate::kasn1::x509::CertificateFields;
use crate::misc::{md5_digest, sha1_digest};
use crate::pkcs11::*;

use super::key::KeyParameters;

/// An X.509 certificate, and optionally the private key it was found
/// with
///
/// The same structure backs both the CKO_CERTIFICATE object and the
/// CKO_PRIVATE_KEY object of a certificate/key pair, each with its own
/// copy of the data.
#[derive(Debug)]
pub struct CertObject {
    der: Vec<u8>,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    serial: Vec<u8>,
    public_key_info: Vec<u8>,
    sha1: Vec<u8>,
    md5: Vec<u8>,
    key: Option<KeyParameters>,
}

impl CertObject {
    /// Parses the certificate fields out of its DER encoding
    pub fn new(der: &[u8]) -> Result<CertObject> {
        let fields = CertificateFields::parse(der)?;
        Ok(CertObject {
            der: copy_bytes(der)?,
            subject: copy_bytes(fields.subject)?,
            issuer: copy_bytes(fields.issuer)?,
            serial: copy_bytes(fields.serial_number)?,
            public_key_info: copy_bytes(fields.subject_public_key_info)?,
            sha1: sha1_digest(der),
            md5: md5_digest(der),
            key: None,
        })
    }

    /// Attaches the private key found with the certificate
    pub fn set_key(&mut self, key: KeyParameters) {
        self.key = Some(key);
    }

    pub fn get_der(&self) -> &[u8] {
        &self.der
    }

    pub fn get_subject(&self) -> &[u8] {
        &self.subject
    }

    pub fn get_public_key_info(&self) -> &[u8] {
        &self.public_key_info
    }

    pub fn get_key(&self) -> Option<&KeyParameters> {
        self.key.as_ref()
    }

    pub fn get_attribute(
        &self,
        class: CK_OBJECT_CLASS,
        t: CK_ATTRIBUTE_TYPE,
    ) -> Result<Attribute> {
        if class == CKO_PRIVATE_KEY {
            return match &self.key {
                Some(k) => k.get_attribute(t, Some(&self.subject)),
                None => Err(Error::not_found(format!("{:#x}", t))),
            };
        }
        let bytes = |v: &Vec<u8>| -> Result<Attribute> {
            Ok(Attribute::from_bytes(t, v.clone()))
        };
        match t {
            CKA_CERTIFICATE_TYPE => Ok(Attribute::from_ulong(t, CKC_X_509)),
            CKA_SUBJECT => bytes(&self.subject),
            CKA_ISSUER => bytes(&self.issuer),
            CKA_SERIAL_NUMBER => bytes(&self.serial),
            CKA_VALUE => bytes(&self.der),
            CKA_PUBLIC_KEY_INFO => bytes(&self.public_key_info),
            CKA_CERT_SHA1_HASH => bytes(&self.sha1),
            CKA_CERT_MD5_HASH => bytes(&self.md5),
            _ => Err(Error::not_found(format!("{:#x}", t))),
        }
    }
}

/// NSS trust settings for a CA certificate
#[derive(Debug, Clone)]
pub struct TrustObject {
    sha1: Vec<u8>,
    md5: Vec<u8>,
    issuer: Vec<u8>,
    serial: Vec<u8>,
}

impl TrustObject {
    pub fn new(cert: &CertObject) -> TrustObject {
        TrustObject {
            sha1: cert.sha1.clone(),
            md5: cert.md5.clone(),
            issuer: cert.issuer.clone(),
            serial: cert.serial.clone(),
        }
    }

    /// The certificate digest the trust object is identified by
    pub fn get_sha1(&self) -> &[u8] {
        &self.sha1
    }

    pub fn get_attribute(&self, t: CK_ATTRIBUTE_TYPE) -> Result<Attribute> {
        let bytes = |v: &Vec<u8>| -> Result<Attribute> {
            Ok(Attribute::from_bytes(t, v.clone()))
        };
        match t {
            CKA_CERT_SHA1_HASH => bytes(&self.sha1),
            CKA_CERT_MD5_HASH => bytes(&self.md5),
            CKA_ISSUER => bytes(&self.issuer),
            CKA_SERIAL_NUMBER => bytes(&self.serial),
            CKA_TRUST_SERVER_AUTH
            | CKA_TRUST_CLIENT_AUTH
            | CKA_TRUST_EMAIL_PROTECTION
            | CKA_TRUST_CODE_SIGNING => {
                Ok(Attribute::from_ulong(t, CKT_NSS_TRUSTED_DELEGATOR))
            }
            CKA_TRUST_STEP_UP_APPROVED => Ok(Attribute::from_bool(t, false)),
            _ => Err(Error::not_found(format!("{:#x}", t))),
        }
    }
}
