// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

use std::collections::HashMap;

use crate::attribute::Attribute;
use crate::error::{Error, ErrorKind, Result};
use crate::loader::{
    CipherInfo, DerEntry, DerSupplier, KeyDecryptor, PemFileSupplier,
};
use crate::object::{NewObject, ObjectType};
use crate::pkcs11::*;
use crate::registry::Registry;

macro_rules! ret_or_panic {
    ($ret:expr) => {
        match $ret {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        }
    };
}

macro_rules! assert_err_kind {
    ($ret:expr, $kind:expr) => {
        match $ret {
            Ok(_) => panic!("expected error {:?}", $kind),
            Err(e) => assert_eq!(e.kind(), $kind),
        }
    };
}

mod codec;
mod registry;

pub const RSA1024_DER: &[u8] = include_bytes!("../../testdata/rsa1024.der");
pub const RSA1024_P8_DER: &[u8] =
    include_bytes!("../../testdata/rsa1024.p8.der");
pub const RSA1024_PEM: &[u8] = include_bytes!("../../testdata/rsa1024.pem");
pub const RSA1024_DES3_PEM: &[u8] =
    include_bytes!("../../testdata/rsa1024-des3.pem");
pub const EC_P256_P8_DER: &[u8] =
    include_bytes!("../../testdata/ec-p256.p8.der");
pub const CERT_DER: &[u8] = include_bytes!("../../testdata/cert.der");
pub const CERT_PEM: &[u8] = include_bytes!("../../testdata/cert.pem");
pub const CA_PEM: &[u8] = include_bytes!("../../testdata/ca.pem");
pub const CA_KEY_PEM: &[u8] = include_bytes!("../../testdata/ca-key.pem");
pub const BUNDLE_PEM: &[u8] = include_bytes!("../../testdata/bundle.pem");
/* a truncated certificate block followed by cert.pem and ca.pem */
pub const BUNDLE_BAD_PEM: &[u8] =
    include_bytes!("../../testdata/bundle-bad.pem");
/* a PKCS#8 EC key followed by rsa1024.pem */
pub const KEYS_MIXED_PEM: &[u8] =
    include_bytes!("../../testdata/keys-mixed.pem");
/* MD5 || SHA-1 of "abc" */
pub const MD5SHA1_ABC: &[u8] =
    include_bytes!("../../testdata/md5sha1-abc.bin");
pub const RSA1024_MD5SHA1_SIG: &[u8] =
    include_bytes!("../../testdata/rsa1024-md5sha1.sig");
pub const RSA1024_MSG_ENC: &[u8] =
    include_bytes!("../../testdata/rsa1024-msg.enc");
pub const MSG_PLAINTEXT: &[u8] = b"pem token secret";

pub const CERT_SERIAL_DER: &str = "02021234";
pub const CERT_SHA1: &str = "0194b3346b56448905a276f729bd6a7098065def";
pub const CERT_MD5: &str = "dc08cc971bc798691e57ce0d7616620e";

pub const TEST_SLOT: CK_SLOT_ID = 1;

/// Serves files from memory, parsed like regular files
pub struct MemSupplier {
    files: HashMap<&'static str, &'static [u8]>,
}

impl MemSupplier {
    pub fn new(files: &[(&'static str, &'static [u8])]) -> MemSupplier {
        MemSupplier {
            files: files.iter().cloned().collect(),
        }
    }
}

impl DerSupplier for MemSupplier {
    fn entries(&self, path: &str) -> Result<Vec<DerEntry>> {
        match self.files.get(path) {
            Some(data) => PemFileSupplier::parse(data),
            None => Err(Error::with_errmsg(ErrorKind::Io, path.to_string())),
        }
    }
}

/// Stands in for the PEM cipher, "decrypts" to the plaintext key when
/// the passphrase is right
pub struct FakeDecryptor {
    pub passphrase: &'static str,
    pub plaintext: &'static [u8],
}

impl KeyDecryptor for FakeDecryptor {
    fn decrypt(&self, _: &[u8], cipher: &CipherInfo) -> Result<Vec<u8>> {
        assert_eq!(cipher.algorithm, "DES-EDE3-CBC");
        if self.passphrase != "secret" {
            return Err(ErrorKind::GeneralError)?;
        }
        Ok(self.plaintext.to_vec())
    }
}

pub fn new_cert<'a>(der: &'a [u8], class: CK_OBJECT_CLASS) -> NewObject<'a> {
    NewObject {
        class: class,
        otype: ObjectType::Certificate,
        cert_der: Some(der),
        key_der: None,
        cipher: None,
        name: "cert.pem",
        id: "1",
        slot: TEST_SLOT,
    }
}

pub fn new_bare_key<'a>(der: &'a [u8]) -> NewObject<'a> {
    NewObject {
        class: CKO_PRIVATE_KEY,
        otype: ObjectType::BareKey,
        cert_der: None,
        key_der: Some(der),
        cipher: None,
        name: "rsa1024.der",
        id: "2",
        slot: TEST_SLOT,
    }
}

/// A registry holding the test certificate and the key paired with it
pub fn cert_and_key_registry(
) -> (Registry, CK_OBJECT_HANDLE, CK_OBJECT_HANDLE) {
    let registry = Registry::new();
    let new = new_cert(CERT_DER, CKO_CERTIFICATE);
    let (cert, _) = ret_or_panic!(registry.insert(new));
    let mut new = new_cert(CERT_DER, CKO_PRIVATE_KEY);
    new.key_der = Some(RSA1024_DER);
    let (key, _) = ret_or_panic!(registry.insert(new));
    (registry, cert, key)
}

pub fn ulong_attr(t: CK_ATTRIBUTE_TYPE, v: CK_ULONG) -> Attribute {
    Attribute::from_ulong(t, v)
}
