// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

use super::*;
use crate::codec::{decode_rsa_private_key, private_modulus_len};

use serial_test::parallel;

#[test]
#[parallel]
fn test_decode_pkcs1_and_pkcs8() {
    let pkcs1 = ret_or_panic!(decode_rsa_private_key(RSA1024_DER));
    let pkcs8 = ret_or_panic!(decode_rsa_private_key(RSA1024_P8_DER));
    assert_eq!(pkcs1, pkcs8);

    assert_eq!(hex::encode(&pkcs1.modulus[..5]), "00e3b1906c");
    assert_eq!(pkcs1.public_exponent, vec![0x01, 0x00, 0x01]);
    assert_eq!(pkcs1.modulus.len(), 129);
    assert_eq!(pkcs1.private_modulus_len(), 128);
}

#[test]
#[parallel]
fn test_reencode() {
    let key = ret_or_panic!(decode_rsa_private_key(RSA1024_DER));
    let pkcs1 = ret_or_panic!(key.to_pkcs1_der());
    assert_eq!(pkcs1.as_slice(), RSA1024_DER);
    let pkcs8 = ret_or_panic!(key.to_pkcs8_der());
    assert_eq!(pkcs8.as_slice(), RSA1024_P8_DER);
}

#[test]
#[parallel]
fn test_decode_is_stateless() {
    let a = ret_or_panic!(decode_rsa_private_key(RSA1024_P8_DER));
    let b = ret_or_panic!(decode_rsa_private_key(RSA1024_P8_DER));
    assert_eq!(a, b);
}

#[test]
#[parallel]
fn test_decode_errors() {
    assert_err_kind!(
        decode_rsa_private_key(EC_P256_P8_DER),
        ErrorKind::UnsupportedAlgorithm
    );
    assert_err_kind!(
        decode_rsa_private_key(&RSA1024_DER[..4]),
        ErrorKind::BadEncoding
    );
    assert_err_kind!(
        decode_rsa_private_key(&RSA1024_P8_DER[..RSA1024_P8_DER.len() - 1]),
        ErrorKind::BadEncoding
    );
    assert_err_kind!(decode_rsa_private_key(&[]), ErrorKind::BadEncoding);
    /* a certificate is valid DER but not a key */
    assert_err_kind!(decode_rsa_private_key(CERT_DER), ErrorKind::BadEncoding);

    /* version 1 is the multi prime form */
    let mut der = RSA1024_DER.to_vec();
    assert_eq!(&der[4..7], &[0x02, 0x01, 0x00]);
    der[6] = 0x01;
    assert_err_kind!(decode_rsa_private_key(&der), ErrorKind::BadEncoding);
}

#[test]
#[parallel]
fn test_private_modulus_len() {
    assert_eq!(private_modulus_len(&[0x00, 0x80, 0x01]), 2);
    assert_eq!(private_modulus_len(&[0x7f, 0x01]), 2);
    assert_eq!(private_modulus_len(&[0x00]), 0);
    assert_eq!(private_modulus_len(&[]), 0);
}

#[test]
#[parallel]
fn test_debug_hides_secrets() {
    let key = ret_or_panic!(decode_rsa_private_key(RSA1024_DER));
    let out = format!("{:?}", key);
    assert!(out.contains(&hex::encode(&key.modulus)));
    assert!(!out.contains(&hex::encode(&key.private_exponent)));
    assert!(!out.contains(&hex::encode(&key.prime1)));
}

#[test]
#[parallel]
fn test_public_key_info_matches_certificate() {
    let key = ret_or_panic!(decode_rsa_private_key(RSA1024_DER));
    let spki = ret_or_panic!(key.public_key_info());
    let fields =
        ret_or_panic!(crate::kasn1::x509::CertificateFields::parse(CERT_DER));
    assert_eq!(spki.as_slice(), fields.subject_public_key_info);
    assert_eq!(hex::encode(fields.serial_number), CERT_SERIAL_DER);
}

#[test]
#[parallel]
fn test_error_rv() {
    let e = Error::new(ErrorKind::KeyTypeInconsistent);
    assert_eq!(e.rv(), CKR_KEY_TYPE_INCONSISTENT);
    let e = Error::not_found("x".to_string());
    assert!(e.attr_not_found());
    assert_eq!(e.rv(), CKR_ATTRIBUTE_TYPE_INVALID);
}
