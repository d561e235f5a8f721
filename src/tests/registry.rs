// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

use super::*;
use crate::codec::decode_rsa_private_key;
use crate::loader::PemFileSupplier;
use crate::registry::SearchFilter;

use serial_test::parallel;

fn fetch_bytes(
    registry: &Registry,
    handle: CK_OBJECT_HANDLE,
    t: CK_ATTRIBUTE_TYPE,
) -> Vec<u8> {
    let attr = ret_or_panic!(registry.fetch_attribute(handle, t));
    attr.get_value().to_vec()
}

fn refcount(registry: &Registry, handle: CK_OBJECT_HANDLE) -> u32 {
    ret_or_panic!(registry.with_object(handle, |o| Ok(o.get_refcount())))
}

#[test]
#[parallel]
fn test_certificate_attributes() {
    let (registry, cert, _) = cert_and_key_registry();

    let class = ret_or_panic!(registry.fetch_attribute(cert, CKA_CLASS));
    assert_eq!(ret_or_panic!(class.to_ulong()), CKO_CERTIFICATE);
    let ctype =
        ret_or_panic!(registry.fetch_attribute(cert, CKA_CERTIFICATE_TYPE));
    assert_eq!(ret_or_panic!(ctype.to_ulong()), CKC_X_509);
    let private = ret_or_panic!(registry.fetch_attribute(cert, CKA_PRIVATE));
    assert_eq!(ret_or_panic!(private.to_bool()), false);
    let token = ret_or_panic!(registry.fetch_attribute(cert, CKA_TOKEN));
    assert_eq!(ret_or_panic!(token.to_bool()), true);
    let label = ret_or_panic!(registry.fetch_attribute(cert, CKA_LABEL));
    assert_eq!(ret_or_panic!(label.to_string()), "cert.pem");

    assert_eq!(fetch_bytes(&registry, cert, CKA_VALUE), CERT_DER);
    assert_eq!(
        hex::encode(fetch_bytes(&registry, cert, CKA_SERIAL_NUMBER)),
        CERT_SERIAL_DER
    );
    assert_eq!(
        hex::encode(fetch_bytes(&registry, cert, CKA_CERT_SHA1_HASH)),
        CERT_SHA1
    );
    assert_eq!(
        hex::encode(fetch_bytes(&registry, cert, CKA_CERT_MD5_HASH)),
        CERT_MD5
    );
    assert_eq!(fetch_bytes(&registry, cert, CKA_ID), b"1");

    assert_err_kind!(
        registry.fetch_attribute(cert, CKA_MODULUS),
        ErrorKind::NotFound
    );
}

#[test]
#[parallel]
fn test_private_key_attributes() {
    let (registry, cert, key) = cert_and_key_registry();

    let class = ret_or_panic!(registry.fetch_attribute(key, CKA_CLASS));
    assert_eq!(ret_or_panic!(class.to_ulong()), CKO_PRIVATE_KEY);
    let ktype = ret_or_panic!(registry.fetch_attribute(key, CKA_KEY_TYPE));
    assert_eq!(ret_or_panic!(ktype.to_ulong()), CKK_RSA);
    for t in [CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN, CKA_DECRYPT, CKA_UNWRAP] {
        let a = ret_or_panic!(registry.fetch_attribute(key, t));
        assert_eq!(ret_or_panic!(a.to_bool()), true);
    }
    for t in [CKA_EXTRACTABLE, CKA_ENCRYPT, CKA_VERIFY, CKA_WRAP] {
        let a = ret_or_panic!(registry.fetch_attribute(key, t));
        assert_eq!(ret_or_panic!(a.to_bool()), false);
    }

    /* a certificate and its key share subject and id */
    assert_eq!(
        fetch_bytes(&registry, key, CKA_SUBJECT),
        fetch_bytes(&registry, cert, CKA_SUBJECT)
    );
    assert_eq!(
        fetch_bytes(&registry, key, CKA_ID),
        fetch_bytes(&registry, cert, CKA_ID)
    );
    assert_eq!(
        fetch_bytes(&registry, key, CKA_PUBLIC_KEY_INFO),
        fetch_bytes(&registry, cert, CKA_PUBLIC_KEY_INFO)
    );

    let decoded = ret_or_panic!(decode_rsa_private_key(RSA1024_DER));
    assert_eq!(fetch_bytes(&registry, key, CKA_MODULUS), decoded.modulus);
    assert_eq!(
        fetch_bytes(&registry, key, CKA_PUBLIC_EXPONENT),
        decoded.public_exponent
    );
    let bits = ret_or_panic!(registry.fetch_attribute(key, CKA_MODULUS_BITS));
    assert_eq!(ret_or_panic!(bits.to_ulong()), 1024);

    /* private numbers are never exposed */
    for t in [CKA_PRIVATE_EXPONENT, CKA_PRIME_1, CKA_COEFFICIENT] {
        assert_err_kind!(registry.fetch_attribute(key, t), ErrorKind::NotFound);
    }
}

#[test]
#[parallel]
fn test_bare_key() {
    let registry = Registry::new();
    let (key, new) = ret_or_panic!(registry.insert(new_bare_key(RSA1024_DER)));
    assert!(new);
    assert_err_kind!(
        registry.fetch_attribute(key, CKA_SUBJECT),
        ErrorKind::NotFound
    );
    let fields =
        ret_or_panic!(crate::kasn1::x509::CertificateFields::parse(CERT_DER));
    assert_eq!(
        fetch_bytes(&registry, key, CKA_PUBLIC_KEY_INFO),
        fields.subject_public_key_info
    );

    /* the same key wrapped in PKCS#8 is a different object */
    let (p8, new) =
        ret_or_panic!(registry.insert(new_bare_key(RSA1024_P8_DER)));
    assert!(new);
    assert_ne!(key, p8);
    assert_eq!(
        fetch_bytes(&registry, key, CKA_MODULUS),
        fetch_bytes(&registry, p8, CKA_MODULUS)
    );
}

#[test]
#[parallel]
fn test_duplicate_insert() {
    let registry = Registry::new();
    let (h1, new) =
        ret_or_panic!(registry.insert(new_cert(CERT_DER, CKO_CERTIFICATE)));
    assert!(new);
    let (h2, new) =
        ret_or_panic!(registry.insert(new_cert(CERT_DER, CKO_CERTIFICATE)));
    assert!(!new);
    assert_eq!(h1, h2);
    assert_eq!(ret_or_panic!(registry.get_object_count()), 1);
    assert_eq!(refcount(&registry, h1), 2);

    /* the same DER in another slot is another object */
    let mut other = new_cert(CERT_DER, CKO_CERTIFICATE);
    other.slot = TEST_SLOT + 1;
    let (h3, new) = ret_or_panic!(registry.insert(other));
    assert!(new);
    assert_ne!(h1, h3);
}

#[test]
#[parallel]
fn test_incomplete_key_is_superseded() {
    let registry = Registry::new();
    let (h1, new) =
        ret_or_panic!(registry.insert(new_cert(CERT_DER, CKO_PRIVATE_KEY)));
    assert!(new);
    assert!(!ret_or_panic!(registry.with_object(h1, |o| Ok(o.is_complete()))));
    assert_err_kind!(
        registry.populate_modulus_exponent(h1),
        ErrorKind::KeyTypeInconsistent
    );

    let mut full = new_cert(CERT_DER, CKO_PRIVATE_KEY);
    full.key_der = Some(RSA1024_DER);
    let (h2, new) = ret_or_panic!(registry.insert(full));
    assert!(new);
    assert_eq!(h1, h2);
    assert_eq!(refcount(&registry, h1), 1);
    assert!(ret_or_panic!(registry.with_object(h1, |o| Ok(o.is_complete()))));
    ret_or_panic!(registry.populate_modulus_exponent(h1));

    /* a complete object is never replaced by an incomplete one */
    let (h3, new) =
        ret_or_panic!(registry.insert(new_cert(CERT_DER, CKO_PRIVATE_KEY)));
    assert!(!new);
    assert_eq!(h1, h3);
    assert!(ret_or_panic!(registry.with_object(h1, |o| Ok(o.is_complete()))));
}

#[test]
#[parallel]
fn test_find() {
    let (registry, cert, key) = cert_and_key_registry();
    let (bare, _) = ret_or_panic!(registry.insert(new_bare_key(RSA1024_DER)));

    /* empty template matches everything, in insertion order */
    assert_eq!(ret_or_panic!(registry.find(&[])), vec![cert, key, bare]);

    let template = vec![ulong_attr(CKA_CLASS, CKO_PRIVATE_KEY)];
    assert_eq!(ret_or_panic!(registry.find(&template)), vec![key, bare]);

    /* conjunction */
    let template = vec![
        ulong_attr(CKA_CLASS, CKO_PRIVATE_KEY),
        Attribute::from_bytes(CKA_ID, b"1".to_vec()),
    ];
    assert_eq!(ret_or_panic!(registry.find(&template)), vec![key]);

    let template = vec![
        ulong_attr(CKA_CLASS, CKO_CERTIFICATE),
        Attribute::from_bytes(CKA_ID, b"2".to_vec()),
    ];
    assert!(ret_or_panic!(registry.find(&template)).is_empty());

    /* an attribute the object does not expose fails the match */
    let subject = fetch_bytes(&registry, cert, CKA_SUBJECT);
    let template = vec![Attribute::from_bytes(CKA_SUBJECT, subject)];
    assert_eq!(ret_or_panic!(registry.find(&template)), vec![cert, key]);

    let filter = SearchFilter {
        slot: Some(TEST_SLOT),
        otype: Some(ObjectType::BareKey),
    };
    assert_eq!(ret_or_panic!(registry.find_filtered(&filter, &[])), vec![bare]);
    let filter = SearchFilter {
        slot: Some(TEST_SLOT + 1),
        otype: None,
    };
    assert!(ret_or_panic!(registry.find_filtered(&filter, &[])).is_empty());
}

#[test]
#[parallel]
fn test_group() {
    let entries = ret_or_panic!(PemFileSupplier::parse(BUNDLE_PEM));
    assert_eq!(entries.len(), 2);
    let registry = Registry::new();
    let group = entries
        .iter()
        .map(|e| {
            let mut n = new_cert(&e.der, CKO_CERTIFICATE);
            n.name = "bundle.pem";
            n
        })
        .collect();
    let (master, new) =
        ret_or_panic!(registry.insert_group(TEST_SLOT, "bundle.pem", group));
    assert!(new);
    assert_eq!(ret_or_panic!(registry.get_object_count()), 1);
    let subs = ret_or_panic!(
        registry.with_object(master, |o| Ok(o.get_subordinates().len()))
    );
    assert_eq!(subs, 2);

    /* lookups are answered by the first subordinate */
    assert_eq!(fetch_bytes(&registry, master, CKA_VALUE), CERT_DER);
    let template = vec![ulong_attr(CKA_CLASS, CKO_CERTIFICATE)];
    assert_eq!(ret_or_panic!(registry.find(&template)), vec![master]);

    assert_err_kind!(
        registry.insert_group(TEST_SLOT, "empty", Vec::new()),
        ErrorKind::GeneralError
    );
}

#[test]
#[parallel]
fn test_group_skips_bad_entries() {
    let entries = ret_or_panic!(PemFileSupplier::parse(BUNDLE_BAD_PEM));
    assert_eq!(entries.len(), 3);
    let registry = Registry::new();
    let group = entries
        .iter()
        .map(|e| new_cert(&e.der, CKO_CERTIFICATE))
        .collect();
    let (master, new) =
        ret_or_panic!(registry.insert_group(TEST_SLOT, "bundle.pem", group));
    assert!(new);
    let subs = ret_or_panic!(
        registry.with_object(master, |o| Ok(o.get_subordinates().len()))
    );
    assert_eq!(subs, 2);
    assert_eq!(fetch_bytes(&registry, master, CKA_VALUE), CERT_DER);

    let bad = vec![new_cert(&entries[0].der, CKO_CERTIFICATE)];
    assert_err_kind!(
        registry.insert_group(TEST_SLOT, "bad.pem", bad),
        ErrorKind::GeneralError
    );
}

#[test]
#[parallel]
fn test_non_rsa_key_rejected() {
    let registry = Registry::new();
    assert_err_kind!(
        registry.insert(new_bare_key(EC_P256_P8_DER)),
        ErrorKind::UnsupportedAlgorithm
    );
    let mut new = new_cert(CERT_DER, CKO_PRIVATE_KEY);
    new.key_der = Some(EC_P256_P8_DER);
    assert_err_kind!(registry.insert(new), ErrorKind::UnsupportedAlgorithm);
    assert_err_kind!(
        registry.insert(new_bare_key(&RSA1024_DER[..4])),
        ErrorKind::BadEncoding
    );

    let (rsa, _) = ret_or_panic!(registry.insert(new_bare_key(RSA1024_DER)));
    let template = vec![
        ulong_attr(CKA_CLASS, CKO_PRIVATE_KEY),
        ulong_attr(CKA_KEY_TYPE, CKK_RSA),
    ];
    assert_eq!(ret_or_panic!(registry.find(&template)), vec![rsa]);
    assert_eq!(ret_or_panic!(registry.get_object_count()), 1);
}

#[test]
#[parallel]
fn test_raw_object() {
    let registry = Registry::new();
    let attrs = vec![
        ulong_attr(CKA_CLASS, CKO_NSS_BUILTIN_ROOT_LIST),
        Attribute::from_string(CKA_LABEL, "Root List".to_string()),
    ];
    let (h, _) =
        ret_or_panic!(registry.insert_raw(TEST_SLOT, "roots", "0", attrs));
    let class = ret_or_panic!(registry.fetch_attribute(h, CKA_CLASS));
    assert_eq!(ret_or_panic!(class.to_ulong()), CKO_NSS_BUILTIN_ROOT_LIST);
    let label = ret_or_panic!(registry.fetch_attribute(h, CKA_LABEL));
    assert_eq!(ret_or_panic!(label.to_string()), "Root List");
    /* nothing beyond the supplied attributes */
    assert_err_kind!(
        registry.fetch_attribute(h, CKA_TOKEN),
        ErrorKind::NotFound
    );
}

#[test]
#[parallel]
fn test_release_and_reset() {
    let (registry, cert, key) = cert_and_key_registry();

    ret_or_panic!(registry.retain(cert));
    ret_or_panic!(registry.release(cert));
    assert_eq!(ret_or_panic!(registry.get_object_count()), 2);
    ret_or_panic!(registry.release(cert));
    assert_eq!(ret_or_panic!(registry.get_object_count()), 1);
    assert_err_kind!(
        registry.fetch_attribute(cert, CKA_CLASS),
        ErrorKind::InvalidHandle
    );

    ret_or_panic!(registry.reset());
    assert_eq!(ret_or_panic!(registry.get_object_count()), 0);
    assert_err_kind!(
        registry.fetch_attribute(key, CKA_CLASS),
        ErrorKind::InvalidHandle
    );
    assert_err_kind!(registry.release(key), ErrorKind::InvalidHandle);

    /* handles are not reused */
    let (h, _) =
        ret_or_panic!(registry.insert(new_cert(CERT_DER, CKO_CERTIFICATE)));
    assert!(h > key);
}

#[test]
#[parallel]
fn test_encrypted_key_login() {
    let entries = ret_or_panic!(PemFileSupplier::parse(RSA1024_DES3_PEM));
    let entry = &entries[0];
    let registry = Registry::new();
    let mut new = new_bare_key(&entry.der);
    new.cipher = entry.cipher.clone();
    let (key, _) = ret_or_panic!(registry.insert(new));

    assert_err_kind!(
        registry.fetch_attribute(key, CKA_MODULUS),
        ErrorKind::NotFound
    );
    assert_err_kind!(
        registry.populate_modulus_exponent(key),
        ErrorKind::NotLoggedIn
    );

    let bad = FakeDecryptor {
        passphrase: "wrong",
        plaintext: RSA1024_DER,
    };
    assert_err_kind!(registry.login(TEST_SLOT, &bad), ErrorKind::PinIncorrect);
    let garbage = FakeDecryptor {
        passphrase: "secret",
        plaintext: &RSA1024_DER[..20],
    };
    assert_err_kind!(
        registry.login(TEST_SLOT, &garbage),
        ErrorKind::PinIncorrect
    );

    /* other slots are left alone */
    let good = FakeDecryptor {
        passphrase: "secret",
        plaintext: RSA1024_DER,
    };
    assert_eq!(ret_or_panic!(registry.login(TEST_SLOT + 1, &good)), 0);
    assert_eq!(ret_or_panic!(registry.login(TEST_SLOT, &good)), 1);

    let decoded = ret_or_panic!(decode_rsa_private_key(RSA1024_DER));
    assert_eq!(fetch_bytes(&registry, key, CKA_MODULUS), decoded.modulus);
}

#[test]
#[parallel]
fn test_concurrent_readers() {
    let (registry, cert, key) = cert_and_key_registry();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..16 {
                    let found = ret_or_panic!(registry.find(&[]));
                    assert_eq!(found, vec![cert, key]);
                    ret_or_panic!(registry.fetch_attribute(key, CKA_MODULUS));
                }
            });
        }
    });
}
