// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

//! Populates the registry from PEM/DER files
//!
//! Reading and decrypting files is delegated to the [DerSupplier] and
//! [KeyDecryptor] traits, [PemFileSupplier] is the implementation used
//! for regular files.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::kasn1::x509::CertificateFields;
use crate::object::{NewObject, ObjectType};
use crate::pkcs11::*;
use crate::registry::Registry;

use log::{debug, info, warn};
use zeroize::Zeroizing;

/// Legacy PEM encryption parameters from the `DEK-Info` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherInfo {
    pub algorithm: String,
    /// Hex encoded IV, also the salt of the key derivation
    pub iv: String,
}

/// Decrypts legacy encrypted PEM keys
pub trait KeyDecryptor {
    fn decrypt(&self, encoded: &[u8], cipher: &CipherInfo) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Certificate,
    PrivateKey,
}

/// One DER blob found in a file
#[derive(Debug)]
pub struct DerEntry {
    pub der: Zeroizing<Vec<u8>>,
    pub entry_type: EntryType,
    pub cipher: Option<CipherInfo>,
}

/// Yields the DER entries held by a file
pub trait DerSupplier {
    fn entries(&self, path: &str) -> Result<Vec<DerEntry>>;
}

const PEM_MARKER: &[u8] = b"-----BEGIN ";

/// Reads PEM files, or single binary DER files
#[derive(Debug, Default, Clone, Copy)]
pub struct PemFileSupplier;

impl PemFileSupplier {
    fn pem_cipher(p: &pem::Pem) -> Result<Option<CipherInfo>> {
        match p.headers().get("Proc-Type") {
            Some(t) if t.contains("ENCRYPTED") => (),
            _ => return Ok(None),
        }
        let dek = match p.headers().get("DEK-Info") {
            Some(d) => d,
            None => {
                return Err(Error::with_errmsg(
                    ErrorKind::BadEncoding,
                    "encrypted key without DEK-Info".to_string(),
                ))
            }
        };
        match dek.split_once(',') {
            Some((alg, iv)) => Ok(Some(CipherInfo {
                algorithm: alg.trim().to_string(),
                iv: iv.trim().to_string(),
            })),
            None => Err(Error::with_errmsg(
                ErrorKind::BadEncoding,
                format!("malformed DEK-Info: {}", dek),
            )),
        }
    }

    /// Splits file contents into DER entries
    pub fn parse(data: &[u8]) -> Result<Vec<DerEntry>> {
        if !data.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
            let entry_type = match CertificateFields::parse(data) {
                Ok(_) => EntryType::Certificate,
                Err(_) => EntryType::PrivateKey,
            };
            return Ok(vec![DerEntry {
                der: Zeroizing::new(data.to_vec()),
                entry_type: entry_type,
                cipher: None,
            }]);
        }
        let mut entries = Vec::new();
        for p in pem::parse_many(data)? {
            let entry_type = match p.tag() {
                "CERTIFICATE" => EntryType::Certificate,
                "RSA PRIVATE KEY" | "PRIVATE KEY" => EntryType::PrivateKey,
                other => {
                    debug!("Skipping PEM block {}", other);
                    continue;
                }
            };
            let cipher = match entry_type {
                EntryType::PrivateKey => Self::pem_cipher(&p)?,
                EntryType::Certificate => None,
            };
            entries.push(DerEntry {
                der: Zeroizing::new(p.into_contents()),
                entry_type: entry_type,
                cipher: cipher,
            });
        }
        Ok(entries)
    }
}

impl DerSupplier for PemFileSupplier {
    fn entries(&self, path: &str) -> Result<Vec<DerEntry>> {
        let data = Zeroizing::new(fs::read(path)?);
        Self::parse(&data)
    }
}

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_source_id() -> String {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::SeqCst).to_string()
}

fn cert_object<'a>(
    slot: CK_SLOT_ID,
    name: &'a str,
    id: &'a str,
    der: &'a [u8],
    class: CK_OBJECT_CLASS,
) -> NewObject<'a> {
    NewObject {
        class: class,
        otype: ObjectType::Certificate,
        cert_der: Some(der),
        key_der: None,
        cipher: None,
        name: name,
        id: id,
        slot: slot,
    }
}

fn count_new(res: (CK_OBJECT_HANDLE, bool), count: &mut usize) {
    if res.1 {
        *count += 1;
    }
}

/// Loads the certificates of `certfile` and the key paired with them
///
/// The key is the first private key of `keyfile`, or of the certificate
/// file itself when no key file is given. Returns how many new objects
/// were added to the registry.
pub fn load_certificates(
    registry: &Registry,
    supplier: &dyn DerSupplier,
    slot: CK_SLOT_ID,
    certfile: &str,
    keyfile: Option<&str>,
    ca: bool,
) -> Result<usize> {
    let entries = supplier.entries(certfile)?;
    let mut certs = Vec::<&DerEntry>::new();
    for (idx, e) in entries.iter().enumerate() {
        if e.entry_type != EntryType::Certificate {
            continue;
        }
        match CertificateFields::parse(&e.der) {
            Ok(_) => certs.push(e),
            Err(err) => {
                warn!("Skipping certificate {} of {}: {}", idx, certfile, err)
            }
        }
    }
    if certs.is_empty() {
        return Err(Error::with_errmsg(
            ErrorKind::BadEncoding,
            format!("no certificate found in {}", certfile),
        ));
    }

    let key_entries = match keyfile {
        Some(k) => supplier.entries(k)?,
        None => Vec::new(),
    };
    let key = match keyfile {
        Some(_) => key_entries.iter(),
        None => entries.iter(),
    }
    .find(|e| e.entry_type == EntryType::PrivateKey);

    let id = next_source_id();
    let first: &[u8] = &certs[0].der;
    let mut count = 0;
    if certs.len() == 1 {
        let obj = cert_object(slot, certfile, &id, first, CKO_CERTIFICATE);
        count_new(registry.insert(obj)?, &mut count);
    } else {
        let group = certs
            .iter()
            .map(|c| {
                cert_object(slot, certfile, &id, &c.der, CKO_CERTIFICATE)
            })
            .collect();
        count_new(registry.insert_group(slot, certfile, group)?, &mut count);
    }

    if ca {
        for c in &certs {
            let mut obj =
                cert_object(slot, certfile, &id, &c.der, CKO_NSS_TRUST);
            obj.otype = ObjectType::Trust;
            count_new(registry.insert(obj)?, &mut count);
        }
    }

    let keyname = keyfile.unwrap_or(certfile);
    match key {
        Some(k) => {
            let mut obj =
                cert_object(slot, certfile, &id, first, CKO_PRIVATE_KEY);
            obj.key_der = Some(k.der.as_slice());
            obj.cipher = k.cipher.clone();
            match registry.insert(obj) {
                Ok(res) => count_new(res, &mut count),
                Err(e) => warn!("Skipping private key of {}: {}", keyname, e),
            }
        }
        None => match keyfile {
            Some(k) => warn!("No private key found in {}", k),
            None => debug!("No private key paired with {}", certfile),
        },
    }
    Ok(count)
}

/// Loads every private key of `keyfile` as a key with no certificate
///
/// Keys that cannot be used are logged and skipped.
pub fn load_keys(
    registry: &Registry,
    supplier: &dyn DerSupplier,
    slot: CK_SLOT_ID,
    keyfile: &str,
) -> Result<usize> {
    let mut count = 0;
    for (idx, e) in supplier.entries(keyfile)?.iter().enumerate() {
        if e.entry_type != EntryType::PrivateKey {
            continue;
        }
        let id = next_source_id();
        let obj = NewObject {
            class: CKO_PRIVATE_KEY,
            otype: ObjectType::BareKey,
            cert_der: None,
            key_der: Some(e.der.as_slice()),
            cipher: e.cipher.clone(),
            name: keyfile,
            id: &id,
            slot: slot,
        };
        match registry.insert(obj) {
            Ok(res) => count_new(res, &mut count),
            Err(err) => warn!("Skipping key {} of {}: {}", idx, keyfile, err),
        }
    }
    Ok(count)
}

/// Outcome of loading a configuration
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// New objects added to the registry
    pub loaded: usize,
    /// Files that could not be loaded
    pub failed: usize,
}

/// Loads every file named by the configuration, files that fail are
/// logged and skipped
pub fn load_config(
    registry: &Registry,
    supplier: &dyn DerSupplier,
    config: &Config,
) -> LoadReport {
    let mut report = LoadReport::default();
    for slot in &config.slots {
        let slot_id = CK_SLOT_ID::from(slot.slot);
        for c in &slot.certificates {
            match load_certificates(
                registry,
                supplier,
                slot_id,
                &c.path,
                c.key.as_deref(),
                c.ca,
            ) {
                Ok(n) => report.loaded += n,
                Err(e) => {
                    warn!("Failed to load {}: {}", c.path, e);
                    report.failed += 1;
                }
            }
        }
        for k in &slot.keys {
            match load_keys(registry, supplier, slot_id, &k.path) {
                Ok(n) => report.loaded += n,
                Err(e) => {
                    warn!("Failed to load {}: {}", k.path, e);
                    report.failed += 1;
                }
            }
        }
    }
    info!(
        "Loaded {} objects, {} files failed",
        report.loaded, report.failed
    );
    report
}
