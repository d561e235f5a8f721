// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines the in-memory representation of the objects built
//! from PEM/DER files (`PemObject`). Each object is one variant of
//! [ObjectKind] plus the bookkeeping shared by all of them: a content
//! derived identity key, a label, a class, the source slot, a reference
//! count and an optional list of subordinate objects.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::attribute::Attribute;
use crate::error::{Error, ErrorKind, Result};
use crate::loader::CipherInfo;
use crate::pkcs11::*;

use sha1::{Digest, Sha1};

pub mod certs;
pub mod key;

pub use certs::{CertObject, TrustObject};
pub use key::{KeyNumbers, KeyObject, KeyParameters};

/// Tag of the [ObjectKind] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Raw,
    Certificate,
    BareKey,
    Trust,
}

impl ObjectType {
    fn tag(&self) -> u8 {
        match self {
            ObjectType::Raw => 0,
            ObjectType::Certificate => 1,
            ObjectType::BareKey => 2,
            ObjectType::Trust => 3,
        }
    }
}

/// A static object defined entirely by its attributes
#[derive(Debug, Clone, Default)]
pub struct RawObject {
    attributes: Vec<Attribute>,
}

impl RawObject {
    pub fn new(attributes: Vec<Attribute>) -> RawObject {
        RawObject {
            attributes: attributes,
        }
    }

    fn get_attribute(&self, t: CK_ATTRIBUTE_TYPE) -> Result<Attribute> {
        match self.attributes.iter().find(|a| a.get_type() == t) {
            Some(a) => Ok(a.clone()),
            None => Err(Error::not_found(format!("{:#x}", t))),
        }
    }

    /// Canonical byte form used to derive the identity key
    fn identity_bytes(&self) -> Vec<u8> {
        let mut v = Vec::new();
        for a in &self.attributes {
            v.extend_from_slice(&(a.get_type() as u64).to_be_bytes());
            v.extend_from_slice(&(a.get_value().len() as u64).to_be_bytes());
            v.extend_from_slice(a.get_value());
        }
        v
    }
}

#[derive(Debug)]
pub enum ObjectKind {
    Raw(RawObject),
    Certificate(CertObject),
    BareKey(KeyObject),
    Trust(TrustObject),
}

impl ObjectKind {
    pub fn get_type(&self) -> ObjectType {
        match self {
            ObjectKind::Raw(_) => ObjectType::Raw,
            ObjectKind::Certificate(_) => ObjectType::Certificate,
            ObjectKind::BareKey(_) => ObjectType::BareKey,
            ObjectKind::Trust(_) => ObjectType::Trust,
        }
    }
}

/// Computes the identity key of an object from its slot, class, kind and
/// defining bytes
pub fn identity_key(
    slot: CK_SLOT_ID,
    class: CK_OBJECT_CLASS,
    otype: ObjectType,
    data: &[u8],
) -> String {
    let mut hasher = Sha1::new();
    hasher.update((slot as u64).to_be_bytes());
    hasher.update((class as u64).to_be_bytes());
    hasher.update([otype.tag()]);
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A stored object
#[derive(Debug)]
pub struct PemObject {
    identity: String,
    name: String,
    /// Decimal source id, shared by a certificate and its key
    id: String,
    class: CK_OBJECT_CLASS,
    slot: CK_SLOT_ID,
    refcount: AtomicU32,
    kind: ObjectKind,
    /// When not empty this object is a placeholder and every attribute
    /// lookup is delegated to the subordinates
    subordinates: Vec<PemObject>,
}

impl PemObject {
    fn new(
        slot: CK_SLOT_ID,
        class: CK_OBJECT_CLASS,
        name: &str,
        id: &str,
        identity: String,
        kind: ObjectKind,
    ) -> PemObject {
        PemObject {
            identity: identity,
            name: name.to_string(),
            id: id.to_string(),
            class: class,
            slot: slot,
            refcount: AtomicU32::new(1),
            kind: kind,
            subordinates: Vec::new(),
        }
    }

    /// Creates a raw object, the class is taken from the CKA_CLASS
    /// attribute (CKO_DATA if absent)
    pub fn new_raw(
        slot: CK_SLOT_ID,
        name: &str,
        id: &str,
        attributes: Vec<Attribute>,
    ) -> PemObject {
        let class = attributes
            .iter()
            .find(|a| a.get_type() == CKA_CLASS)
            .and_then(|a| a.to_ulong().ok())
            .unwrap_or(CKO_DATA);
        let raw = RawObject::new(attributes);
        let identity =
            identity_key(slot, class, ObjectType::Raw, &raw.identity_bytes());
        PemObject::new(slot, class, name, id, identity, ObjectKind::Raw(raw))
    }

    /// Creates a placeholder object that groups the subordinates
    pub fn new_group(
        slot: CK_SLOT_ID,
        name: &str,
        subordinates: Vec<PemObject>,
    ) -> Result<PemObject> {
        let class = match subordinates.first() {
            Some(s) => s.class,
            None => return Err(ErrorKind::GeneralError)?,
        };
        let mut ids = Vec::new();
        for s in &subordinates {
            ids.extend_from_slice(s.identity.as_bytes());
        }
        let identity = identity_key(slot, class, ObjectType::Raw, &ids);
        let mut obj = PemObject::new(
            slot,
            class,
            name,
            &subordinates[0].id,
            identity,
            ObjectKind::Raw(RawObject::default()),
        );
        obj.subordinates = subordinates;
        Ok(obj)
    }

    pub fn get_identity(&self) -> &str {
        &self.identity
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.class
    }

    pub fn get_slot(&self) -> CK_SLOT_ID {
        self.slot
    }

    pub fn get_kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn get_type(&self) -> ObjectType {
        self.kind.get_type()
    }

    pub fn get_subordinates(&self) -> &[PemObject] {
        &self.subordinates
    }

    /// False for a certificate backed private key still missing its key
    pub fn is_complete(&self) -> bool {
        if !self.subordinates.is_empty() {
            return self.subordinates.iter().all(|s| s.is_complete());
        }
        match &self.kind {
            ObjectKind::Certificate(c) => {
                self.class != CKO_PRIVATE_KEY || c.get_key().is_some()
            }
            _ => true,
        }
    }

    /// The key material of a private key object
    pub fn get_key_params(&self) -> Option<&KeyParameters> {
        let sub = self.subordinates.iter().find_map(|s| s.get_key_params());
        if sub.is_some() {
            return sub;
        }
        if self.class != CKO_PRIVATE_KEY {
            return None;
        }
        match &self.kind {
            ObjectKind::Certificate(c) => c.get_key(),
            ObjectKind::BareKey(k) => Some(&k.params),
            _ => None,
        }
    }

    pub fn get_refcount(&self) -> u32 {
        self.refcount.load(Ordering::SeqCst)
    }

    pub fn retain(&self) -> u32 {
        self.refcount.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrements the reference count, returns the remaining count
    pub fn release(&self) -> u32 {
        match self.refcount.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |c| c.checked_sub(1),
        ) {
            Ok(prev) => prev - 1,
            Err(_) => 0,
        }
    }

    fn common_attribute(&self, t: CK_ATTRIBUTE_TYPE) -> Option<Attribute> {
        match t {
            CKA_CLASS => Some(Attribute::from_ulong(t, self.class)),
            CKA_TOKEN => Some(Attribute::from_bool(t, true)),
            CKA_PRIVATE => {
                Some(Attribute::from_bool(t, self.class == CKO_PRIVATE_KEY))
            }
            CKA_MODIFIABLE => Some(Attribute::from_bool(t, false)),
            CKA_LABEL => Some(Attribute::from_string(t, self.name.clone())),
            CKA_ID => match self.kind {
                ObjectKind::Certificate(_) | ObjectKind::BareKey(_) => Some(
                    Attribute::from_bytes(t, self.id.as_bytes().to_vec()),
                ),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the value of an attribute, NotFound if the object does not
    /// expose it
    pub fn get_attribute(&self, t: CK_ATTRIBUTE_TYPE) -> Result<Attribute> {
        if !self.subordinates.is_empty() {
            for s in &self.subordinates {
                if let Ok(a) = s.get_attribute(t) {
                    return Ok(a);
                }
            }
            return Err(Error::not_found(format!("{:#x}", t)));
        }
        if let ObjectKind::Raw(r) = &self.kind {
            return r.get_attribute(t);
        }
        if let Some(a) = self.common_attribute(t) {
            return Ok(a);
        }
        match &self.kind {
            ObjectKind::Certificate(c) => c.get_attribute(self.class, t),
            ObjectKind::BareKey(k) => k.params.get_attribute(t, None),
            ObjectKind::Trust(tr) => tr.get_attribute(t),
            ObjectKind::Raw(r) => r.get_attribute(t),
        }
    }

    /// Conjunctive byte-equal match of every template attribute, an
    /// attribute the object does not expose fails the match
    pub fn match_template(&self, template: &[Attribute]) -> bool {
        template.iter().all(|tmpl| match self.get_attribute(tmpl.get_type()) {
            Ok(a) => a.matches(tmpl),
            Err(_) => false,
        })
    }
}

/// The description of an object to create from DER data
#[derive(Debug, Clone)]
pub struct NewObject<'a> {
    pub class: CK_OBJECT_CLASS,
    pub otype: ObjectType,
    pub cert_der: Option<&'a [u8]>,
    pub key_der: Option<&'a [u8]>,
    pub cipher: Option<CipherInfo>,
    pub name: &'a str,
    pub id: &'a str,
    pub slot: CK_SLOT_ID,
}

impl NewObject<'_> {
    fn require<'b>(der: Option<&'b [u8]>, what: &str) -> Result<&'b [u8]> {
        match der {
            Some(d) => Ok(d),
            None => Err(Error::with_errmsg(
                ErrorKind::GeneralError,
                format!("missing {} data", what),
            )),
        }
    }

    /// Parses the DER data and builds the object, nothing is shared with
    /// the registry until the object is inserted
    pub fn build(self) -> Result<PemObject> {
        let (kind, defining) = match self.otype {
            ObjectType::Certificate => {
                if self.class != CKO_CERTIFICATE
                    && self.class != CKO_PRIVATE_KEY
                {
                    return Err(ErrorKind::KeyTypeInconsistent)?;
                }
                let der = Self::require(self.cert_der, "certificate")?;
                let mut cert = CertObject::new(der)?;
                if self.class == CKO_PRIVATE_KEY {
                    if let Some(k) = self.key_der {
                        let spki = cert.get_public_key_info().to_vec();
                        cert.set_key(KeyParameters::new(
                            k,
                            self.cipher,
                            Some(spki),
                        )?);
                    }
                }
                (ObjectKind::Certificate(cert), der)
            }
            ObjectType::BareKey => {
                if self.class != CKO_PRIVATE_KEY {
                    return Err(ErrorKind::KeyTypeInconsistent)?;
                }
                let der = Self::require(self.key_der, "key")?;
                let params = KeyParameters::new(der, self.cipher, None)?;
                (ObjectKind::BareKey(KeyObject { params: params }), der)
            }
            ObjectType::Trust => {
                let der = Self::require(self.cert_der, "certificate")?;
                let cert = CertObject::new(der)?;
                (ObjectKind::Trust(TrustObject::new(&cert)), der)
            }
            ObjectType::Raw => {
                return Err(Error::with_errmsg(
                    ErrorKind::GeneralError,
                    "raw objects are built from attributes".to_string(),
                ));
            }
        };
        let class = match self.otype {
            ObjectType::Trust => CKO_NSS_TRUST,
            _ => self.class,
        };
        let identity = identity_key(self.slot, class, self.otype, defining);
        Ok(PemObject::new(
            self.slot, class, self.name, self.id, identity, kind,
        ))
    }
}
