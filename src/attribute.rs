// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module provides the typed, immutable [Attribute] value used by
//! every stored object, and the static map between PKCS#11 attribute ids
//! and the data type they represent as described in the [AttrType]
//! enumeration.

use std::cmp::Ordering;

use crate::error::{Error, ErrorKind, Result};
use crate::pkcs11::*;

/// List of attribute types we understand
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AttrType {
    BoolType,
    NumType,
    StringType,
    BytesType,
}

impl AttrType {
    /// Finds and return the attribute id and type from its name
    pub fn attr_name_to_id_type(s: &str) -> Result<(CK_ULONG, AttrType)> {
        match Attrmap::search_by_name(s) {
            Some(a) => Ok((a.id, a.atype)),
            None => Err(Error::not_found(s.to_string())),
        }
    }

    /// Finds the attribute type from the attribute id
    pub fn attr_id_to_attrtype(id: CK_ULONG) -> Result<AttrType> {
        match Attrmap::search_by_id(id) {
            Some(a) => Ok(a.atype),
            None => Err(Error::not_found(format!("attribute {:#x}", id))),
        }
    }
}

/// Returns the printable name of a known attribute id
pub fn attr_name(id: CK_ULONG) -> String {
    match Attrmap::search_by_id(id) {
        Some(a) => a.name.to_string(),
        None => format!("{:#x}", id),
    }
}

/// Struct to map a PKCS#11 attribute to a type and a printable name
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Attrmap<'a> {
    id: CK_ULONG,
    name: &'a str,
    atype: AttrType,
}

impl PartialOrd for Attrmap<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attrmap<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Attrmap<'_> {
    /// Convenience function to efficiently search for a mapping by id
    pub fn search_by_id(id: CK_ULONG) -> Option<&'static Attrmap<'static>> {
        match &ATTRMAP.binary_search(&Attrmap {
            id: id,
            name: "",
            atype: AttrType::StringType,
        }) {
            Ok(i) => Some(&ATTRMAP[*i]),
            Err(_) => None,
        }
    }

    /// Convenience function to search for a mapping by name
    pub fn search_by_name(s: &str) -> Option<&'static Attrmap<'static>> {
        ATTRMAP.iter().find(|a| a.name == s)
    }
}

/// Helper macro to populate the static attributes map
macro_rules! attrmap_element {
    ($id:expr; as $attrtype:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            atype: AttrType::$attrtype,
        }
    };
}

/// The attributes map, lists every attribute the store can expose
static ATTRMAP: [Attrmap<'_>; 50] = [
    attrmap_element!(CKA_CLASS; as NumType),
    attrmap_element!(CKA_TOKEN; as BoolType),
    attrmap_element!(CKA_PRIVATE; as BoolType),
    attrmap_element!(CKA_LABEL; as StringType),
    attrmap_element!(CKA_APPLICATION; as StringType),
    attrmap_element!(CKA_VALUE; as BytesType),
    attrmap_element!(CKA_OBJECT_ID; as BytesType),
    attrmap_element!(CKA_CERTIFICATE_TYPE; as NumType),
    attrmap_element!(CKA_ISSUER; as BytesType),
    attrmap_element!(CKA_SERIAL_NUMBER; as BytesType),
    attrmap_element!(CKA_TRUSTED; as BoolType),
    attrmap_element!(CKA_KEY_TYPE; as NumType),
    attrmap_element!(CKA_SUBJECT; as BytesType),
    attrmap_element!(CKA_ID; as BytesType),
    attrmap_element!(CKA_SENSITIVE; as BoolType),
    attrmap_element!(CKA_ENCRYPT; as BoolType),
    attrmap_element!(CKA_DECRYPT; as BoolType),
    attrmap_element!(CKA_WRAP; as BoolType),
    attrmap_element!(CKA_UNWRAP; as BoolType),
    attrmap_element!(CKA_SIGN; as BoolType),
    attrmap_element!(CKA_SIGN_RECOVER; as BoolType),
    attrmap_element!(CKA_VERIFY; as BoolType),
    attrmap_element!(CKA_VERIFY_RECOVER; as BoolType),
    attrmap_element!(CKA_DERIVE; as BoolType),
    attrmap_element!(CKA_MODULUS; as BytesType),
    attrmap_element!(CKA_MODULUS_BITS; as NumType),
    attrmap_element!(CKA_PUBLIC_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIVATE_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIME_1; as BytesType),
    attrmap_element!(CKA_PRIME_2; as BytesType),
    attrmap_element!(CKA_EXPONENT_1; as BytesType),
    attrmap_element!(CKA_EXPONENT_2; as BytesType),
    attrmap_element!(CKA_COEFFICIENT; as BytesType),
    attrmap_element!(CKA_PUBLIC_KEY_INFO; as BytesType),
    attrmap_element!(CKA_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_MODIFIABLE; as BoolType),
    /* NSS vendor attributes */
    attrmap_element!(CKA_TRUST_DIGITAL_SIGNATURE; as NumType),
    attrmap_element!(CKA_TRUST_NON_REPUDIATION; as NumType),
    attrmap_element!(CKA_TRUST_KEY_ENCIPHERMENT; as NumType),
    attrmap_element!(CKA_TRUST_DATA_ENCIPHERMENT; as NumType),
    attrmap_element!(CKA_TRUST_KEY_AGREEMENT; as NumType),
    attrmap_element!(CKA_TRUST_KEY_CERT_SIGN; as NumType),
    attrmap_element!(CKA_TRUST_CRL_SIGN; as NumType),
    attrmap_element!(CKA_TRUST_SERVER_AUTH; as NumType),
    attrmap_element!(CKA_TRUST_CLIENT_AUTH; as NumType),
    attrmap_element!(CKA_TRUST_CODE_SIGNING; as NumType),
    attrmap_element!(CKA_TRUST_EMAIL_PROTECTION; as NumType),
    attrmap_element!(CKA_TRUST_STEP_UP_APPROVED; as BoolType),
    attrmap_element!(CKA_CERT_SHA1_HASH; as BytesType),
    attrmap_element!(CKA_CERT_MD5_HASH; as BytesType),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_order_of_attrmap() {
        let mut copy = ATTRMAP.clone();
        copy.sort();
        assert_eq!(ATTRMAP, copy);
    }

    #[test]
    fn attribute_matching() {
        let a = Attribute::from_ulong(CKA_CLASS, CKO_PRIVATE_KEY);
        assert!(a.matches(&Attribute::from_ulong(CKA_CLASS, CKO_PRIVATE_KEY)));
        assert!(!a.matches(&Attribute::from_ulong(CKA_CLASS, CKO_DATA)));
        assert!(
            !a.matches(&Attribute::from_ulong(CKA_KEY_TYPE, CKO_PRIVATE_KEY))
        );
        assert_eq!(a.to_ulong().unwrap(), CKO_PRIVATE_KEY);
        assert_eq!(a.name(), "CKA_CLASS");
        assert!(a.to_bool().is_err());
    }

    #[test]
    fn attribute_lookup() {
        let (id, atype) =
            AttrType::attr_name_to_id_type("CKA_MODULUS").unwrap();
        assert_eq!(id, CKA_MODULUS);
        assert_eq!(atype, AttrType::BytesType);
        assert!(AttrType::attr_name_to_id_type("CKA_NOPE").is_err());

        let a = Attribute::from_typed_slice(CKA_LABEL, b"label").unwrap();
        assert_eq!(a.to_string().unwrap(), "label");
        let a = Attribute::from_typed_slice(CKA_TRUST_STEP_UP_APPROVED, &[1]);
        assert_eq!(a.unwrap().to_bool().unwrap(), true);
        match Attribute::from_typed_slice(0xdead_beef, &[]) {
            Ok(_) => panic!("unknown attribute accepted"),
            Err(e) => assert!(e.attr_not_found()),
        }
        assert_eq!(attr_name(0x1234_5678), "0x12345678");
    }
}

/// A Rust native, typed attribute that holds the attribute value
///
/// Values are never modified in place, a new attribute replaces the old
/// one instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    ck_type: CK_ULONG,
    attrtype: AttrType,
    value: Vec<u8>,
}

impl Attribute {
    /// Returns the PKCS#11 attribute 'type' which is the attribute ID
    pub fn get_type(&self) -> CK_ULONG {
        self.ck_type
    }

    /// Returns the internal attribute type
    pub fn get_attrtype(&self) -> AttrType {
        self.attrtype
    }

    /// Returns a reference to the internal value
    pub fn get_value(&self) -> &[u8] {
        &self.value
    }

    /// Checks that the two attributes have the same type and the same
    /// value stored
    pub fn matches(&self, other: &Attribute) -> bool {
        self.ck_type == other.ck_type && self.value == other.value
    }

    /// Returns the name of the attribute as an allocated String
    pub fn name(&self) -> String {
        attr_name(self.ck_type)
    }

    /// Returns the internal value as a boolean
    pub fn to_bool(&self) -> Result<bool> {
        if self.attrtype != AttrType::BoolType || self.value.len() != 1 {
            return Err(ErrorKind::GeneralError)?;
        }
        Ok(self.value[0] != 0)
    }

    /// Returns the internal value as a CK_ULONG
    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        if self.attrtype != AttrType::NumType {
            return Err(ErrorKind::GeneralError)?;
        }
        match self.value.as_slice().try_into() {
            Ok(b) => Ok(CK_ULONG::from_ne_bytes(b)),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    /// Returns the internal value as a String
    pub fn to_string(&self) -> Result<String> {
        if self.attrtype != AttrType::StringType {
            return Err(ErrorKind::GeneralError)?;
        }
        match std::str::from_utf8(&self.value) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    /// Returns a reference to the internal value wrapped in a Result
    pub fn to_bytes(&self) -> Result<&Vec<u8>> {
        if self.attrtype != AttrType::BytesType {
            return Err(ErrorKind::GeneralError)?;
        }
        Ok(&self.value)
    }

    /// Creates an attribute of type AttrType::BoolType from a bool
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_bool(t: CK_ULONG, val: bool) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BoolType,
            value: vec![if val { CK_TRUE } else { CK_FALSE }],
        }
    }

    /// Creates an attribute of type AttrType::NumType from a CK_ULONG
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_ulong(t: CK_ULONG, val: CK_ULONG) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::NumType,
            value: Vec::from(val.to_ne_bytes()),
        }
    }

    /// Creates an attribute of type AttrType::StringType from a String
    pub fn from_string(t: CK_ULONG, val: String) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::StringType,
            value: val.into_bytes(),
        }
    }

    /// Creates an attribute of type AttrType::BytesType from a `Vec<u8>`
    pub fn from_bytes(t: CK_ULONG, val: Vec<u8>) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BytesType,
            value: val,
        }
    }

    /// Creates an attribute with the type registered for the id in the
    /// attributes map; unknown ids are rejected
    pub fn from_typed_slice(t: CK_ULONG, val: &[u8]) -> Result<Attribute> {
        Ok(Attribute {
            ck_type: t,
            attrtype: AttrType::attr_id_to_attrtype(t)?,
            value: val.to_vec(),
        })
    }
}
