// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::codec::RsaPrivateKey;
use crate::error::{Error, ErrorKind, Result};
use crate::pkcs11::*;

/// A mechanism the store can perform with its private keys
pub trait Mechanism: Debug + Send + Sync {
    fn info(&self) -> &CK_MECHANISM_INFO;
    fn decryption_new(
        &self,
        _: CK_MECHANISM_TYPE,
        _: RsaPrivateKey,
    ) -> Result<Box<dyn Decryption>> {
        Err(ErrorKind::MechanismInvalid)?
    }
    fn sign_new(
        &self,
        _: CK_MECHANISM_TYPE,
        _: RsaPrivateKey,
    ) -> Result<Box<dyn Sign>> {
        Err(ErrorKind::MechanismInvalid)?
    }
}

#[derive(Debug)]
pub struct Mechanisms {
    tree: BTreeMap<CK_MECHANISM_TYPE, Box<dyn Mechanism>>,
}

impl Default for Mechanisms {
    fn default() -> Self {
        Self::new()
    }
}

impl Mechanisms {
    pub fn new() -> Mechanisms {
        Mechanisms {
            tree: BTreeMap::new(),
        }
    }

    /// The mechanisms implemented by the store
    pub fn with_defaults() -> Mechanisms {
        let mut mechs = Mechanisms::new();
        crate::rsa::register(&mut mechs);
        mechs
    }

    pub fn add_mechanism(
        &mut self,
        typ: CK_MECHANISM_TYPE,
        info: Box<dyn Mechanism>,
    ) {
        self.tree.insert(typ, info);
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn list(&self) -> Vec<CK_MECHANISM_TYPE> {
        self.tree.keys().cloned().collect()
    }

    pub fn info(&self, typ: CK_MECHANISM_TYPE) -> Option<&CK_MECHANISM_INFO> {
        self.tree.get(&typ).map(|m| m.info())
    }

    pub fn get(&self, typ: CK_MECHANISM_TYPE) -> Result<&dyn Mechanism> {
        match self.tree.get(&typ) {
            Some(m) => Ok(m.as_ref()),
            None => Err(Error::with_errmsg(
                ErrorKind::MechanismInvalid,
                format!("mechanism {:#x}", typ),
            )),
        }
    }
}

pub trait MechOperation: Debug + Send + Sync {
    fn mechanism(&self) -> CK_MECHANISM_TYPE;
    fn finalized(&self) -> bool;
}

/// Single shot decryption
///
/// The length query performs the actual decryption, the plaintext is
/// kept until it is copied out by `decrypt_final`.
pub trait Decryption: MechOperation {
    fn decryption_len(&mut self, cipher: &[u8]) -> Result<usize>;
    fn decrypt_final(&mut self, plain: &mut [u8]) -> Result<usize>;
}

/// Single shot signature over caller hashed data
pub trait Sign: MechOperation {
    fn signature_len(&self) -> Result<usize>;
    fn sign(&mut self, data: &[u8], signature: &mut [u8]) -> Result<usize>;
}
