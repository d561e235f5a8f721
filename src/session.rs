// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! A crypto operation bound to one private key object of the registry

use crate::codec::{decode_rsa_private_key, RsaPrivateKey};
use crate::error::{Error, ErrorKind, Result};
use crate::mechanism::{Decryption, Mechanisms, Sign};
use crate::pkcs11::*;
use crate::registry::Registry;

use log::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    LengthQueried,
    Finished,
}

#[derive(Debug)]
enum Operation {
    Decrypt(Box<dyn Decryption>),
    Sign(Box<dyn Sign>),
}

/// One single shot sign or decrypt operation
///
/// The key object is retained for as long as the session lives and
/// released when it is dropped. The decoded private key is owned by the
/// operation and wiped with it.
#[derive(Debug)]
pub struct CryptoSession<'a> {
    registry: &'a Registry,
    handle: CK_OBJECT_HANDLE,
    operation: Operation,
    state: SessionState,
}

impl<'a> CryptoSession<'a> {
    fn init<F>(
        registry: &'a Registry,
        handle: CK_OBJECT_HANDLE,
        new_op: F,
    ) -> Result<CryptoSession<'a>>
    where
        F: FnOnce(RsaPrivateKey) -> Result<Operation>,
    {
        let operation = registry.with_object(handle, |obj| {
            if obj.get_class() != CKO_PRIVATE_KEY {
                return Err(Error::with_errmsg(
                    ErrorKind::KeyTypeInconsistent,
                    format!("object {} is not a private key", obj.get_name()),
                ));
            }
            let params = match obj.get_key_params() {
                Some(p) => p,
                None => return Err(ErrorKind::KeyTypeInconsistent)?,
            };
            let key = decode_rsa_private_key(params.get_der()?)?;
            if !params.has_numbers() {
                params.get_numbers()?;
            }
            let op = new_op(key)?;
            obj.retain();
            Ok(op)
        })?;
        debug!("Started operation on object handle {}", handle);
        Ok(CryptoSession {
            registry: registry,
            handle: handle,
            operation: operation,
            state: SessionState::Created,
        })
    }

    pub fn decrypt_init(
        registry: &'a Registry,
        mechanisms: &Mechanisms,
        mech: CK_MECHANISM_TYPE,
        handle: CK_OBJECT_HANDLE,
    ) -> Result<CryptoSession<'a>> {
        let m = mechanisms.get(mech)?;
        Self::init(registry, handle, |key| {
            Ok(Operation::Decrypt(m.decryption_new(mech, key)?))
        })
    }

    pub fn sign_init(
        registry: &'a Registry,
        mechanisms: &Mechanisms,
        mech: CK_MECHANISM_TYPE,
        handle: CK_OBJECT_HANDLE,
    ) -> Result<CryptoSession<'a>> {
        let m = mechanisms.get(mech)?;
        Self::init(registry, handle, |key| {
            Ok(Operation::Sign(m.sign_new(mech, key)?))
        })
    }

    /// With PKCS#1 v1.5 padding a signature with recovery is the same
    /// operation as a plain signature
    pub fn sign_recover_init(
        registry: &'a Registry,
        mechanisms: &Mechanisms,
        mech: CK_MECHANISM_TYPE,
        handle: CK_OBJECT_HANDLE,
    ) -> Result<CryptoSession<'a>> {
        let m = mechanisms.get(mech)?;
        if m.info().flags & CKF_SIGN_RECOVER != CKF_SIGN_RECOVER {
            return Err(ErrorKind::MechanismInvalid)?;
        }
        Self::sign_init(registry, mechanisms, mech, handle)
    }

    pub fn get_handle(&self) -> CK_OBJECT_HANDLE {
        self.handle
    }

    pub fn get_state(&self) -> SessionState {
        self.state
    }

    /// Decrypts `ciphertext` and returns the plaintext length
    ///
    /// The plaintext is cached until [CryptoSession::finish] is called.
    pub fn operation_length(&mut self, ciphertext: &[u8]) -> Result<usize> {
        if self.state == SessionState::Finished {
            return Err(ErrorKind::OperationNotInitialized)?;
        }
        match &mut self.operation {
            Operation::Decrypt(op) => {
                let len = op.decryption_len(ciphertext)?;
                self.state = SessionState::LengthQueried;
                Ok(len)
            }
            Operation::Sign(_) => Err(ErrorKind::OperationNotInitialized)?,
        }
    }

    /// The signature length, equal to the modulus size in bytes
    pub fn final_length(&self) -> Result<usize> {
        if self.state == SessionState::Finished {
            return Err(ErrorKind::OperationNotInitialized)?;
        }
        match &self.operation {
            Operation::Sign(op) => op.signature_len(),
            Operation::Decrypt(_) => Err(ErrorKind::OperationNotInitialized)?,
        }
    }

    /// Completes the operation, returns the number of bytes written to
    /// `output`
    ///
    /// For a decryption `input` is ignored: the ciphertext was consumed
    /// by [CryptoSession::operation_length].
    pub fn finish(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let len = match (self.state, &mut self.operation) {
            (SessionState::Finished, _) => {
                return Err(ErrorKind::OperationNotInitialized)?;
            }
            (SessionState::Created, Operation::Decrypt(_)) => {
                return Err(Error::with_errmsg(
                    ErrorKind::GeneralError,
                    "decryption length was not queried".to_string(),
                ));
            }
            (_, Operation::Decrypt(op)) => op.decrypt_final(output)?,
            (_, Operation::Sign(op)) => op.sign(input, output)?,
        };
        self.state = SessionState::Finished;
        Ok(len)
    }
}

impl Drop for CryptoSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.registry.release(self.handle) {
            error!("Failed to release object handle {}: {}", self.handle, e);
        }
    }
}
