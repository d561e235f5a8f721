// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! Private key material held by store objects

use std::fmt::Debug;

use crate::attribute::Attribute;
use crate::codec::{copy_bytes, decode_rsa_private_key};
use crate::error::{Error, ErrorKind, Result};
use crate::loader::{CipherInfo, KeyDecryptor};
use crate::misc::bytes_to_bits;
use crate::pkcs11::*;

use log::{debug, warn};
use once_cell::sync::OnceCell;
use zeroize::Zeroizing;

/// The numeric attributes of a key published by the first successful
/// decode
///
/// Only the public numbers are retained, the private ones are decoded
/// again by every crypto session and wiped when it ends.
#[derive(Debug, Clone)]
pub struct KeyNumbers {
    modulus: Attribute,
    public_exponent: Attribute,
    modulus_bits: Attribute,
    public_key_info: Attribute,
}

impl KeyNumbers {
    pub fn get_modulus(&self) -> &[u8] {
        self.modulus.get_value()
    }

    pub fn get_public_exponent(&self) -> &[u8] {
        self.public_exponent.get_value()
    }

    fn get(&self, t: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        match t {
            CKA_MODULUS => Some(&self.modulus),
            CKA_PUBLIC_EXPONENT => Some(&self.public_exponent),
            CKA_MODULUS_BITS => Some(&self.modulus_bits),
            CKA_PUBLIC_KEY_INFO => Some(&self.public_key_info),
            _ => None,
        }
    }
}

/// The encoded private key of an object, plus the values lazily
/// derived from it
pub struct KeyParameters {
    /// The DER as found in the file, possibly encrypted
    encoded: Zeroizing<Vec<u8>>,
    /// Legacy PEM encryption parameters, if the key is encrypted
    cipher: Option<CipherInfo>,
    /// Plaintext DER, set on login for encrypted keys
    decrypted: OnceCell<Zeroizing<Vec<u8>>>,
    numbers: OnceCell<KeyNumbers>,
    /// SubjectPublicKeyInfo of the certificate found with the key
    public_key_info: Option<Vec<u8>>,
}

impl Debug for KeyParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyParameters")
            .field("encrypted", &self.cipher.is_some())
            .field("decrypted", &self.decrypted.get().is_some())
            .field("numbers", &self.numbers.get())
            .finish_non_exhaustive()
    }
}

impl KeyParameters {
    pub fn new(
        encoded: &[u8],
        cipher: Option<CipherInfo>,
        public_key_info: Option<Vec<u8>>,
    ) -> Result<KeyParameters> {
        /* only RSA keys are exposed, encrypted ones are checked on login */
        if cipher.is_none() {
            decode_rsa_private_key(encoded)?;
        }
        Ok(KeyParameters {
            encoded: Zeroizing::new(copy_bytes(encoded)?),
            cipher: cipher,
            decrypted: OnceCell::new(),
            numbers: OnceCell::new(),
            public_key_info: public_key_info,
        })
    }

    /// The DER the key was loaded from
    pub fn get_encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Returns the plaintext DER of the key
    ///
    /// Encrypted keys are available only after [KeyParameters::login].
    pub fn get_der(&self) -> Result<&[u8]> {
        if self.cipher.is_none() {
            return Ok(&self.encoded);
        }
        match self.decrypted.get() {
            Some(d) => Ok(d.as_slice()),
            None => Err(ErrorKind::NotLoggedIn)?,
        }
    }

    /// Decrypts an encrypted key once; plaintext keys are left alone
    pub fn login(&self, decryptor: &dyn KeyDecryptor) -> Result<()> {
        let cipher = match &self.cipher {
            Some(c) => c,
            None => return Ok(()),
        };
        self.decrypted.get_or_try_init(|| {
            let plain = decryptor
                .decrypt(&self.encoded, cipher)
                .map_err(|e| Error::from_error(ErrorKind::PinIncorrect, e))?;
            /* a wrong passphrase usually shows as garbage DER */
            if let Err(e) = decode_rsa_private_key(&plain) {
                warn!("Decrypted key does not decode: {}", e);
                return Err(ErrorKind::PinIncorrect)?;
            }
            Ok::<_, Error>(Zeroizing::new(plain))
        })?;
        Ok(())
    }

    /// Returns the public numbers, decoding the key the first time
    pub fn get_numbers(&self) -> Result<&KeyNumbers> {
        self.numbers.get_or_try_init(|| {
            let key = decode_rsa_private_key(self.get_der()?)?;
            let bits = bytes_to_bits(key.private_modulus_len());
            let spki = match &self.public_key_info {
                Some(p) => p.clone(),
                None => key.public_key_info()?,
            };
            debug!("Populated key numbers ({} bits)", bits);
            Ok::<_, Error>(KeyNumbers {
                modulus: Attribute::from_bytes(
                    CKA_MODULUS,
                    copy_bytes(&key.modulus)?,
                ),
                public_exponent: Attribute::from_bytes(
                    CKA_PUBLIC_EXPONENT,
                    copy_bytes(&key.public_exponent)?,
                ),
                modulus_bits: Attribute::from_ulong(CKA_MODULUS_BITS, bits),
                public_key_info: Attribute::from_bytes(
                    CKA_PUBLIC_KEY_INFO,
                    spki,
                ),
            })
        })
    }

    /// Whether the numeric attributes were already published
    pub fn has_numbers(&self) -> bool {
        self.numbers.get().is_some()
    }

    /// Private key attributes, `subject` is set for keys found with a
    /// certificate
    pub fn get_attribute(
        &self,
        t: CK_ATTRIBUTE_TYPE,
        subject: Option<&[u8]>,
    ) -> Result<Attribute> {
        let bool_attr =
            |v: bool| -> Result<Attribute> { Ok(Attribute::from_bool(t, v)) };
        match t {
            CKA_KEY_TYPE => Ok(Attribute::from_ulong(t, CKK_RSA)),
            CKA_SENSITIVE | CKA_SIGN | CKA_SIGN_RECOVER | CKA_DECRYPT
            | CKA_UNWRAP => bool_attr(true),
            CKA_EXTRACTABLE | CKA_ENCRYPT | CKA_VERIFY
            | CKA_VERIFY_RECOVER | CKA_WRAP | CKA_DERIVE => bool_attr(false),
            CKA_SUBJECT => match subject {
                Some(s) => Ok(Attribute::from_bytes(t, s.to_vec())),
                None => Err(Error::not_found(format!("{:#x}", t))),
            },
            CKA_PUBLIC_KEY_INFO if self.public_key_info.is_some() => {
                Ok(Attribute::from_bytes(
                    t,
                    self.public_key_info.clone().unwrap_or_default(),
                ))
            }
            CKA_MODULUS | CKA_PUBLIC_EXPONENT | CKA_MODULUS_BITS
            | CKA_PUBLIC_KEY_INFO => {
                let numbers = match self.get_numbers() {
                    Ok(n) => n,
                    Err(e) => {
                        debug!("Key numbers unavailable: {}", e);
                        return Err(Error::not_found(format!("{:#x}", t)));
                    }
                };
                match numbers.get(t) {
                    Some(a) => Ok(a.clone()),
                    None => Err(Error::not_found(format!("{:#x}", t))),
                }
            }
            _ => Err(Error::not_found(format!("{:#x}", t))),
        }
    }
}

/// A private key found without a certificate
#[derive(Debug)]
pub struct KeyObject {
    pub params: KeyParameters,
}
