// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! RSA PKCS#1 v1.5 private key operations

use crate::codec::{copy_bytes, RsaPrivateKey};
use crate::error::{Error, ErrorKind, Result};
use crate::mechanism::*;
use crate::pkcs11::*;

use constant_time_eq::constant_time_eq;
use log::debug;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use zeroize::Zeroizing;

pub const MIN_RSA_SIZE_BITS: CK_ULONG = 384;
pub const MAX_RSA_SIZE_BITS: CK_ULONG = 16384;

/// Bytes taken by the PKCS#1 v1.5 padding, minimum
const PKCS1_PADDING_OVERHEAD: usize = 11;
/// Minimum length of the padding string
const PKCS1_MIN_PS_LEN: usize = 8;

#[derive(Debug)]
struct RsaPKCSMechanism {
    info: CK_MECHANISM_INFO,
}

impl Mechanism for RsaPKCSMechanism {
    fn info(&self) -> &CK_MECHANISM_INFO {
        &self.info
    }

    fn decryption_new(
        &self,
        mech: CK_MECHANISM_TYPE,
        key: RsaPrivateKey,
    ) -> Result<Box<dyn Decryption>> {
        if self.info.flags & CKF_DECRYPT != CKF_DECRYPT {
            return Err(ErrorKind::MechanismInvalid)?;
        }
        Ok(Box::new(RsaPKCSOperation::new(mech, key)?))
    }

    fn sign_new(
        &self,
        mech: CK_MECHANISM_TYPE,
        key: RsaPrivateKey,
    ) -> Result<Box<dyn Sign>> {
        if self.info.flags & CKF_SIGN != CKF_SIGN {
            return Err(ErrorKind::MechanismInvalid)?;
        }
        Ok(Box::new(RsaPKCSOperation::new(mech, key)?))
    }
}

pub fn register(mechs: &mut Mechanisms) {
    mechs.add_mechanism(
        CKM_RSA_PKCS,
        Box::new(RsaPKCSMechanism {
            info: CK_MECHANISM_INFO {
                ulMinKeySize: MIN_RSA_SIZE_BITS,
                ulMaxKeySize: MAX_RSA_SIZE_BITS,
                flags: CKF_DECRYPT | CKF_SIGN | CKF_SIGN_RECOVER,
            },
        }),
    );
}

/// The RSA private key operation, `c^d mod n`, using the CRT
/// parameters when the key carries them
///
/// The result is checked against the public key before being returned
/// and is left padded to `k` bytes.
fn rsa_private_op(
    key: &RsaPrivateKey,
    input: &[u8],
    k: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let n = BigUint::from_bytes_be(&key.modulus);
    let e = BigUint::from_bytes_be(&key.public_exponent);
    let c = BigUint::from_bytes_be(input);
    if c >= n {
        return Err(ErrorKind::DataLenRange)?;
    }

    let p = BigUint::from_bytes_be(&key.prime1);
    let q = BigUint::from_bytes_be(&key.prime2);
    let dp = BigUint::from_bytes_be(&key.exponent1);
    let dq = BigUint::from_bytes_be(&key.exponent2);
    let qinv = BigUint::from_bytes_be(&key.coefficient);

    let m = if p.is_zero() || q.is_zero() || dp.is_zero() || dq.is_zero() {
        let d = BigUint::from_bytes_be(&key.private_exponent);
        if d.is_zero() {
            return Err(ErrorKind::GeneralError)?;
        }
        c.modpow(&d, &n)
    } else {
        let m1 = c.modpow(&dp, &p);
        let m2 = c.modpow(&dq, &q);
        let m2p = m2.mod_floor(&p);
        let diff = if m1 >= m2p { m1 - m2p } else { m1 + &p - m2p };
        let h = (qinv * diff).mod_floor(&p);
        m2 + h * &q
    };

    /* guards against faults and inconsistent CRT parameters */
    let check = m.modpow(&e, &n).to_bytes_be();
    if !constant_time_eq(&check, &c.to_bytes_be()) {
        debug!("RSA private operation failed the public key check");
        return Err(ErrorKind::GeneralError)?;
    }

    let raw = Zeroizing::new(m.to_bytes_be());
    if raw.len() > k {
        return Err(ErrorKind::GeneralError)?;
    }
    let mut out = Zeroizing::new(Vec::new());
    out.try_reserve_exact(k)?;
    out.resize(k - raw.len(), 0);
    out.extend_from_slice(&raw);
    Ok(out)
}

/// EMSA-PKCS1-v1_5 block type 1: 00 01 FF..FF 00 D
fn pkcs1_pad_type1(data: &[u8], k: usize) -> Result<Zeroizing<Vec<u8>>> {
    if k < PKCS1_PADDING_OVERHEAD || data.len() > k - PKCS1_PADDING_OVERHEAD
    {
        return Err(ErrorKind::DataLenRange)?;
    }
    let mut em = Zeroizing::new(Vec::new());
    em.try_reserve_exact(k)?;
    em.push(0x00);
    em.push(0x01);
    em.resize(k - data.len() - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(data);
    Ok(em)
}

/// 1 when `b` is zero, 0 otherwise
fn ct_is_zero(b: u8) -> u8 {
    ((u16::from(b).wrapping_sub(1) >> 8) as u8) & 1
}

/// RSAES-PKCS1-v1_5 block type 2: 00 02 PS 00 M, returns M
///
/// The whole block is scanned and every check folded into one flag, the
/// only branch is on the final verdict.
fn pkcs1_unpad_type2(em: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if em.len() < PKCS1_PADDING_OVERHEAD {
        return Err(ErrorKind::GeneralError)?;
    }
    let mut bad = em[0] | (em[1] ^ 0x02);
    let mut looking: u8 = 1;
    let mut sep: usize = 0;
    for (i, b) in em.iter().enumerate().skip(2) {
        let zero = ct_is_zero(*b);
        let found = looking & zero;
        sep |= usize::from(found).wrapping_neg() & i;
        looking &= zero ^ 1;
    }
    /* no separator, or fewer than 8 padding bytes before it */
    let short = sep.wrapping_sub(2 + PKCS1_MIN_PS_LEN) >> (usize::BITS - 1);
    bad |= looking | (short as u8);
    if bad != 0 {
        return Err(ErrorKind::GeneralError)?;
    }
    Ok(Zeroizing::new(copy_bytes(&em[sep + 1..])?))
}

/// A single decrypt or sign operation bound to a decoded private key
///
/// The key and any plaintext are wiped when the operation is dropped.
#[derive(Debug)]
pub struct RsaPKCSOperation {
    mech: CK_MECHANISM_TYPE,
    key: RsaPrivateKey,
    output_len: usize,
    /// The ciphertext `plaintext` was recovered from
    ciphertext: Vec<u8>,
    plaintext: Option<Zeroizing<Vec<u8>>>,
    finalized: bool,
}

impl RsaPKCSOperation {
    pub fn new(
        mech: CK_MECHANISM_TYPE,
        key: RsaPrivateKey,
    ) -> Result<RsaPKCSOperation> {
        if mech != CKM_RSA_PKCS {
            return Err(ErrorKind::MechanismInvalid)?;
        }
        let output_len = key.private_modulus_len();
        if output_len < PKCS1_PADDING_OVERHEAD {
            return Err(Error::with_errmsg(
                ErrorKind::KeyTypeInconsistent,
                format!("modulus of {} bytes is too short", output_len),
            ));
        }
        Ok(RsaPKCSOperation {
            mech: mech,
            key: key,
            output_len: output_len,
            ciphertext: Vec::new(),
            plaintext: None,
            finalized: false,
        })
    }
}

impl MechOperation for RsaPKCSOperation {
    fn mechanism(&self) -> CK_MECHANISM_TYPE {
        self.mech
    }

    fn finalized(&self) -> bool {
        self.finalized
    }
}

impl Decryption for RsaPKCSOperation {
    fn decryption_len(&mut self, cipher: &[u8]) -> Result<usize> {
        if self.finalized {
            return Err(ErrorKind::OperationNotInitialized)?;
        }
        if let Some(p) = &self.plaintext {
            if self.ciphertext == cipher {
                return Ok(p.len());
            }
        }
        /* a new input always replaces the previous result */
        self.plaintext = None;
        self.ciphertext.clear();
        if cipher.len() != self.output_len {
            return Err(ErrorKind::DataLenRange)?;
        }
        /* operate on a private copy, never on the caller buffer */
        let input = copy_bytes(cipher)?;
        let em = rsa_private_op(&self.key, &input, self.output_len)?;
        let plain = pkcs1_unpad_type2(&em)?;
        let len = plain.len();
        self.ciphertext = input;
        self.plaintext = Some(plain);
        Ok(len)
    }

    fn decrypt_final(&mut self, plain: &mut [u8]) -> Result<usize> {
        if self.finalized {
            return Err(ErrorKind::OperationNotInitialized)?;
        }
        let len = match &self.plaintext {
            Some(p) => {
                if plain.len() < p.len() {
                    return Err(ErrorKind::BufferTooSmall)?;
                }
                plain[..p.len()].copy_from_slice(p);
                p.len()
            }
            None => {
                return Err(Error::with_errmsg(
                    ErrorKind::GeneralError,
                    "decryption length was not queried".to_string(),
                ))
            }
        };
        self.plaintext = None;
        self.ciphertext.clear();
        self.finalized = true;
        Ok(len)
    }
}

impl Sign for RsaPKCSOperation {
    fn signature_len(&self) -> Result<usize> {
        Ok(self.output_len)
    }

    fn sign(&mut self, data: &[u8], signature: &mut [u8]) -> Result<usize> {
        if self.finalized {
            return Err(ErrorKind::OperationNotInitialized)?;
        }
        if signature.len() < self.output_len {
            return Err(ErrorKind::BufferTooSmall)?;
        }
        let em = pkcs1_pad_type1(data, self.output_len)?;
        let sig = rsa_private_op(&self.key, &em, self.output_len)?;
        signature[..self.output_len].copy_from_slice(&sig);
        self.finalized = true;
        Ok(self.output_len)
    }
}
