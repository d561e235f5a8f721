// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

/* misc utilities that do not really belong in any module */
use crate::pkcs11::*;

use md5::Md5;
use sha1::{Digest, Sha1};

/// Key size in bits from a length in bytes
pub fn bytes_to_bits(len: usize) -> CK_ULONG {
    match CK_ULONG::try_from(len) {
        Ok(l) => l.saturating_mul(8),
        Err(_) => CK_UNAVAILABLE_INFORMATION,
    }
}

pub fn sha1_digest(data: &[u8]) -> Vec<u8> {
    Sha1::digest(data).to_vec()
}

pub fn md5_digest(data: &[u8]) -> Vec<u8> {
    Md5::digest(data).to_vec()
}
