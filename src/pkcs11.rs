// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

//! Subset of the Cryptoki (PKCS#11 v2.40) and NSS vendor definitions used
//! by the PEM object store.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]

pub type CK_ULONG = std::os::raw::c_ulong;
pub type CK_BBOOL = u8;
pub type CK_RV = CK_ULONG;
pub type CK_FLAGS = CK_ULONG;
pub type CK_SLOT_ID = CK_ULONG;
pub type CK_OBJECT_HANDLE = CK_ULONG;
pub type CK_OBJECT_CLASS = CK_ULONG;
pub type CK_ATTRIBUTE_TYPE = CK_ULONG;
pub type CK_KEY_TYPE = CK_ULONG;
pub type CK_CERTIFICATE_TYPE = CK_ULONG;
pub type CK_MECHANISM_TYPE = CK_ULONG;
pub type CK_TRUST = CK_ULONG;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CK_MECHANISM_INFO {
    pub ulMinKeySize: CK_ULONG,
    pub ulMaxKeySize: CK_ULONG,
    pub flags: CK_FLAGS,
}

pub const CK_TRUE: CK_BBOOL = 1;
pub const CK_FALSE: CK_BBOOL = 0;
pub const CK_INVALID_HANDLE: CK_OBJECT_HANDLE = 0;
pub const CK_UNAVAILABLE_INFORMATION: CK_ULONG = CK_ULONG::MAX;

/* Return values */
pub const CKR_OK: CK_RV = 0x0000;
pub const CKR_HOST_MEMORY: CK_RV = 0x0002;
pub const CKR_GENERAL_ERROR: CK_RV = 0x0005;
pub const CKR_FUNCTION_FAILED: CK_RV = 0x0006;
pub const CKR_ARGUMENTS_BAD: CK_RV = 0x0007;
pub const CKR_ATTRIBUTE_SENSITIVE: CK_RV = 0x0011;
pub const CKR_ATTRIBUTE_TYPE_INVALID: CK_RV = 0x0012;
pub const CKR_ATTRIBUTE_VALUE_INVALID: CK_RV = 0x0013;
pub const CKR_DATA_INVALID: CK_RV = 0x0020;
pub const CKR_DATA_LEN_RANGE: CK_RV = 0x0021;
pub const CKR_DEVICE_ERROR: CK_RV = 0x0030;
pub const CKR_ENCRYPTED_DATA_INVALID: CK_RV = 0x0040;
pub const CKR_ENCRYPTED_DATA_LEN_RANGE: CK_RV = 0x0041;
pub const CKR_FUNCTION_NOT_SUPPORTED: CK_RV = 0x0054;
pub const CKR_KEY_TYPE_INCONSISTENT: CK_RV = 0x0063;
pub const CKR_MECHANISM_INVALID: CK_RV = 0x0070;
pub const CKR_OBJECT_HANDLE_INVALID: CK_RV = 0x0082;
pub const CKR_OPERATION_NOT_INITIALIZED: CK_RV = 0x0091;
pub const CKR_PIN_INCORRECT: CK_RV = 0x00A0;
pub const CKR_TOKEN_NOT_RECOGNIZED: CK_RV = 0x00E1;
pub const CKR_USER_NOT_LOGGED_IN: CK_RV = 0x0101;
pub const CKR_BUFFER_TOO_SMALL: CK_RV = 0x0150;

/* Object classes */
pub const CKO_DATA: CK_OBJECT_CLASS = 0x0000;
pub const CKO_CERTIFICATE: CK_OBJECT_CLASS = 0x0001;
pub const CKO_PUBLIC_KEY: CK_OBJECT_CLASS = 0x0002;
pub const CKO_PRIVATE_KEY: CK_OBJECT_CLASS = 0x0003;
pub const CKO_SECRET_KEY: CK_OBJECT_CLASS = 0x0004;
pub const CKO_VENDOR_DEFINED: CK_OBJECT_CLASS = 0x8000_0000;

/* Key types */
pub const CKK_RSA: CK_KEY_TYPE = 0x0000;
pub const CKK_DSA: CK_KEY_TYPE = 0x0001;
pub const CKK_EC: CK_KEY_TYPE = 0x0003;

/* Certificate types */
pub const CKC_X_509: CK_CERTIFICATE_TYPE = 0x0000;

/* Attributes */
pub const CKA_CLASS: CK_ATTRIBUTE_TYPE = 0x0000;
pub const CKA_TOKEN: CK_ATTRIBUTE_TYPE = 0x0001;
pub const CKA_PRIVATE: CK_ATTRIBUTE_TYPE = 0x0002;
pub const CKA_LABEL: CK_ATTRIBUTE_TYPE = 0x0003;
pub const CKA_APPLICATION: CK_ATTRIBUTE_TYPE = 0x0010;
pub const CKA_VALUE: CK_ATTRIBUTE_TYPE = 0x0011;
pub const CKA_OBJECT_ID: CK_ATTRIBUTE_TYPE = 0x0012;
pub const CKA_CERTIFICATE_TYPE: CK_ATTRIBUTE_TYPE = 0x0080;
pub const CKA_ISSUER: CK_ATTRIBUTE_TYPE = 0x0081;
pub const CKA_SERIAL_NUMBER: CK_ATTRIBUTE_TYPE = 0x0082;
pub const CKA_TRUSTED: CK_ATTRIBUTE_TYPE = 0x0086;
pub const CKA_KEY_TYPE: CK_ATTRIBUTE_TYPE = 0x0100;
pub const CKA_SUBJECT: CK_ATTRIBUTE_TYPE = 0x0101;
pub const CKA_ID: CK_ATTRIBUTE_TYPE = 0x0102;
pub const CKA_SENSITIVE: CK_ATTRIBUTE_TYPE = 0x0103;
pub const CKA_ENCRYPT: CK_ATTRIBUTE_TYPE = 0x0104;
pub const CKA_DECRYPT: CK_ATTRIBUTE_TYPE = 0x0105;
pub const CKA_WRAP: CK_ATTRIBUTE_TYPE = 0x0106;
pub const CKA_UNWRAP: CK_ATTRIBUTE_TYPE = 0x0107;
pub const CKA_SIGN: CK_ATTRIBUTE_TYPE = 0x0108;
pub const CKA_SIGN_RECOVER: CK_ATTRIBUTE_TYPE = 0x0109;
pub const CKA_VERIFY: CK_ATTRIBUTE_TYPE = 0x010A;
pub const CKA_VERIFY_RECOVER: CK_ATTRIBUTE_TYPE = 0x010B;
pub const CKA_DERIVE: CK_ATTRIBUTE_TYPE = 0x010C;
pub const CKA_MODULUS: CK_ATTRIBUTE_TYPE = 0x0120;
pub const CKA_MODULUS_BITS: CK_ATTRIBUTE_TYPE = 0x0121;
pub const CKA_PUBLIC_EXPONENT: CK_ATTRIBUTE_TYPE = 0x0122;
pub const CKA_PRIVATE_EXPONENT: CK_ATTRIBUTE_TYPE = 0x0123;
pub const CKA_PRIME_1: CK_ATTRIBUTE_TYPE = 0x0124;
pub const CKA_PRIME_2: CK_ATTRIBUTE_TYPE = 0x0125;
pub const CKA_EXPONENT_1: CK_ATTRIBUTE_TYPE = 0x0126;
pub const CKA_EXPONENT_2: CK_ATTRIBUTE_TYPE = 0x0127;
pub const CKA_COEFFICIENT: CK_ATTRIBUTE_TYPE = 0x0128;
pub const CKA_PUBLIC_KEY_INFO: CK_ATTRIBUTE_TYPE = 0x0129;
pub const CKA_EXTRACTABLE: CK_ATTRIBUTE_TYPE = 0x0162;
pub const CKA_MODIFIABLE: CK_ATTRIBUTE_TYPE = 0x0170;
pub const CKA_VENDOR_DEFINED: CK_ATTRIBUTE_TYPE = 0x8000_0000;

/* Mechanisms */
pub const CKM_RSA_PKCS: CK_MECHANISM_TYPE = 0x0001;
pub const CKM_RSA_X_509: CK_MECHANISM_TYPE = 0x0003;

/* Mechanism flags */
pub const CKF_ENCRYPT: CK_FLAGS = 0x0000_0100;
pub const CKF_DECRYPT: CK_FLAGS = 0x0000_0200;
pub const CKF_SIGN: CK_FLAGS = 0x0000_0800;
pub const CKF_SIGN_RECOVER: CK_FLAGS = 0x0000_1000;

/* ======================================================================= *
 * ========================= NSS VENDOR VALUES =========================== *
 * ======================================================================= */

pub const NSSCK_VENDOR_NSS: CK_ULONG = 0x4E53_4350;

pub const CKO_NSS: CK_OBJECT_CLASS = CKO_VENDOR_DEFINED | NSSCK_VENDOR_NSS;
pub const CKO_NSS_TRUST: CK_OBJECT_CLASS = CKO_NSS + 3;
pub const CKO_NSS_BUILTIN_ROOT_LIST: CK_OBJECT_CLASS = CKO_NSS + 4;

pub const CKA_NSS: CK_ATTRIBUTE_TYPE = CKA_VENDOR_DEFINED | NSSCK_VENDOR_NSS;
pub const CKA_TRUST: CK_ATTRIBUTE_TYPE = CKA_NSS + 0x2000;
pub const CKA_TRUST_DIGITAL_SIGNATURE: CK_ATTRIBUTE_TYPE = CKA_TRUST + 1;
pub const CKA_TRUST_NON_REPUDIATION: CK_ATTRIBUTE_TYPE = CKA_TRUST + 2;
pub const CKA_TRUST_KEY_ENCIPHERMENT: CK_ATTRIBUTE_TYPE = CKA_TRUST + 3;
pub const CKA_TRUST_DATA_ENCIPHERMENT: CK_ATTRIBUTE_TYPE = CKA_TRUST + 4;
pub const CKA_TRUST_KEY_AGREEMENT: CK_ATTRIBUTE_TYPE = CKA_TRUST + 5;
pub const CKA_TRUST_KEY_CERT_SIGN: CK_ATTRIBUTE_TYPE = CKA_TRUST + 6;
pub const CKA_TRUST_CRL_SIGN: CK_ATTRIBUTE_TYPE = CKA_TRUST + 7;
pub const CKA_TRUST_SERVER_AUTH: CK_ATTRIBUTE_TYPE = CKA_TRUST + 8;
pub const CKA_TRUST_CLIENT_AUTH: CK_ATTRIBUTE_TYPE = CKA_TRUST + 9;
pub const CKA_TRUST_CODE_SIGNING: CK_ATTRIBUTE_TYPE = CKA_TRUST + 10;
pub const CKA_TRUST_EMAIL_PROTECTION: CK_ATTRIBUTE_TYPE = CKA_TRUST + 11;
pub const CKA_TRUST_STEP_UP_APPROVED: CK_ATTRIBUTE_TYPE = CKA_TRUST + 16;
pub const CKA_CERT_SHA1_HASH: CK_ATTRIBUTE_TYPE = CKA_TRUST + 100;
pub const CKA_CERT_MD5_HASH: CK_ATTRIBUTE_TYPE = CKA_TRUST + 101;

pub const CKT_VENDOR_DEFINED: CK_TRUST = 0x8000_0000;
pub const CKT_NSS: CK_TRUST = CKT_VENDOR_DEFINED | NSSCK_VENDOR_NSS;
pub const CKT_NSS_TRUSTED: CK_TRUST = CKT_NSS + 1;
pub const CKT_NSS_TRUSTED_DELEGATOR: CK_TRUST = CKT_NSS + 2;
pub const CKT_NSS_MUST_VERIFY_TRUST: CK_TRUST = CKT_NSS + 3;
pub const CKT_NSS_NOT_TRUSTED: CK_TRUST = CKT_NSS + 10;
