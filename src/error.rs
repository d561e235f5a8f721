// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

//! Error type shared by every module of the store.
//!
//! Each [ErrorKind] maps onto a Cryptoki return value through
//! [Error::rv], so a token front end can report store failures verbatim.

use std::error;
use std::fmt;

use crate::pkcs11::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: Option<Box<dyn error::Error + Send + Sync>>,
    errmsg: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /* Malformed or truncated ASN.1 / PEM input */
    BadEncoding,
    /* PKCS#8 wrapper carries a non RSA algorithm */
    UnsupportedAlgorithm,
    /* Operation requested on the wrong class or key type */
    KeyTypeInconsistent,
    /* Allocation failure */
    HostMemory,
    /* Internal cryptographic step failed */
    GeneralError,
    /* Attribute absent on lookup */
    NotFound,
    /* Unknown or stale object handle */
    InvalidHandle,
    BufferTooSmall,
    DataLenRange,
    OperationNotInitialized,
    /* Encrypted key used before login */
    NotLoggedIn,
    PinIncorrect,
    MechanismInvalid,
    /* Invalid configuration, see origin or errmsg */
    Config,
    /* File access failure, see origin */
    Io,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadEncoding => "bad encoding",
            ErrorKind::UnsupportedAlgorithm => "unsupported algorithm",
            ErrorKind::KeyTypeInconsistent => "key type inconsistent",
            ErrorKind::HostMemory => "host memory",
            ErrorKind::GeneralError => "general error",
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidHandle => "invalid object handle",
            ErrorKind::BufferTooSmall => "buffer too small",
            ErrorKind::DataLenRange => "data length out of range",
            ErrorKind::OperationNotInitialized => "operation not initialized",
            ErrorKind::NotLoggedIn => "user not logged in",
            ErrorKind::PinIncorrect => "pin incorrect",
            ErrorKind::MechanismInvalid => "mechanism invalid",
            ErrorKind::Config => "configuration error",
            ErrorKind::Io => "i/o error",
        }
    }
}

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error {
            kind: kind,
            origin: None,
            errmsg: None,
        }
    }

    pub fn with_errmsg(kind: ErrorKind, errmsg: String) -> Error {
        Error {
            kind: kind,
            origin: None,
            errmsg: Some(errmsg),
        }
    }

    pub fn from_error<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: kind,
            origin: Some(error.into()),
            errmsg: None,
        }
    }

    pub fn not_found(errmsg: String) -> Error {
        Error::with_errmsg(ErrorKind::NotFound, errmsg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn attr_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Cryptoki return value for this error
    pub fn rv(&self) -> CK_RV {
        match self.kind {
            ErrorKind::BadEncoding => CKR_DATA_INVALID,
            ErrorKind::UnsupportedAlgorithm => CKR_FUNCTION_NOT_SUPPORTED,
            ErrorKind::KeyTypeInconsistent => CKR_KEY_TYPE_INCONSISTENT,
            ErrorKind::HostMemory => CKR_HOST_MEMORY,
            ErrorKind::GeneralError => CKR_GENERAL_ERROR,
            ErrorKind::NotFound => CKR_ATTRIBUTE_TYPE_INVALID,
            ErrorKind::InvalidHandle => CKR_OBJECT_HANDLE_INVALID,
            ErrorKind::BufferTooSmall => CKR_BUFFER_TOO_SMALL,
            ErrorKind::DataLenRange => CKR_DATA_LEN_RANGE,
            ErrorKind::OperationNotInitialized => {
                CKR_OPERATION_NOT_INITIALIZED
            }
            ErrorKind::NotLoggedIn => CKR_USER_NOT_LOGGED_IN,
            ErrorKind::PinIncorrect => CKR_PIN_INCORRECT,
            ErrorKind::MechanismInvalid => CKR_MECHANISM_INVALID,
            ErrorKind::Config => CKR_TOKEN_NOT_RECOGNIZED,
            ErrorKind::Io => CKR_DEVICE_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.errmsg, &self.origin) {
            (Some(e), _) => write!(f, "{}: {}", self.kind.as_str(), e),
            (None, Some(o)) => write!(f, "{}: {}", self.kind.as_str(), o),
            (None, None) => write!(f, "{}", self.kind.as_str()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.origin {
            Some(o) => Some(o.as_ref()),
            None => None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::new(kind)
    }
}

impl From<asn1::ParseError> for Error {
    fn from(error: asn1::ParseError) -> Error {
        Error::with_errmsg(ErrorKind::BadEncoding, error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::from_error(ErrorKind::Io, error)
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(error: std::collections::TryReserveError) -> Error {
        Error::from_error(ErrorKind::HostMemory, error)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Error {
        Error::from_error(ErrorKind::Config, error)
    }
}

impl From<pem::PemError> for Error {
    fn from(error: pem::PemError) -> Error {
        Error::from_error(ErrorKind::BadEncoding, error)
    }
}

#[macro_export]
macro_rules! err_kind {
    ($kind:expr) => {
        Err($crate::error::Error::new($kind))
    };
}

#[macro_export]
macro_rules! err_not_found {
    ($err_str:expr) => {
        Err($crate::error::Error::not_found($err_str))
    };
}
