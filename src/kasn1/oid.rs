// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! OIDs used by the store, as [asn1::ObjectIdentifier]s

/// rsaEncryption, from PKCS#1
pub const RSA_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 113549, 1, 1, 1);
