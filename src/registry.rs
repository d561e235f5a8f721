// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! The object registry: the authoritative store of every object loaded
//! from PEM/DER files.
//!
//! Objects are addressed by opaque handles. Lookups and searches take a
//! shared lock, insertion, removal and reset take the exclusive lock, so
//! readers never observe a partially built object.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::attribute::Attribute;
use crate::error::{Error, ErrorKind, Result};
use crate::loader::KeyDecryptor;
use crate::object::{NewObject, ObjectType, PemObject};
use crate::pkcs11::*;

use bimap;
use log::{debug, warn};

/// Manages object handles and their mapping to identity keys
#[derive(Debug)]
pub struct Handles {
    /// Bidirectional map for handle <-> identity key lookups.
    map: bimap::hash::BiHashMap<CK_OBJECT_HANDLE, String>,
    /// The next available object handle ID.
    next: CK_OBJECT_HANDLE,
}

impl Handles {
    /// Creates a new, empty handle manager.
    pub fn new() -> Handles {
        Handles {
            map: bimap::hash::BiHashMap::new(),
            next: 1,
        }
    }

    /// Inserts a new handle-identity mapping.
    /// Fails if the handle or the identity already exists.
    pub fn insert(
        &mut self,
        handle: CK_OBJECT_HANDLE,
        value: String,
    ) -> Result<()> {
        match self.map.insert_no_overwrite(handle, value) {
            Ok(()) => Ok(()),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    /// Gets the identity associated with a given handle.
    pub fn get(&self, handle: CK_OBJECT_HANDLE) -> Option<&String> {
        self.map.get_by_left(&handle)
    }

    /// Gets the handle associated with a given identity.
    pub fn get_by_identity(&self, id: &str) -> Option<CK_OBJECT_HANDLE> {
        self.map.get_by_right(id).copied()
    }

    /// Removes a mapping by handle.
    pub fn remove(&mut self, handle: CK_OBJECT_HANDLE) {
        let _ = self.map.remove_by_left(&handle);
    }

    /// Drops every mapping, handles already given out are never reused
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns the next available unique handle ID and increments the
    /// internal counter.
    pub fn next(&mut self) -> CK_OBJECT_HANDLE {
        let next = self.next;
        self.next += 1;
        next
    }
}

/// Restricts a search beyond the attribute template
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFilter {
    pub slot: Option<CK_SLOT_ID>,
    pub otype: Option<ObjectType>,
}

impl SearchFilter {
    fn accepts(&self, obj: &PemObject) -> bool {
        if let Some(s) = self.slot {
            if obj.get_slot() != s {
                return false;
            }
        }
        match self.otype {
            Some(t) => obj.get_type() == t,
            None => true,
        }
    }
}

#[derive(Debug)]
struct Inner {
    handles: Handles,
    /// Handles in insertion order
    order: Vec<CK_OBJECT_HANDLE>,
    objects: HashMap<CK_OBJECT_HANDLE, PemObject>,
}

impl Inner {
    fn get(&self, handle: CK_OBJECT_HANDLE) -> Result<&PemObject> {
        match self.objects.get(&handle) {
            Some(o) => Ok(o),
            None => Err(ErrorKind::InvalidHandle)?,
        }
    }

    fn remove(&mut self, handle: CK_OBJECT_HANDLE) {
        if self.objects.remove(&handle).is_some() {
            self.handles.remove(handle);
            self.order.retain(|h| *h != handle);
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            inner: RwLock::new(Inner {
                handles: Handles::new(),
                order: Vec::new(),
                objects: HashMap::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        match self.inner.read() {
            Ok(r) => Ok(r),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        match self.inner.write() {
            Ok(w) => Ok(w),
            Err(_) => Err(ErrorKind::GeneralError)?,
        }
    }

    /// Publishes a fully built object
    ///
    /// When an object with the same identity key exists and is complete
    /// its handle is returned with a new reference and `false`. An
    /// incomplete one is superseded in place, keeping handle and
    /// reference count.
    pub fn insert_object(
        &self,
        obj: PemObject,
    ) -> Result<(CK_OBJECT_HANDLE, bool)> {
        let mut inner = self.write()?;
        if let Some(handle) = inner.handles.get_by_identity(obj.get_identity())
        {
            let existing = inner.get(handle)?;
            if existing.is_complete() || !obj.is_complete() {
                existing.retain();
                debug!(
                    "Object {} already present as handle {}",
                    obj.get_name(),
                    handle
                );
                return Ok((handle, false));
            }
            let refs = existing.get_refcount();
            /* the new object starts at one reference */
            for _ in 1..refs {
                obj.retain();
            }
            debug!("Object {} supersedes handle {}", obj.get_name(), handle);
            inner.objects.insert(handle, obj);
            return Ok((handle, true));
        }
        let handle = inner.handles.next();
        inner.handles.insert(handle, obj.get_identity().to_string())?;
        debug!("Adding object {} as handle {}", obj.get_name(), handle);
        inner.order.push(handle);
        inner.objects.insert(handle, obj);
        Ok((handle, true))
    }

    /// Builds an object from DER data and inserts it
    pub fn insert(&self, new: NewObject) -> Result<(CK_OBJECT_HANDLE, bool)> {
        let obj = new.build()?;
        self.insert_object(obj)
    }

    /// Inserts a placeholder object owning one subordinate per entry
    ///
    /// Entries that fail to build are logged and left out, a group with
    /// no subordinates left is an error.
    pub fn insert_group(
        &self,
        slot: CK_SLOT_ID,
        name: &str,
        entries: Vec<NewObject>,
    ) -> Result<(CK_OBJECT_HANDLE, bool)> {
        let mut subordinates = Vec::with_capacity(entries.len());
        for (idx, e) in entries.into_iter().enumerate() {
            match e.build() {
                Ok(obj) => subordinates.push(obj),
                Err(err) => {
                    warn!("Skipping entry {} of {}: {}", idx, name, err)
                }
            }
        }
        self.insert_object(PemObject::new_group(slot, name, subordinates)?)
    }

    /// Inserts a static object made of the given attributes
    pub fn insert_raw(
        &self,
        slot: CK_SLOT_ID,
        name: &str,
        id: &str,
        attributes: Vec<Attribute>,
    ) -> Result<(CK_OBJECT_HANDLE, bool)> {
        self.insert_object(PemObject::new_raw(slot, name, id, attributes))
    }

    /// Returns the handles of every object matching the template, in
    /// insertion order
    pub fn find(
        &self,
        template: &[Attribute],
    ) -> Result<Vec<CK_OBJECT_HANDLE>> {
        self.find_filtered(&SearchFilter::default(), template)
    }

    pub fn find_filtered(
        &self,
        filter: &SearchFilter,
        template: &[Attribute],
    ) -> Result<Vec<CK_OBJECT_HANDLE>> {
        let inner = self.read()?;
        let mut handles = Vec::<CK_OBJECT_HANDLE>::new();
        for handle in &inner.order {
            let obj = match inner.objects.get(handle) {
                Some(o) => o,
                None => continue,
            };
            if filter.accepts(obj) && obj.match_template(template) {
                handles.push(*handle);
            }
        }
        Ok(handles)
    }

    /// Returns the attribute of an object, `NotFound` when the object
    /// does not expose it
    pub fn fetch_attribute(
        &self,
        handle: CK_OBJECT_HANDLE,
        t: CK_ATTRIBUTE_TYPE,
    ) -> Result<Attribute> {
        self.read()?.get(handle)?.get_attribute(t)
    }

    /// Runs `f` on the object while holding the shared lock
    pub fn with_object<R, F>(&self, handle: CK_OBJECT_HANDLE, f: F) -> Result<R>
    where
        F: FnOnce(&PemObject) -> Result<R>,
    {
        let inner = self.read()?;
        f(inner.get(handle)?)
    }

    pub fn retain(&self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        self.read()?.get(handle)?.retain();
        Ok(())
    }

    /// Drops a reference, the object is destroyed when none is left
    pub fn release(&self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        if self.read()?.get(handle)?.release() > 0 {
            return Ok(());
        }
        let mut inner = self.write()?;
        /* a reference may have been taken in between */
        let unused = match inner.objects.get(&handle) {
            Some(o) => o.get_refcount() == 0,
            None => false,
        };
        if unused {
            debug!("Destroying object handle {}", handle);
            inner.remove(handle);
        }
        Ok(())
    }

    pub fn get_object_count(&self) -> Result<usize> {
        Ok(self.read()?.objects.len())
    }

    /// Destroys every object regardless of reference counts
    ///
    /// Handles held by callers become invalid; they are never handed out
    /// again.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.write()?;
        let count = inner.objects.len();
        inner.objects.clear();
        inner.order.clear();
        inner.handles.clear();
        debug!("Registry reset, {} objects destroyed", count);
        Ok(())
    }

    /// Decrypts every encrypted key of a slot, returns how many keys
    /// were unlocked
    pub fn login(
        &self,
        slot: CK_SLOT_ID,
        decryptor: &dyn KeyDecryptor,
    ) -> Result<usize> {
        let inner = self.read()?;
        let mut count = 0;
        for handle in &inner.order {
            let obj = match inner.objects.get(handle) {
                Some(o) => o,
                None => continue,
            };
            if obj.get_slot() != slot {
                continue;
            }
            let keys: Vec<_> = if obj.get_subordinates().is_empty() {
                obj.get_key_params().into_iter().collect()
            } else {
                obj.get_subordinates()
                    .iter()
                    .filter_map(|s| s.get_key_params())
                    .collect()
            };
            for k in keys {
                if !k.is_encrypted() {
                    continue;
                }
                if let Err(e) = k.login(decryptor) {
                    warn!("Failed to unlock key {}: {}", obj.get_name(), e);
                    return Err(e);
                }
                count += 1;
            }
        }
        Ok(count)
    }

    /// Materializes the modulus and public exponent of a private key
    pub fn populate_modulus_exponent(
        &self,
        handle: CK_OBJECT_HANDLE,
    ) -> Result<()> {
        self.with_object(handle, |obj| match obj.get_key_params() {
            Some(k) => {
                k.get_numbers()?;
                Ok(())
            }
            None => Err(Error::with_errmsg(
                ErrorKind::KeyTypeInconsistent,
                format!("object {} holds no private key", obj.get_name()),
            )),
        })
    }
}
