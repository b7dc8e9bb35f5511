//! Scopes and the arena that owns them
//!
//! A [`Scope`] is an insertion-ordered table of named [`Datum`]s. Scopes
//! form a tree: a child lives in a `Table` datum of its parent and records
//! the parent's handle. All scopes are stored in a [`ScopeArena`], which is
//! where every operation that touches more than one scope lives.
//!
//! Table datums are maintained by the arena. Once a table datum holds
//! scopes, the mutable accessors of [`Scope`] refuse it; children move and
//! leave only through the arena.

use crate::attributed::{Attributed, Reflected};
use crate::datum::{Datum, DatumRef, DatumType, RttiRef};
use crate::error::{ReflectError, Result};
use crate::factory::Factory;
use crate::signature::Signature;
use crate::type_manager::TypeManager;
use crate::THIS_KEY;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use void_core::{Handle, HandleMap, RttiId, RttiType};

/// Handle to a scope in a [`ScopeArena`]
pub type ScopeId = Handle<Scope>;

/// References resolved this many levels deep before falling back to identity
const REFERENCE_DEPTH: usize = 8;

/// Ordered attribute table
#[derive(Default)]
pub struct Scope {
    table: IndexMap<String, Datum>,
    parent: Option<ScopeId>,
    payload: Option<Rc<dyn Reflected>>,
    signatures: Option<Rc<[Signature]>>,
}

impl Scope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the datum named `key`
    pub fn append(&mut self, key: &str) -> Result<&mut Datum> {
        unmanaged(key, self.entry(key)?)
    }

    /// Get or create the datum named `key` with element type `datum_type`
    pub fn append_with_type(&mut self, key: &str, datum_type: DatumType) -> Result<&mut Datum> {
        unmanaged(key, self.entry_with_type(key, datum_type)?)
    }

    fn entry(&mut self, key: &str) -> Result<&mut Datum> {
        if key.is_empty() {
            return Err(ReflectError::InvalidArgument(String::from(
                "attribute key cannot be empty",
            )));
        }
        Ok(self.table.entry(key.to_string()).or_default())
    }

    /// Typed get-or-create without the table guard; the arena uses this to
    /// grow table datums
    pub(crate) fn entry_with_type(&mut self, key: &str, datum_type: DatumType) -> Result<&mut Datum> {
        if let Some(existing) = self.table.get(key) {
            let current = existing.datum_type();
            if current != DatumType::Unknown && current != datum_type {
                return Err(ReflectError::invalid_operation(format!(
                    "attribute '{}' is {}, not {}",
                    key, current, datum_type
                )));
            }
        }
        let datum = self.entry(key)?;
        if datum.datum_type() == DatumType::Unknown {
            datum.set_type(datum_type)?;
        }
        Ok(datum)
    }

    /// Append a user attribute; prescribed names are refused
    pub fn append_auxiliary_attribute(&mut self, key: &str) -> Result<&mut Datum> {
        if self.is_prescribed_attribute(key) {
            return Err(ReflectError::invalid_operation(format!(
                "'{}' is a prescribed attribute",
                key
            )));
        }
        self.append(key)
    }

    /// Datum named `key`
    pub fn find(&self, key: &str) -> Option<&Datum> {
        self.table.get(key)
    }

    /// Mutable datum named `key`. `None` also for a table datum that
    /// holds scopes.
    pub fn find_mut(&mut self, key: &str) -> Option<&mut Datum> {
        self.table
            .get_mut(key)
            .filter(|datum| !holds_scopes(datum))
    }

    /// Lookup that fails on a missing key
    pub fn at(&self, key: &str) -> Result<&Datum> {
        self.table
            .get(key)
            .ok_or_else(|| ReflectError::KeyNotFound(key.to_string()))
    }

    /// Mutable lookup that fails on a missing key or on a table datum
    /// holding scopes
    pub fn at_mut(&mut self, key: &str) -> Result<&mut Datum> {
        let datum = self
            .table
            .get_mut(key)
            .ok_or_else(|| ReflectError::KeyNotFound(key.to_string()))?;
        unmanaged(key, datum)
    }

    /// Datum at table position `index`
    pub fn at_index(&self, index: usize) -> Result<&Datum> {
        self.table
            .get_index(index)
            .map(|(_, datum)| datum)
            .ok_or(ReflectError::OutOfRange {
                index,
                size: self.table.len(),
            })
    }

    /// Mutable datum at table position `index`, under the same rules as
    /// [`Scope::at_mut`]
    pub fn at_index_mut(&mut self, index: usize) -> Result<&mut Datum> {
        let size = self.table.len();
        let (key, datum) = self
            .table
            .get_index_mut(index)
            .ok_or(ReflectError::OutOfRange { index, size })?;
        unmanaged(key, datum)
    }

    /// Key at table position `index`
    pub fn find_name(&self, index: usize) -> Option<&str> {
        self.table.get_index(index).map(|(key, _)| key.as_str())
    }

    /// Table position of `key`
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.table.get_index_of(key)
    }

    /// Key and element index under which `child` is stored
    pub fn find_scope(&self, child: ScopeId) -> Option<(&str, usize)> {
        self.table.iter().find_map(|(key, datum)| {
            datum
                .scopes()
                .iter()
                .position(|&id| id == child)
                .map(|index| (key.as_str(), index))
        })
    }

    /// Every child handle, in table order
    pub fn child_ids(&self) -> Vec<ScopeId> {
        self.table.values().flat_map(Datum::scopes).collect()
    }

    /// Key and datum pairs, in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.table.iter().map(|(key, datum)| (key.as_str(), datum))
    }

    /// Attribute keys, in table order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when the scope has no attributes
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Scope holding this one in a table datum, if any
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Type id of the payload, or [`RttiId::ROOT`] for a plain scope
    pub fn dynamic_type(&self) -> RttiId {
        self.payload
            .as_ref()
            .map_or(RttiId::ROOT, |payload| payload.rtti_id())
    }

    /// Type name of the payload, or `"Scope"`
    pub fn type_name(&self) -> &'static str {
        self.payload
            .as_ref()
            .map_or("Scope", |payload| payload.rtti_name())
    }

    /// True if the payload is of type `id` or derives from it
    pub fn is(&self, id: RttiId) -> bool {
        self.payload.as_ref().is_some_and(|payload| payload.is(id))
    }

    /// Object this scope reflects, if it is attributed
    pub fn payload(&self) -> Option<&Rc<dyn Reflected>> {
        self.payload.as_ref()
    }

    /// Typed view of the payload or one of its bases
    pub fn object<T: RttiType>(&self) -> Option<&T> {
        self.payload.as_deref()?.ancestor_as::<T>()
    }

    /// Flattened signatures this scope was populated from
    pub fn signatures(&self) -> &[Signature] {
        self.signatures.as_deref().unwrap_or(&[])
    }

    /// True when `key` names any attribute
    pub fn is_attribute(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// True for `"this"` and every signature name of an attributed scope
    pub fn is_prescribed_attribute(&self, key: &str) -> bool {
        (self.payload.is_some() && key == THIS_KEY)
            || self.signatures().iter().any(|sig| sig.name() == key)
    }

    /// True when `key` names an attribute added after population
    pub fn is_auxiliary_attribute(&self, key: &str) -> bool {
        self.is_attribute(key) && !self.is_prescribed_attribute(key)
    }

    /// Prescribed attribute names, in table order
    pub fn prescribed_attributes(&self) -> Vec<&str> {
        self.keys()
            .filter(|key| self.is_prescribed_attribute(key))
            .collect()
    }

    /// Auxiliary attribute names, in table order
    pub fn auxiliary_attributes(&self) -> Vec<&str> {
        self.keys()
            .filter(|key| !self.is_prescribed_attribute(key))
            .collect()
    }

    /// Fresh scope with the same schema and empty table datums
    fn shallow_copy(&self) -> Self {
        let table = self
            .table
            .iter()
            .map(|(key, datum)| {
                let copy = if datum.datum_type() == DatumType::Table {
                    datum.empty_like()
                } else {
                    datum.clone()
                };
                (key.clone(), copy)
            })
            .collect();
        Self {
            table,
            parent: None,
            payload: self.payload.as_ref().map(|payload| payload.clone_reflected()),
            signatures: self.signatures.clone(),
        }
    }

    /// Point `"this"` and every external datum at the current payload
    fn bind_payload(&mut self) -> Result<()> {
        let Some(payload) = self.payload.clone() else {
            return Ok(());
        };
        let this = self.table.entry(THIS_KEY.to_string()).or_default();
        let pointer = RttiRef::new(Rc::clone(&payload).into_rtti());
        if this.is_empty() {
            this.push_back(pointer)?;
        } else {
            this.set(pointer, 0)?;
        }

        let signatures = self.signatures.clone().unwrap_or_else(|| Rc::from(Vec::new()));
        for sig in signatures.iter().filter(|sig| sig.is_external()) {
            let view = payload
                .ancestor(sig.owner())
                .and_then(|object| sig.bind(object))
                .ok_or_else(|| {
                    ReflectError::invalid_operation(format!(
                        "{} does not provide member '{}'",
                        payload.rtti_name(),
                        sig.name()
                    ))
                })?;
            let datum = self.table.entry(sig.name().to_string()).or_default();
            let size = if datum.is_external() {
                datum.size().min(sig.size())
            } else {
                sig.size()
            };
            datum.bind_external(view, size, sig.size())?;
        }
        Ok(())
    }
}

fn holds_scopes(datum: &Datum) -> bool {
    datum.datum_type() == DatumType::Table && !datum.is_empty()
}

fn unmanaged<'a>(key: &str, datum: &'a mut Datum) -> Result<&'a mut Datum> {
    if holds_scopes(datum) {
        return Err(ReflectError::invalid_operation(format!(
            "attribute '{}' holds scopes; change it through the scope arena",
            key
        )));
    }
    Ok(datum)
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("type", &self.type_name())
            .field("parent", &self.parent)
            .field("table", &self.table)
            .finish()
    }
}

/// Owner of every scope; tree operations live here
#[derive(Default)]
pub struct ScopeArena {
    scopes: HandleMap<Scope>,
}

impl ScopeArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty root scope
    pub fn create_scope(&mut self) -> ScopeId {
        self.scopes.insert(Scope::new())
    }

    /// Scope behind `id`, `None` when stale
    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    /// Mutable scope behind `id`, `None` when stale
    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id)
    }

    /// Lookup that fails on a stale handle
    pub fn scope(&self, id: ScopeId) -> Result<&Scope> {
        self.scopes.get(id).ok_or(ReflectError::UnknownScope(id))
    }

    /// Mutable lookup that fails on a stale handle
    pub fn scope_mut(&mut self, id: ScopeId) -> Result<&mut Scope> {
        self.scopes.get_mut(id).ok_or(ReflectError::UnknownScope(id))
    }

    /// True while `id` refers to a live scope
    pub fn contains(&self, id: ScopeId) -> bool {
        self.scopes.contains(id)
    }

    /// Number of live scopes
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// True when the arena holds no scopes
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scopes without a parent
    pub fn roots(&self) -> Vec<ScopeId> {
        self.scopes
            .iter()
            .filter(|(_, scope)| scope.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Create a new child of `parent` under `key`
    pub fn append_scope(&mut self, parent: ScopeId, key: &str) -> Result<ScopeId> {
        self.append_scope_with_capacity(parent, key, 0)
    }

    /// Create a new child, reserving `capacity` slots in the table datum
    pub fn append_scope_with_capacity(
        &mut self,
        parent: ScopeId,
        key: &str,
        capacity: usize,
    ) -> Result<ScopeId> {
        self.check_table_slot(parent, key)?;
        let child = self.scopes.insert(Scope::new());
        self.attach(parent, child, key, capacity)?;
        Ok(child)
    }

    /// Move `child` under `parent` at `key`, detaching it from its old parent
    pub fn adopt(&mut self, parent: ScopeId, child: ScopeId, key: &str) -> Result<ScopeId> {
        self.scope(parent)?;
        self.scope(child)?;
        if parent == child {
            return Err(ReflectError::SelfAdoption);
        }
        if self.is_ancestor_of(child, parent) {
            log::warn!("Rejected adoption of {:?} into its descendant {:?}", child, parent);
            return Err(ReflectError::Cycle { parent, child });
        }
        self.check_table_slot(parent, key)?;

        self.detach(child);
        self.attach(parent, child, key, 0)?;
        Ok(child)
    }

    /// Detach `child` from `parent`; it becomes a root owned by the caller
    pub fn orphan(&mut self, parent: ScopeId, child: ScopeId) -> Result<ScopeId> {
        let owner = self.scope(parent)?;
        if owner.find_scope(child).is_none() {
            return Err(ReflectError::InvalidArgument(format!(
                "{:?} is not a child of {:?}",
                child, parent
            )));
        }
        self.detach(child);
        Ok(child)
    }

    /// Look for `key` in `id`, then in each ancestor
    pub fn search(&self, id: ScopeId, key: &str) -> Option<(ScopeId, &Datum)> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.scopes.get(scope_id)?;
            if let Some(datum) = scope.find(key) {
                return Some((scope_id, datum));
            }
            current = scope.parent;
        }
        None
    }

    /// Breadth-first search of the subtree rooted at `id`, `id` included
    pub fn search_children(&self, id: ScopeId, key: &str) -> Option<(ScopeId, &Datum)> {
        let mut queue = VecDeque::from([id]);
        while let Some(scope_id) = queue.pop_front() {
            let Some(scope) = self.scopes.get(scope_id) else {
                continue;
            };
            if let Some(datum) = scope.find(key) {
                return Some((scope_id, datum));
            }
            queue.extend(scope.child_ids());
        }
        None
    }

    /// Datum a reference points at
    pub fn resolve(&self, reference: &DatumRef) -> Option<&Datum> {
        let scope = self.scopes.get(reference.scope()?)?;
        scope.find(reference.key()?)
    }

    /// Same attribute count and every key of `a` maps to an equal datum in
    /// `b`. Key order is ignored and `"this"` is only checked for presence.
    pub fn scopes_equal(&self, a: ScopeId, b: ScopeId) -> bool {
        self.scopes_equal_at(a, b, REFERENCE_DEPTH)
    }

    /// Datum equality that compares child scopes and referenced datums
    /// structurally
    pub fn datums_equal(&self, a: &Datum, b: &Datum) -> bool {
        self.datums_equal_at(a, b, REFERENCE_DEPTH)
    }

    fn scopes_equal_at(&self, a: ScopeId, b: ScopeId, depth: usize) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            let (Some(left), Some(right)) = (self.scopes.get(a), self.scopes.get(b)) else {
                return false;
            };
            if a == b {
                continue;
            }
            if left.len() != right.len() {
                return false;
            }
            for (key, datum) in left.iter() {
                let Some(other) = right.find(key) else {
                    return false;
                };
                if key != THIS_KEY && !self.datum_level_equal(datum, other, depth, &mut pending) {
                    return false;
                }
            }
        }
        true
    }

    fn datums_equal_at(&self, a: &Datum, b: &Datum, depth: usize) -> bool {
        let mut pending = Vec::new();
        self.datum_level_equal(a, b, depth, &mut pending)
            && pending
                .into_iter()
                .all(|(x, y)| self.scopes_equal_at(x, y, depth))
    }

    /// Compare one datum, queueing child scope pairs instead of recursing
    fn datum_level_equal(
        &self,
        a: &Datum,
        b: &Datum,
        depth: usize,
        pending: &mut Vec<(ScopeId, ScopeId)>,
    ) -> bool {
        if a.datum_type() != b.datum_type() || a.size() != b.size() {
            return false;
        }
        match a.datum_type() {
            DatumType::Table => {
                pending.extend(a.scopes().into_iter().zip(b.scopes()));
                true
            }
            DatumType::Reference => {
                let (Ok(left), Ok(right)) = (a.to_vec::<DatumRef>(), b.to_vec::<DatumRef>()) else {
                    return false;
                };
                left.iter().zip(&right).all(|(x, y)| {
                    if x == y || depth == 0 {
                        return x == y;
                    }
                    match (self.resolve(x), self.resolve(y)) {
                        (Some(dx), Some(dy)) => self.datums_equal_at(dx, dy, depth - 1),
                        _ => false,
                    }
                })
            }
            _ => a == b,
        }
    }

    /// Deep copy of the subtree at `id` as a new root. Attributed payloads
    /// are cloned polymorphically and their views re-bound to the copies.
    /// A failed copy leaves nothing behind in the arena.
    pub fn clone_scope(&mut self, id: ScopeId) -> Result<ScopeId> {
        self.scope(id)?;
        let mut root = None;
        match self.clone_subtree(id, &mut root) {
            Ok(()) => root.ok_or(ReflectError::UnknownScope(id)),
            Err(error) => {
                if let Some(partial) = root.filter(|&partial| self.contains(partial)) {
                    log::debug!("Discarding partial clone of {:?}: {}", id, error);
                    self.destroy(partial)?;
                }
                Err(error)
            }
        }
    }

    /// Copy level by level. Every copy is attached as soon as it exists, so
    /// destroying `root` frees all of them.
    fn clone_subtree(&mut self, id: ScopeId, root: &mut Option<ScopeId>) -> Result<()> {
        let mut queue: VecDeque<(ScopeId, Option<(ScopeId, String)>)> = VecDeque::from([(id, None)]);
        while let Some((source, target)) = queue.pop_front() {
            let source_scope = self.scope(source)?;
            let mut copy = source_scope.shallow_copy();
            copy.bind_payload()?;
            let children: Vec<(String, ScopeId)> = source_scope
                .iter()
                .flat_map(|(key, datum)| {
                    datum
                        .scopes()
                        .into_iter()
                        .map(move |child| (key.to_string(), child))
                })
                .collect();

            let new_id = self.scopes.insert(copy);
            match target {
                Some((parent, key)) => {
                    if let Err(error) = self.attach(parent, new_id, &key, 0) {
                        self.scopes.remove(new_id);
                        return Err(error);
                    }
                }
                None => *root = Some(new_id),
            }
            queue.extend(
                children
                    .into_iter()
                    .map(|(key, child)| (child, Some((new_id, key)))),
            );
        }
        Ok(())
    }

    /// Re-bind every external datum of `id` to its payload's members
    pub fn update_external_storage(&mut self, id: ScopeId) -> Result<()> {
        self.scope_mut(id)?.bind_payload()
    }

    /// Detach `id` from its parent and free its subtree
    pub fn destroy(&mut self, id: ScopeId) -> Result<()> {
        self.scope(id)?;
        self.detach(id);
        let mut stack = vec![id];
        while let Some(scope_id) = stack.pop() {
            if let Some(scope) = self.scopes.remove(scope_id) {
                stack.extend(scope.child_ids());
            }
        }
        Ok(())
    }

    /// Free every child, drop auxiliary attributes and empty prescribed
    /// table datums
    pub fn clear(&mut self, id: ScopeId) -> Result<()> {
        let children = self.scope(id)?.child_ids();
        for child in children {
            self.destroy(child)?;
        }
        let scope = self.scope_mut(id)?;
        let auxiliary: Vec<String> = scope
            .auxiliary_attributes()
            .into_iter()
            .map(String::from)
            .collect();
        for key in auxiliary {
            scope.table.shift_remove(&key);
        }
        for datum in scope.table.values_mut() {
            datum.clear_scopes();
        }
        Ok(())
    }

    /// Populate a scope for `object` from its registered schema
    pub fn create_attributed<T: Attributed>(&mut self, types: &TypeManager, object: T) -> Result<ScopeId> {
        self.create_reflected(types, Rc::new(object))
    }

    /// Populate a scope for a type-erased payload
    pub fn create_reflected(&mut self, types: &TypeManager, payload: Rc<dyn Reflected>) -> Result<ScopeId> {
        let signatures = types.signatures(payload.rtti_id())?;
        let mut scope = Scope {
            table: IndexMap::with_capacity(signatures.len() + 1),
            parent: None,
            payload: Some(payload),
            signatures: Some(Rc::clone(&signatures)),
        };
        scope.table.insert(THIS_KEY.to_string(), Datum::with_type(DatumType::Pointer));
        for sig in signatures.iter() {
            let mut datum = Datum::with_type(sig.datum_type());
            if sig.is_internal() {
                datum.reserve(sig.size())?;
            }
            scope.table.insert(sig.name().to_string(), datum);
        }
        scope.bind_payload()?;
        log::trace!("Populated {} with {} attributes", scope.type_name(), scope.len());
        Ok(self.scopes.insert(scope))
    }

    /// Construct `class` through `factory` and adopt it under `key`
    pub fn create_child(
        &mut self,
        types: &TypeManager,
        factory: &Factory,
        parent: ScopeId,
        class: &str,
        key: &str,
    ) -> Result<ScopeId> {
        self.check_table_slot(parent, key)?;
        let payload = factory.create(class)?;
        let child = self.create_reflected(types, payload)?;
        if let Err(e) = self.adopt(parent, child, key) {
            self.destroy(child)?;
            return Err(e);
        }
        Ok(child)
    }

    /// Typed payload of `id`, or of one of its bases
    pub fn object<T: RttiType>(&self, id: ScopeId) -> Option<&T> {
        self.scopes.get(id)?.object::<T>()
    }

    /// Shared handle to the payload of `id`
    pub fn payload(&self, id: ScopeId) -> Option<Rc<dyn Reflected>> {
        self.scopes.get(id)?.payload.clone()
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.scopes.get(id).and_then(|s| s.parent);
        while let Some(scope_id) = current {
            chain.push(scope_id);
            current = self.scopes.get(scope_id).and_then(|s| s.parent);
        }
        chain
    }

    /// Direct children of `id`, in table order
    pub fn children(&self, id: ScopeId) -> Vec<ScopeId> {
        self.scopes
            .get(id)
            .map(Scope::child_ids)
            .unwrap_or_default()
    }

    /// True when `ancestor` is a proper ancestor of `id`
    pub fn is_ancestor_of(&self, ancestor: ScopeId, id: ScopeId) -> bool {
        let mut current = self.scopes.get(id).and_then(|s| s.parent);
        while let Some(scope_id) = current {
            if scope_id == ancestor {
                return true;
            }
            current = self.scopes.get(scope_id).and_then(|s| s.parent);
        }
        false
    }

    fn check_table_slot(&self, parent: ScopeId, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(ReflectError::InvalidArgument(String::from(
                "attribute key cannot be empty",
            )));
        }
        let scope = self.scope(parent)?;
        match scope.find(key).map(Datum::datum_type) {
            None | Some(DatumType::Unknown) | Some(DatumType::Table) => Ok(()),
            Some(other) => Err(ReflectError::invalid_operation(format!(
                "attribute '{}' is {}, cannot hold scopes",
                key, other
            ))),
        }
    }

    /// Push `child` into `parent`'s table datum and link it back
    fn attach(&mut self, parent: ScopeId, child: ScopeId, key: &str, capacity: usize) -> Result<()> {
        let datum = self.scope_mut(parent)?.entry_with_type(key, DatumType::Table)?;
        if capacity > datum.capacity() {
            datum.reserve(capacity)?;
        }
        datum.push_scope(child)?;
        self.scope_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from its parent's table, if it has one
    fn detach(&mut self, child: ScopeId) {
        let Some(parent) = self.scopes.get_mut(child).and_then(|s| s.parent.take()) else {
            return;
        };
        if let Some(owner) = self.scopes.get_mut(parent) {
            for datum in owner.table.values_mut() {
                if datum.remove_scope(child) {
                    break;
                }
            }
        }
    }
}

impl fmt::Debug for ScopeArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeArena")
            .field("scopes", &self.scopes.len())
            .finish()
    }
}
