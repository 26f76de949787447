//! Per-instance bookkeeping shared by every graph object

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::trace;

use super::handle::{OORef, ObjectId};
use crate::context::DataSet;
use crate::reference::{RefMaker, RefTarget};

/// Reverse edges of a target: the distinct makers holding at least one
/// strong reference to it.
///
/// Entries are non-owning. Most targets have very few dependents, so the
/// list is a linear scan over inline storage.
#[derive(Default)]
pub struct DependentsList {
    entries: SmallVec<[Weak<dyn RefMaker>; 4]>,
}

impl DependentsList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the maker with the given identity is listed.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.iter().any(|w| ObjectId::of(w.as_ptr()) == id)
    }

    /// Append a maker.
    ///
    /// Panics if it is already listed.
    pub fn push_back(&mut self, maker: Weak<dyn RefMaker>) {
        let id = ObjectId::of(maker.as_ptr());
        assert!(!self.contains(id), "object is already a dependent");
        self.entries.push(maker);
    }

    /// Remove a maker, preserving the order of the others.
    ///
    /// Panics if it is not listed.
    pub fn remove(&mut self, id: ObjectId) {
        let pos = self
            .entries
            .iter()
            .position(|w| ObjectId::of(w.as_ptr()) == id)
            .unwrap_or_else(|| panic!("object is not a dependent"));
        self.entries.remove(pos);
    }

    /// Drop entries whose maker no longer exists.
    pub fn prune(&mut self) {
        self.entries.retain(|w| w.strong_count() > 0);
    }

    /// Strong handles to all live dependents, in insertion order.
    pub fn snapshot(&self) -> Vec<OORef<dyn RefMaker>> {
        self.entries
            .iter()
            .filter_map(Weak::upgrade)
            .map(OORef::from_rc)
            .collect()
    }

    /// Number of live dependents.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Whether there are no live dependents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State embedded in every graph object.
///
/// Holds the object's own weak self handle (used to hand out strong
/// handles from `&self`), the owning data set and, for targets, the
/// dependents list. Created by [`OORef::new_object`].
pub struct ObjectCore {
    self_ref: Weak<dyn RefMaker>,
    dataset: Weak<DataSet>,
    dependents: RefCell<DependentsList>,
}

impl ObjectCore {
    pub(crate) fn new(self_ref: Weak<dyn RefMaker>, dataset: &Rc<DataSet>) -> Self {
        Self {
            self_ref,
            dataset: Rc::downgrade(dataset),
            dependents: RefCell::new(DependentsList::new()),
        }
    }

    /// Identity of the object owning this core.
    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.self_ref.as_ptr())
    }

    /// The data set the object was created in, if it still exists.
    pub fn dataset(&self) -> Option<Rc<DataSet>> {
        self.dataset.upgrade()
    }

    /// Strong handle to the owning object.
    ///
    /// `None` only while the object is being destroyed.
    pub fn self_ref(&self) -> Option<OORef<dyn RefMaker>> {
        self.self_ref.upgrade().map(OORef::from_rc)
    }

    /// Strong target handle to the owning object, if it is a target.
    pub fn self_target(&self) -> Option<OORef<dyn RefTarget>> {
        self.self_ref().and_then(|maker| maker.as_target())
    }

    pub(crate) fn weak_self(&self) -> Weak<dyn RefMaker> {
        self.self_ref.clone()
    }

    /// Read access to the dependents list.
    pub fn dependents(&self) -> Ref<'_, DependentsList> {
        self.dependents.borrow()
    }

    pub(crate) fn add_dependent(&self, maker: Weak<dyn RefMaker>) {
        let id = ObjectId::of(maker.as_ptr());
        let mut list = self.dependents.borrow_mut();
        list.prune();
        if !list.contains(id) {
            trace!(target_id = ?self.id(), dependent = ?id, "dependent added");
            list.push_back(maker);
        }
    }

    pub(crate) fn remove_dependent(&self, id: ObjectId) {
        trace!(target_id = ?self.id(), dependent = ?id, "dependent removed");
        self.dependents.borrow_mut().remove(id);
    }

    pub(crate) fn prune_dependents(&self) {
        if let Ok(mut list) = self.dependents.try_borrow_mut() {
            list.prune();
        }
    }
}

impl fmt::Debug for ObjectCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCore")
            .field("id", &self.id())
            .field("dependents", &self.dependents.borrow().len())
            .finish()
    }
}
