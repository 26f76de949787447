//! Reference-counted handles to graph objects

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::reference::{RefMaker, RefTarget};

/// Identity of a live object, derived from its allocation address.
///
/// Two handles compare equal exactly when they point at the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub(crate) fn of<T: ?Sized>(ptr: *const T) -> Self {
        ObjectId(ptr.cast::<()>() as usize)
    }
}

/// Strong handle to an object in the reference graph.
///
/// Cloning increments the strong count, dropping decrements it. When the
/// last strong handle goes away (including the edges held by reference
/// fields) the object is destroyed. Equality, hashing and ordering use
/// object identity, so handles work as map keys.
pub struct OORef<T: ?Sized>(Rc<T>);

/// Non-owning counterpart of [`OORef`].
pub struct WeakRef<T: ?Sized>(Weak<T>);

impl<T: ?Sized> OORef<T> {
    /// Wrap an existing `Rc`.
    pub fn from_rc(rc: Rc<T>) -> Self {
        OORef(rc)
    }

    /// Identity of the referenced object.
    pub fn id(&self) -> ObjectId {
        ObjectId::of(Rc::as_ptr(&self.0))
    }

    /// Whether two handles refer to the same object.
    pub fn ptr_eq<U: ?Sized>(this: &Self, other: &OORef<U>) -> bool {
        this.id() == other.id()
    }

    /// Number of strong handles (including reference field edges).
    pub fn strong_count(this: &Self) -> usize {
        Rc::strong_count(&this.0)
    }

    /// Create a non-owning handle.
    pub fn downgrade(this: &Self) -> WeakRef<T> {
        WeakRef(Rc::downgrade(&this.0))
    }

    pub(crate) fn into_rc(self) -> Rc<T> {
        self.0
    }
}

impl<T: RefTarget> OORef<T> {
    /// Type-erase into a target handle.
    pub fn to_target(&self) -> OORef<dyn RefTarget> {
        let rc: Rc<dyn RefTarget> = self.0.clone();
        OORef(rc)
    }
}

impl<T: RefMaker> OORef<T> {
    /// Type-erase into a maker handle.
    pub fn to_maker(&self) -> OORef<dyn RefMaker> {
        let rc: Rc<dyn RefMaker> = self.0.clone();
        OORef(rc)
    }
}

impl OORef<dyn RefTarget> {
    /// View a target handle as a maker handle.
    pub fn as_maker(&self) -> OORef<dyn RefMaker> {
        OORef(self.0.clone().into_ref_maker_rc())
    }

    /// Recover the concrete type of a target.
    pub fn downcast<T: RefTarget>(&self) -> Option<OORef<T>> {
        let any: Rc<dyn Any> = self.0.clone().into_any_rc();
        any.downcast::<T>().ok().map(OORef)
    }
}

impl OORef<dyn RefMaker> {
    /// View a maker handle as a target handle, if the object is a target.
    pub fn as_target(&self) -> Option<OORef<dyn RefTarget>> {
        self.0.clone().into_ref_target_rc().map(OORef)
    }

    /// Recover the concrete type of a maker.
    pub fn downcast<T: RefMaker>(&self) -> Option<OORef<T>> {
        let any: Rc<dyn Any> = self.0.clone().into_any_rc();
        any.downcast::<T>().ok().map(OORef)
    }
}

impl<T: ?Sized> WeakRef<T> {
    /// Try to obtain a strong handle.
    pub fn upgrade(&self) -> Option<OORef<T>> {
        self.0.upgrade().map(OORef)
    }

    /// Identity of the referenced allocation (stable while this weak handle exists).
    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.0.as_ptr())
    }

    /// Whether the object is still alive.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn from_weak(weak: Weak<T>) -> Self {
        WeakRef(weak)
    }
}

impl<T: ?Sized> Clone for OORef<T> {
    fn clone(&self) -> Self {
        OORef(self.0.clone())
    }
}

impl<T: ?Sized> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        WeakRef(self.0.clone())
    }
}

impl<T: ?Sized> Deref for OORef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized> PartialEq for OORef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<T: ?Sized> Eq for OORef<T> {}

impl<T: ?Sized> Hash for OORef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<T: ?Sized> PartialOrd for OORef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for OORef<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl<T: ?Sized> fmt::Debug for OORef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OORef({:#x})", self.id().0)
    }
}

impl<T: ?Sized> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakRef({:#x}, alive={})", self.id().0, self.is_alive())
    }
}
