//! Object identity, class metadata and instance creation
//!
//! Every object in the graph is an `Rc`-allocated struct embedding an
//! [`ObjectCore`]. Its class is described by a `static` [`ObjectType`].
//! The [`object_class!`](crate::object_class) macro wires a struct to its
//! class and provides the type-erasure plumbing required by
//! [`ObjectBase`].

mod class;
mod handle;
mod instance;

pub use self::class::{FactoryFn, ObjectType, REF_MAKER_TYPE, REF_TARGET_TYPE};
pub use self::handle::{OORef, ObjectId, WeakRef};
pub use self::instance::{DependentsList, ObjectCore};

use std::any::Any;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::context::DataSet;
use crate::reference::{RefMaker, RefTarget};

/// Type-erasure plumbing shared by all graph objects.
///
/// Implemented by [`object_class!`](crate::object_class); not meant to be
/// implemented by hand.
pub trait ObjectBase: Any {
    /// Run-time class of the object.
    fn oo_type(&self) -> &'static ObjectType;

    /// Embedded per-instance state.
    fn core(&self) -> &ObjectCore;

    /// View as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// View as a reference maker.
    fn as_ref_maker(&self) -> &dyn RefMaker;

    /// View as a reference target, if the class is one.
    fn as_ref_target(&self) -> Option<&dyn RefTarget>;

    /// Convert an owning `Rc` into `Rc<dyn Any>`.
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;

    /// Convert an owning `Rc` into `Rc<dyn RefMaker>`.
    fn into_ref_maker_rc(self: Rc<Self>) -> Rc<dyn RefMaker>;

    /// Convert an owning `Rc` into `Rc<dyn RefTarget>`, if the class is one.
    fn into_ref_target_rc(self: Rc<Self>) -> Option<Rc<dyn RefTarget>>;
}

/// Static access to the class description of a concrete type.
pub trait ObjectClass {
    /// The class description.
    fn static_type() -> &'static ObjectType;
}

impl<T: RefMaker + ObjectClass> OORef<T> {
    /// Allocate a new object in `dataset`.
    ///
    /// `build` receives the object's [`ObjectCore`] and returns the fully
    /// initialized struct. The class is registered on first use, and fields
    /// flagged `MEMORIZE` are initialized from the data set's memorized
    /// defaults.
    pub fn new_object(dataset: &Rc<DataSet>, build: impl FnOnce(ObjectCore) -> T) -> OORef<T> {
        let rc = Rc::new_cyclic(|weak: &Weak<T>| {
            let self_ref: Weak<dyn RefMaker> = weak.clone();
            build(ObjectCore::new(self_ref, dataset))
        });
        T::static_type().register();
        let object = OORef::from_rc(rc);
        if dataset.config().memorize_defaults {
            if let Err(err) = dataset.load_user_defaults(&*object) {
                warn!(
                    class = T::static_type().name(),
                    error = %err,
                    "ignoring memorized default values"
                );
            }
        }
        object
    }
}

/// Implement [`ObjectBase`] and [`ObjectClass`] for a struct.
///
/// The struct must have a field named `core` of type [`ObjectCore`] and
/// implement [`RefMaker`] (and [`RefTarget`] for the `target` form).
///
/// ```ignore
/// object_class!(target Material => MATERIAL_TYPE);
/// object_class!(maker Observer => OBSERVER_TYPE);
/// ```
#[macro_export]
macro_rules! object_class {
    (target $ty:ty => $class:path) => {
        impl $crate::ObjectClass for $ty {
            fn static_type() -> &'static $crate::ObjectType {
                &$class
            }
        }

        impl $crate::ObjectBase for $ty {
            fn oo_type(&self) -> &'static $crate::ObjectType {
                &$class
            }
            fn core(&self) -> &$crate::ObjectCore {
                &self.core
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_ref_maker(&self) -> &dyn $crate::RefMaker {
                self
            }
            fn as_ref_target(&self) -> Option<&dyn $crate::RefTarget> {
                Some(self)
            }
            fn into_any_rc(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<dyn ::std::any::Any> {
                self
            }
            fn into_ref_maker_rc(
                self: ::std::rc::Rc<Self>,
            ) -> ::std::rc::Rc<dyn $crate::RefMaker> {
                self
            }
            fn into_ref_target_rc(
                self: ::std::rc::Rc<Self>,
            ) -> Option<::std::rc::Rc<dyn $crate::RefTarget>> {
                Some(self)
            }
        }
    };
    (maker $ty:ty => $class:path) => {
        impl $crate::ObjectClass for $ty {
            fn static_type() -> &'static $crate::ObjectType {
                &$class
            }
        }

        impl $crate::ObjectBase for $ty {
            fn oo_type(&self) -> &'static $crate::ObjectType {
                &$class
            }
            fn core(&self) -> &$crate::ObjectCore {
                &self.core
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_ref_maker(&self) -> &dyn $crate::RefMaker {
                self
            }
            fn as_ref_target(&self) -> Option<&dyn $crate::RefTarget> {
                None
            }
            fn into_any_rc(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<dyn ::std::any::Any> {
                self
            }
            fn into_ref_maker_rc(
                self: ::std::rc::Rc<Self>,
            ) -> ::std::rc::Rc<dyn $crate::RefMaker> {
                self
            }
            fn into_ref_target_rc(
                self: ::std::rc::Rc<Self>,
            ) -> Option<::std::rc::Rc<dyn $crate::RefTarget>> {
                None
            }
        }
    };
}
