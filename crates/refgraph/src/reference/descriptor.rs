//! Class-level field descriptors

use std::fmt;

use bitflags::bitflags;

use super::property_field::PropertyFieldBase;
use super::ref_maker::RefMaker;
use super::reference_field::SingleReferenceFieldBase;
use super::vector_field::VectorReferenceFieldBase;
use crate::object::{ObjectClass, ObjectType};

bitflags! {
    /// Behavior flags of a declared field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFieldFlags: u32 {
        /// The field holds a list of references
        const VECTOR = 1 << 1;
        /// Changes are never recorded on the undo stack
        const NO_UNDO = 1 << 2;
        /// Changes do not raise a `TargetChanged` event on the owner
        const NO_CHANGE_MESSAGE = 1 << 3;
        /// Cloning the owner always shares the target
        const NEVER_CLONE_TARGET = 1 << 4;
        /// Cloning the owner always clones the target, deep or shallow as requested
        const ALWAYS_CLONE = 1 << 5;
        /// Cloning the owner always deep-copies the target
        const ALWAYS_DEEP_COPY = 1 << 6;
        /// The value can be memorized as a user default for new instances
        const MEMORIZE = 1 << 7;
        /// Non-owning reference (single reference fields only)
        const WEAK_REF = 1 << 8;
        /// The field is not an animation parameter
        const NO_ANIMATION = 1 << 9;

        /// Internal bookkeeping field: no undo and no change message
        const INTERNAL = Self::NO_UNDO.bits() | Self::NO_CHANGE_MESSAGE.bits();
    }
}

/// Returns the property field a descriptor describes, given its owner.
pub type PropertyAccessFn = for<'a> fn(&'a dyn RefMaker) -> &'a dyn PropertyFieldBase;

/// Returns the single reference field a descriptor describes, given its owner.
pub type SingleAccessFn = for<'a> fn(&'a dyn RefMaker) -> &'a SingleReferenceFieldBase;

/// Returns the vector reference field a descriptor describes, given its owner.
pub type VectorAccessFn = for<'a> fn(&'a dyn RefMaker) -> &'a VectorReferenceFieldBase;

/// What kind of storage a descriptor refers to.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Plain value
    Property(PropertyAccessFn),
    /// Zero or one target
    Reference {
        /// Base class every target must derive from
        target_class: &'static ObjectType,
        /// Field accessor
        access: SingleAccessFn,
    },
    /// Ordered list of targets
    Vector {
        /// Base class every target must derive from
        target_class: &'static ObjectType,
        /// Field accessor
        access: VectorAccessFn,
    },
}

/// Static metadata describing one declared field of a class.
///
/// Declared as a `static` next to the class and listed in the class's
/// [`ObjectType`]. The accessor function gives generic code access to the
/// field storage of any instance of the class.
///
/// ```ignore
/// static CUBE_SIZE: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
///     &CUBE_TYPE,
///     "size",
///     PropertyFieldFlags::MEMORIZE,
///     |owner| &owner_cast::<Cube>(owner).size,
/// );
/// ```
pub struct PropertyFieldDescriptor {
    identifier: &'static str,
    display_name: Option<&'static str>,
    defining_class: &'static ObjectType,
    flags: PropertyFieldFlags,
    kind: FieldKind,
}

impl PropertyFieldDescriptor {
    /// Describe a plain property field.
    pub const fn property(
        defining_class: &'static ObjectType,
        identifier: &'static str,
        flags: PropertyFieldFlags,
        access: PropertyAccessFn,
    ) -> Self {
        assert!(
            !flags.contains(PropertyFieldFlags::VECTOR)
                && !flags.contains(PropertyFieldFlags::WEAK_REF),
            "reference flags on a property field"
        );
        Self {
            identifier,
            display_name: None,
            defining_class,
            flags,
            kind: FieldKind::Property(access),
        }
    }

    /// Describe a single reference field.
    pub const fn reference(
        defining_class: &'static ObjectType,
        identifier: &'static str,
        target_class: &'static ObjectType,
        flags: PropertyFieldFlags,
        access: SingleAccessFn,
    ) -> Self {
        assert!(
            !flags.contains(PropertyFieldFlags::VECTOR),
            "VECTOR flag on a single reference field"
        );
        Self {
            identifier,
            display_name: None,
            defining_class,
            flags,
            kind: FieldKind::Reference {
                target_class,
                access,
            },
        }
    }

    /// Describe a vector reference field.
    pub const fn vector(
        defining_class: &'static ObjectType,
        identifier: &'static str,
        target_class: &'static ObjectType,
        flags: PropertyFieldFlags,
        access: VectorAccessFn,
    ) -> Self {
        assert!(
            !flags.contains(PropertyFieldFlags::WEAK_REF),
            "vector reference fields cannot be weak"
        );
        Self {
            identifier,
            display_name: None,
            defining_class,
            flags: flags.union(PropertyFieldFlags::VECTOR),
            kind: FieldKind::Vector {
                target_class,
                access,
            },
        }
    }

    /// Attach a human-readable name.
    pub const fn with_display_name(mut self, name: &'static str) -> Self {
        self.display_name = Some(name);
        self
    }

    /// Identifier, unique within the defining class
    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    /// Human-readable name, falling back to the identifier.
    pub fn display_name(&self) -> &'static str {
        self.display_name.unwrap_or(self.identifier)
    }

    /// Class that declares the field
    pub fn defining_class(&self) -> &'static ObjectType {
        self.defining_class
    }

    /// Field flags
    pub fn flags(&self) -> PropertyFieldFlags {
        self.flags
    }

    /// Storage kind and accessor
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Base class of allowed targets, `None` for property fields.
    pub fn target_class(&self) -> Option<&'static ObjectType> {
        match self.kind {
            FieldKind::Property(_) => None,
            FieldKind::Reference { target_class, .. } | FieldKind::Vector { target_class, .. } => {
                Some(target_class)
            }
        }
    }

    /// Whether this is a single or vector reference field.
    pub fn is_reference_field(&self) -> bool {
        !matches!(self.kind, FieldKind::Property(_))
    }

    /// Whether this is a vector reference field.
    pub fn is_vector(&self) -> bool {
        matches!(self.kind, FieldKind::Vector { .. })
    }

    /// Whether this is a non-owning reference field.
    pub fn is_weak(&self) -> bool {
        self.flags.contains(PropertyFieldFlags::WEAK_REF)
    }

    /// Whether changes are recorded on the undo stack.
    pub fn automatic_undo(&self) -> bool {
        !self.flags.contains(PropertyFieldFlags::NO_UNDO)
    }

    /// Whether changes raise `TargetChanged` on the owner.
    pub fn should_generate_change_event(&self) -> bool {
        !self.flags.contains(PropertyFieldFlags::NO_CHANGE_MESSAGE)
    }

    /// Whether the value can be stored as a user default.
    pub fn is_memorizable(&self) -> bool {
        self.flags.contains(PropertyFieldFlags::MEMORIZE)
    }

    /// The field declared after this one in the same class.
    pub fn next(&self) -> Option<&'static PropertyFieldDescriptor> {
        let fields = self.defining_class.fields();
        let pos = fields.iter().position(|f| std::ptr::eq(*f, self))?;
        fields.get(pos + 1).copied()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Storage Access
    // ═══════════════════════════════════════════════════════════════════

    /// Property storage of `owner`.
    ///
    /// Panics if this is a reference field.
    pub fn property_field<'a>(&self, owner: &'a dyn RefMaker) -> &'a dyn PropertyFieldBase {
        self.check_owner(owner);
        match self.kind {
            FieldKind::Property(access) => access(owner),
            _ => panic!("field '{}' is not a property field", self.identifier),
        }
    }

    /// Single reference storage of `owner`.
    ///
    /// Panics if this is not a single reference field.
    pub fn single_field<'a>(&self, owner: &'a dyn RefMaker) -> &'a SingleReferenceFieldBase {
        self.check_owner(owner);
        match self.kind {
            FieldKind::Reference { access, .. } => access(owner),
            _ => panic!("field '{}' is not a single reference field", self.identifier),
        }
    }

    /// Vector reference storage of `owner`.
    ///
    /// Panics if this is not a vector reference field.
    pub fn vector_field<'a>(&self, owner: &'a dyn RefMaker) -> &'a VectorReferenceFieldBase {
        self.check_owner(owner);
        match self.kind {
            FieldKind::Vector { access, .. } => access(owner),
            _ => panic!("field '{}' is not a vector reference field", self.identifier),
        }
    }

    fn check_owner(&self, owner: &dyn RefMaker) {
        assert!(
            owner.oo_type().is_derived_from(self.defining_class),
            "field '{}' of class {} accessed on an object of class {}",
            self.identifier,
            self.defining_class.name(),
            owner.oo_type().name()
        );
    }
}

impl PartialEq for PropertyFieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for PropertyFieldDescriptor {}

impl fmt::Debug for PropertyFieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.defining_class.name(), self.identifier)
    }
}

/// Downcast the owner passed to a field accessor.
///
/// Panics if `owner` is not a `T`, which means a descriptor was listed in
/// the wrong class.
pub fn owner_cast<T: RefMaker + ObjectClass>(owner: &dyn RefMaker) -> &T {
    owner.as_any().downcast_ref::<T>().unwrap_or_else(|| {
        panic!(
            "expected an object of class {}, got {}",
            T::static_type().name(),
            owner.oo_type().name()
        )
    })
}
