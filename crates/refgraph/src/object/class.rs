//! Class metadata and the global class registry

use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use dashmap::DashMap;
use tracing::debug;

use super::handle::OORef;
use crate::context::DataSet;
use crate::error::{RefGraphError, Result};
use crate::reference::{PropertyFieldDescriptor, RefTarget};

/// Creates a fresh, default-initialized instance of a class.
pub type FactoryFn = fn(&Rc<DataSet>) -> OORef<dyn RefTarget>;

/// Run-time description of an object class.
///
/// Every class declares one `static` of this type. It names the class, links
/// to the super class and lists the fields the class itself declares, in
/// declaration order. Inherited fields are reached through the super class.
pub struct ObjectType {
    name: &'static str,
    super_class: Option<&'static ObjectType>,
    fields: &'static [&'static PropertyFieldDescriptor],
    factory: Option<FactoryFn>,
}

/// Root class of every object that can hold references.
pub static REF_MAKER_TYPE: ObjectType = ObjectType::new("RefMaker", None, &[]);

/// Root class of every object that can be referenced.
pub static REF_TARGET_TYPE: ObjectType = ObjectType::new("RefTarget", Some(&REF_MAKER_TYPE), &[]);

impl ObjectType {
    /// Create a class description without a factory.
    ///
    /// Such classes cannot be cloned generically or loaded from a stream.
    pub const fn new(
        name: &'static str,
        super_class: Option<&'static ObjectType>,
        fields: &'static [&'static PropertyFieldDescriptor],
    ) -> Self {
        Self {
            name,
            super_class,
            fields,
            factory: None,
        }
    }

    /// Attach a factory function.
    pub const fn with_factory(mut self, factory: FactoryFn) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct super class, `None` for a root class.
    pub fn super_class(&self) -> Option<&'static ObjectType> {
        self.super_class
    }

    /// Whether this class is `other` or derives from it.
    pub fn is_derived_from(&self, other: &ObjectType) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if std::ptr::eq(class, other) {
                return true;
            }
            current = class.super_class;
        }
        false
    }

    /// Fields declared directly by this class, in declaration order.
    pub fn fields(&self) -> &'static [&'static PropertyFieldDescriptor] {
        self.fields
    }

    /// Fields of this class and all ancestors, base class fields first.
    pub fn all_fields(&self) -> Vec<&'static PropertyFieldDescriptor> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            chain.push(class);
            current = class.super_class;
        }
        chain
            .into_iter()
            .rev()
            .flat_map(|class| class.fields.iter().copied())
            .collect()
    }

    /// First field declared by this class.
    pub fn first_field(&self) -> Option<&'static PropertyFieldDescriptor> {
        self.fields.first().copied()
    }

    /// Look up a field by identifier in this class and its ancestors.
    ///
    /// The most derived declaration wins.
    pub fn find_field(&self, identifier: &str) -> Option<&'static PropertyFieldDescriptor> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(field) = class
                .fields
                .iter()
                .copied()
                .find(|f| f.identifier() == identifier)
            {
                return Some(field);
            }
            current = class.super_class;
        }
        None
    }

    /// Like [`find_field`](Self::find_field) but reports a missing field as an error.
    pub fn field(&self, identifier: &str) -> Result<&'static PropertyFieldDescriptor> {
        self.find_field(identifier)
            .ok_or_else(|| RefGraphError::FieldNotFound {
                class: self.name.to_string(),
                identifier: identifier.to_string(),
            })
    }

    /// Whether instances can be created through the factory.
    pub fn is_instantiable(&self) -> bool {
        self.factory.is_some()
    }

    /// Create a default-initialized instance in the given data set.
    pub fn create_instance(&self, dataset: &Rc<DataSet>) -> Result<OORef<dyn RefTarget>> {
        let factory = self.factory.ok_or_else(|| RefGraphError::NotCloneable {
            class: self.name.to_string(),
        })?;
        let object = factory(dataset);
        assert!(
            object.oo_type().is_derived_from(self),
            "factory of class {} produced an object of class {}",
            self.name,
            object.oo_type().name()
        );
        Ok(object)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Registry
    // ═══════════════════════════════════════════════════════════════════

    /// Validate the class and make it known to [`find_class`](Self::find_class).
    ///
    /// Registering the same class twice is harmless. Panics if a field
    /// identifier is declared twice, if a listed descriptor names a different
    /// defining class, or if another class already uses the same name.
    pub fn register(&'static self) {
        let registry = registry();
        if let Some(existing) = registry.get(self.name) {
            assert!(
                std::ptr::eq(*existing, self),
                "class name '{}' is registered twice",
                self.name
            );
            return;
        }

        for (i, field) in self.fields.iter().enumerate() {
            assert!(
                std::ptr::eq(field.defining_class(), self),
                "field '{}' listed in class {} is defined by class {}",
                field.identifier(),
                self.name,
                field.defining_class().name
            );
            assert!(
                !self.fields[..i]
                    .iter()
                    .any(|other| other.identifier() == field.identifier()),
                "duplicate field identifier '{}' in class {}",
                field.identifier(),
                self.name
            );
        }

        if let Some(super_class) = self.super_class {
            super_class.register();
        }

        registry.insert(self.name, self);
        debug!(
            class = self.name,
            fields = self.fields.len(),
            "registered object class"
        );
    }

    /// Look up a registered class by name.
    pub fn find_class(name: &str) -> Option<&'static ObjectType> {
        registry().get(name).map(|entry| *entry)
    }
}

fn registry() -> &'static DashMap<&'static str, &'static ObjectType> {
    static REGISTRY: OnceLock<DashMap<&'static str, &'static ObjectType>> = OnceLock::new();
    REGISTRY.get_or_init(DashMap::new)
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ObjectType {}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .field("super_class", &self.super_class.map(|c| c.name))
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
