//! Clone operations over object sub-graphs

use indexmap::IndexMap;
use tracing::debug;

use super::ref_target::RefTarget;
use crate::error::{RefGraphError, Result};
use crate::object::OORef;

/// Performs one clone operation.
///
/// Remembers every object it has cloned, so an object reached through
/// several paths is cloned once and all paths lead to the same copy. Use a
/// fresh helper for each independent operation.
#[derive(Default)]
pub struct CloneHelper {
    clones: IndexMap<OORef<dyn RefTarget>, OORef<dyn RefTarget>>,
}

impl CloneHelper {
    /// Create a helper with an empty clone table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone `source`, or return its existing clone.
    ///
    /// Returns `None` for `None`. Fails if the class cannot be instantiated
    /// or a clone override returned an object of an unrelated class.
    pub fn clone_object(
        &mut self,
        source: Option<&OORef<dyn RefTarget>>,
        deep_copy: bool,
    ) -> Result<Option<OORef<dyn RefTarget>>> {
        source
            .map(|source| self.clone_target(source, deep_copy))
            .transpose()
    }

    /// Non-optional form of [`clone_object`](Self::clone_object).
    pub fn clone_target(
        &mut self,
        source: &OORef<dyn RefTarget>,
        deep_copy: bool,
    ) -> Result<OORef<dyn RefTarget>> {
        if let Some(existing) = self.clones.get(source) {
            return Ok(existing.clone());
        }

        debug!(class = source.oo_type().name(), deep_copy, "cloning object");
        let copy = source.clone_object(deep_copy, self)?;
        if !copy.oo_type().is_derived_from(source.oo_type()) {
            return Err(RefGraphError::InvalidClone {
                class: source.oo_type().name().to_string(),
                got: copy.oo_type().name().to_string(),
            });
        }

        self.clones.insert(source.clone(), copy.clone());
        Ok(copy)
    }

    /// Clone a concrete object, keeping its static type.
    pub fn clone_typed<T: RefTarget>(&mut self, source: &OORef<T>, deep_copy: bool) -> Result<OORef<T>> {
        let copy = self.clone_target(&source.to_target(), deep_copy)?;
        copy.downcast::<T>().ok_or_else(|| RefGraphError::InvalidClone {
            class: source.oo_type().name().to_string(),
            got: copy.oo_type().name().to_string(),
        })
    }

    /// Share `source` for a shallow copy, clone it for a deep copy.
    pub fn copy_reference(
        &mut self,
        source: Option<&OORef<dyn RefTarget>>,
        deep_copy: bool,
    ) -> Result<Option<OORef<dyn RefTarget>>> {
        if deep_copy {
            self.clone_object(source, true)
        } else {
            Ok(source.cloned())
        }
    }

    /// Typed form of [`copy_reference`](Self::copy_reference).
    pub fn copy_typed<T: RefTarget>(&mut self, source: &OORef<T>, deep_copy: bool) -> Result<OORef<T>> {
        if deep_copy {
            self.clone_typed(source, true)
        } else {
            Ok(source.clone())
        }
    }

    /// Number of objects cloned so far
    pub fn len(&self) -> usize {
        self.clones.len()
    }

    /// Whether nothing has been cloned yet.
    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }

    /// Pairs of source and clone, in the order the clones were made.
    pub fn clones(&self) -> impl Iterator<Item = (&OORef<dyn RefTarget>, &OORef<dyn RefTarget>)> {
        self.clones.iter()
    }
}
