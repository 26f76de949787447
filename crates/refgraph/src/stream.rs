//! Saving and loading object graphs
//!
//! A graph is written as a table of nodes. Each target reachable from the
//! saved roots appears once, with its class name, property values, the
//! node indices its reference fields point at and any extra data the class
//! saves. Weak references are not written.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::DataSet;
use crate::error::{RefGraphError, Result};
use crate::object::{OORef, ObjectId, ObjectType};
use crate::reference::{FieldKind, RefMakerExt, RefTarget};
use crate::undo::UndoSuspender;
use crate::value::Value;

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

/// Stored contents of one reference field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializedReference {
    /// Node index of the target of a single reference field
    Single(Option<usize>),
    /// Node indices of the entries of a vector reference field
    Vector(Vec<usize>),
}

/// One node of a serialized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedObject {
    /// Registered class name
    pub class: String,
    /// Property values by field identifier
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    /// Reference fields by field identifier
    #[serde(default)]
    pub references: IndexMap<String, SerializedReference>,
    /// Data written by [`RefMaker::save_extra_data`](crate::RefMaker::save_extra_data)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// A serialized object graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    /// Format version
    pub version: u32,
    /// Node table
    pub objects: Vec<SerializedObject>,
    /// Node indices of the saved roots, in the order they were added
    pub roots: Vec<usize>,
}

impl SerializedGraph {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Saving
// ═══════════════════════════════════════════════════════════════════

/// Builds a [`SerializedGraph`] from one or more root objects.
#[derive(Default)]
pub struct ObjectSaveStream {
    objects: Vec<Option<SerializedObject>>,
    indices: HashMap<ObjectId, usize>,
    /// Keeps saved objects alive so their identities stay unique.
    saved: Vec<OORef<dyn RefTarget>>,
    roots: Vec<usize>,
}

impl ObjectSaveStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save `root` and everything it references, and mark it as a root.
    pub fn add_root(&mut self, root: &OORef<dyn RefTarget>) -> Result<usize> {
        let index = self.save_object(root)?;
        self.roots.push(index);
        Ok(index)
    }

    /// Save `object` and everything it references. Returns its node index.
    ///
    /// An object already in the table is not written again. On error the
    /// stream is left as it was before the call.
    pub fn save_object(&mut self, object: &OORef<dyn RefTarget>) -> Result<usize> {
        let mark = self.objects.len();
        let result = self.write_object(object);
        if result.is_err() {
            self.objects.truncate(mark);
            self.saved.truncate(mark);
            self.indices.retain(|_, index| *index < mark);
        }
        result
    }

    fn write_object(&mut self, object: &OORef<dyn RefTarget>) -> Result<usize> {
        if let Some(&index) = self.indices.get(&object.id()) {
            return Ok(index);
        }
        let class = object.oo_type();
        if !class.is_instantiable() {
            return Err(RefGraphError::Stream(format!(
                "class {} cannot be serialized",
                class.name()
            )));
        }

        let index = self.objects.len();
        self.objects.push(None);
        self.indices.insert(object.id(), index);
        self.saved.push(object.clone());

        let mut node = SerializedObject {
            class: class.name().to_string(),
            properties: IndexMap::new(),
            references: IndexMap::new(),
            extra: object.save_extra_data(),
        };

        let owner = object.as_ref_maker();
        for field in class.all_fields() {
            match field.kind() {
                FieldKind::Property(_) => {
                    node.properties
                        .insert(field.identifier().to_string(), owner.property_field_value(field));
                }
                FieldKind::Reference { .. } => {
                    if field.is_weak() {
                        continue;
                    }
                    let target = match field.single_field(owner).target() {
                        Some(target) => Some(self.write_object(&target)?),
                        None => None,
                    };
                    node.references.insert(
                        field.identifier().to_string(),
                        SerializedReference::Single(target),
                    );
                }
                FieldKind::Vector { .. } => {
                    let targets = field
                        .vector_field(owner)
                        .targets()
                        .iter()
                        .map(|target| self.write_object(target))
                        .collect::<Result<Vec<_>>>()?;
                    node.references.insert(
                        field.identifier().to_string(),
                        SerializedReference::Vector(targets),
                    );
                }
            }
        }

        self.objects[index] = Some(node);
        Ok(index)
    }

    /// Finish writing and return the graph.
    pub fn finish(self) -> SerializedGraph {
        debug_assert!(self.objects.iter().all(Option::is_some));
        let objects: Vec<SerializedObject> = self.objects.into_iter().flatten().collect();
        debug!(objects = objects.len(), roots = self.roots.len(), "saved object graph");
        SerializedGraph {
            version: FORMAT_VERSION,
            objects,
            roots: self.roots,
        }
    }

    /// Save a single root and encode the graph as JSON.
    pub fn to_json(root: &OORef<dyn RefTarget>) -> Result<String> {
        let mut stream = Self::new();
        stream.add_root(root)?;
        stream.finish().to_json()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════════════

/// Re-creates objects from a [`SerializedGraph`].
pub struct ObjectLoadStream<'a> {
    dataset: &'a Rc<DataSet>,
}

impl<'a> ObjectLoadStream<'a> {
    /// Create a stream that instantiates objects in `dataset`.
    pub fn new(dataset: &'a Rc<DataSet>) -> Self {
        Self { dataset }
    }

    /// Instantiate all nodes and return the roots.
    ///
    /// Classes are looked up by name in the class registry. Stored fields
    /// the class no longer declares are skipped. Nothing is recorded on the
    /// undo stack.
    pub fn load(&self, graph: &SerializedGraph) -> Result<Vec<OORef<dyn RefTarget>>> {
        if graph.version > FORMAT_VERSION {
            return Err(RefGraphError::Stream(format!(
                "unsupported format version {}",
                graph.version
            )));
        }
        let _suspender = UndoSuspender::new(self.dataset.undo_stack());

        let objects = graph
            .objects
            .iter()
            .map(|node| {
                let class = ObjectType::find_class(&node.class).ok_or_else(|| {
                    RefGraphError::Stream(format!("unknown class {}", node.class))
                })?;
                class.create_instance(self.dataset)
            })
            .collect::<Result<Vec<_>>>()?;

        for (node, object) in graph.objects.iter().zip(&objects) {
            self.load_fields(node, object, &objects)?;
        }

        let roots = graph
            .roots
            .iter()
            .map(|&index| resolve(&objects, index))
            .collect::<Result<Vec<_>>>()?;
        debug!(objects = objects.len(), roots = roots.len(), "loaded object graph");
        Ok(roots)
    }

    /// Decode JSON and load it.
    pub fn from_json(&self, json: &str) -> Result<Vec<OORef<dyn RefTarget>>> {
        self.load(&SerializedGraph::from_json(json)?)
    }

    fn load_fields(
        &self,
        node: &SerializedObject,
        object: &OORef<dyn RefTarget>,
        objects: &[OORef<dyn RefTarget>],
    ) -> Result<()> {
        let class = object.oo_type();
        let owner = object.as_ref_maker();

        for (identifier, value) in &node.properties {
            match class.find_field(identifier) {
                Some(field) if matches!(field.kind(), FieldKind::Property(_)) => {
                    owner.set_property_field_value(field, value)?;
                }
                Some(_) => {
                    return Err(RefGraphError::Stream(format!(
                        "field '{}' of class {} is not a property field",
                        identifier,
                        class.name()
                    )));
                }
                None => debug!(class = class.name(), field = %identifier, "skipping unknown property"),
            }
        }

        for (identifier, reference) in &node.references {
            let Some(field) = class.find_field(identifier) else {
                debug!(class = class.name(), field = %identifier, "skipping unknown reference field");
                continue;
            };
            match (field.kind(), reference) {
                (FieldKind::Reference { .. }, SerializedReference::Single(index)) => {
                    let target = index.map(|i| resolve(objects, i)).transpose()?;
                    field.single_field(owner).set_target(owner, target)?;
                }
                (FieldKind::Vector { .. }, SerializedReference::Vector(indices)) => {
                    let vector = field.vector_field(owner);
                    vector.clear(owner);
                    for &i in indices {
                        vector.push(owner, resolve(objects, i)?)?;
                    }
                }
                _ => {
                    return Err(RefGraphError::Stream(format!(
                        "stored kind of field '{}' of class {} does not match its declaration",
                        identifier,
                        class.name()
                    )));
                }
            }
        }

        if let Some(extra) = &node.extra {
            owner.load_extra_data(extra)?;
        }
        Ok(())
    }
}

fn resolve(objects: &[OORef<dyn RefTarget>], index: usize) -> Result<OORef<dyn RefTarget>> {
    objects
        .get(index)
        .cloned()
        .ok_or_else(|| RefGraphError::Stream(format!("node index {} out of range", index)))
}
