//! Sample object classes shared by the integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use refgraph::*;

thread_local! {
    static JOURNAL: RefCell<Vec<ObjectId>> = const { RefCell::new(Vec::new()) };
}

/// Objects that received an event on this thread, in delivery order.
pub fn take_journal() -> Vec<ObjectId> {
    JOURNAL.with(|journal| std::mem::take(&mut *journal.borrow_mut()))
}

fn record_delivery(receiver: ObjectId) {
    JOURNAL.with(|journal| journal.borrow_mut().push(receiver));
}

/// Make every sample class known to the class registry.
pub fn register_classes() {
    for class in [
        &MATERIAL_TYPE,
        &GLASS_TYPE,
        &SHAPE_TYPE,
        &CUBE_TYPE,
        &GROUP_TYPE,
        &OBSERVER_TYPE,
        &SKETCH_TYPE,
        &NOTE_TYPE,
        &IMPOSTOR_TYPE,
    ] {
        class.register();
    }
}

/// Identities of a list of objects.
pub fn ids<T: ?Sized>(objects: &[OORef<T>]) -> Vec<ObjectId> {
    objects.iter().map(OORef::id).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Material: a leaf target with plain properties
// ═══════════════════════════════════════════════════════════════════════

pub static MATERIAL_TYPE: ObjectType =
    ObjectType::new("Material", Some(&REF_TARGET_TYPE), &MATERIAL_FIELDS)
        .with_factory(|dataset| Material::new(dataset).to_target());

static MATERIAL_FIELDS: [&PropertyFieldDescriptor; 2] = [&MATERIAL_NAME, &MATERIAL_SHININESS];

pub static MATERIAL_NAME: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &MATERIAL_TYPE,
    "name",
    PropertyFieldFlags::empty(),
    |owner| &owner_cast::<Material>(owner).name,
);

pub static MATERIAL_SHININESS: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &MATERIAL_TYPE,
    "shininess",
    PropertyFieldFlags::MEMORIZE,
    |owner| &owner_cast::<Material>(owner).shininess,
);

pub struct Material {
    core: ObjectCore,
    pub name: PropertyField<String>,
    pub shininess: PropertyField<f64>,
    /// Identifiers passed to `property_changed`
    pub changes: RefCell<Vec<&'static str>>,
}

impl Material {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Material> {
        OORef::new_object(dataset, |core| Material {
            core,
            name: PropertyField::new(&MATERIAL_NAME, String::from("default")),
            shininess: PropertyField::new(&MATERIAL_SHININESS, 0.5),
            changes: RefCell::new(Vec::new()),
        })
    }

    pub fn named(dataset: &Rc<DataSet>, name: &str) -> OORef<Material> {
        let material = Material::new(dataset);
        {
            let _suspender = UndoSuspender::new(dataset.undo_stack());
            material.set_name(name);
        }
        material
    }

    pub fn set_name(&self, name: &str) {
        self.name.set(self, name.to_string());
    }
}

impl RefMaker for Material {
    fn property_changed(&self, field: &'static PropertyFieldDescriptor) {
        self.changes.borrow_mut().push(field.identifier());
    }
}

impl RefTarget for Material {}

object_class!(target Material => MATERIAL_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Glass: a subclass of Material implemented by its own struct
// ═══════════════════════════════════════════════════════════════════════

pub static GLASS_TYPE: ObjectType = ObjectType::new("Glass", Some(&MATERIAL_TYPE), &[])
    .with_factory(|dataset| Glass::new(dataset).to_target());

pub struct Glass {
    core: ObjectCore,
}

impl Glass {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Glass> {
        OORef::new_object(dataset, |core| Glass { core })
    }
}

impl RefMaker for Glass {}

impl RefTarget for Glass {}

object_class!(target Glass => GLASS_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Shape: abstract base class without fields
// ═══════════════════════════════════════════════════════════════════════

pub static SHAPE_TYPE: ObjectType = ObjectType::new("Shape", Some(&REF_TARGET_TYPE), &[]);

// ═══════════════════════════════════════════════════════════════════════
// Cube: typed reference fields
// ═══════════════════════════════════════════════════════════════════════

pub static CUBE_TYPE: ObjectType = ObjectType::new("Cube", Some(&SHAPE_TYPE), &CUBE_FIELDS)
    .with_factory(|dataset| Cube::new(dataset).to_target());

static CUBE_FIELDS: [&PropertyFieldDescriptor; 4] =
    [&CUBE_SIZE, &CUBE_LABEL, &CUBE_MATERIAL, &CUBE_PARTS];

pub static CUBE_SIZE: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &CUBE_TYPE,
    "size",
    PropertyFieldFlags::MEMORIZE.union(PropertyFieldFlags::NO_ANIMATION),
    |owner| &owner_cast::<Cube>(owner).size,
)
.with_display_name("Edge length");

pub static CUBE_LABEL: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &CUBE_TYPE,
    "label",
    PropertyFieldFlags::empty(),
    |owner| &owner_cast::<Cube>(owner).label,
);

pub static CUBE_MATERIAL: PropertyFieldDescriptor = PropertyFieldDescriptor::reference(
    &CUBE_TYPE,
    "material",
    &MATERIAL_TYPE,
    PropertyFieldFlags::empty(),
    |owner| owner_cast::<Cube>(owner).material.base(),
);

pub static CUBE_PARTS: PropertyFieldDescriptor = PropertyFieldDescriptor::vector(
    &CUBE_TYPE,
    "parts",
    &MATERIAL_TYPE,
    PropertyFieldFlags::empty(),
    |owner| owner_cast::<Cube>(owner).parts.base(),
);

pub struct Cube {
    core: ObjectCore,
    pub size: PropertyField<f64>,
    pub label: PropertyField<String>,
    pub material: ReferenceField<Material>,
    pub parts: VectorReferenceField<Material>,
    /// Hook calls, as readable strings
    pub log: RefCell<Vec<String>>,
}

impl Cube {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Cube> {
        OORef::new_object(dataset, |core| Cube {
            core,
            size: PropertyField::new(&CUBE_SIZE, 1.0),
            label: PropertyField::new(&CUBE_LABEL, String::new()),
            material: ReferenceField::new(&CUBE_MATERIAL),
            parts: VectorReferenceField::new(&CUBE_PARTS),
            log: RefCell::new(Vec::new()),
        })
    }

    pub fn set_size(&self, size: f64) {
        self.size.set(self, size);
    }

    pub fn set_material(&self, material: Option<&OORef<Material>>) -> Result<()> {
        self.material.set(self, material)
    }

    pub fn add_part(&self, part: &OORef<Material>) -> Result<usize> {
        self.parts.push_back(self, part)
    }

    pub fn remove_part(&self, index: usize) -> OORef<dyn RefTarget> {
        self.parts.remove(self, index)
    }

    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

impl RefMaker for Cube {
    fn reference_replaced(
        &self,
        field: &'static PropertyFieldDescriptor,
        old_target: Option<&OORef<dyn RefTarget>>,
        new_target: Option<&OORef<dyn RefTarget>>,
    ) {
        self.log.borrow_mut().push(format!(
            "replaced {} ({} -> {})",
            field.identifier(),
            old_target.map_or("none".to_string(), |t| t.object_title()),
            new_target.map_or("none".to_string(), |t| t.object_title()),
        ));
    }

    fn reference_inserted(
        &self,
        field: &'static PropertyFieldDescriptor,
        target: &OORef<dyn RefTarget>,
        index: usize,
    ) {
        self.log.borrow_mut().push(format!(
            "inserted {} into {} at {}",
            target.object_title(),
            field.identifier(),
            index
        ));
    }

    fn reference_removed(
        &self,
        field: &'static PropertyFieldDescriptor,
        target: &OORef<dyn RefTarget>,
        index: usize,
    ) {
        self.log.borrow_mut().push(format!(
            "removed {} from {} at {}",
            target.object_title(),
            field.identifier(),
            index
        ));
    }

    fn property_changed(&self, field: &'static PropertyFieldDescriptor) {
        self.log
            .borrow_mut()
            .push(format!("changed {}", field.identifier()));
    }
}

impl RefTarget for Cube {}

object_class!(target Cube => CUBE_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Group: untyped fields covering every reference flag
// ═══════════════════════════════════════════════════════════════════════

pub static GROUP_TYPE: ObjectType = ObjectType::new("Group", Some(&REF_TARGET_TYPE), &GROUP_FIELDS)
    .with_factory(|dataset| Group::new(dataset).to_target());

static GROUP_FIELDS: [&PropertyFieldDescriptor; 7] = [
    &GROUP_NAME,
    &GROUP_REVISION,
    &GROUP_LINK,
    &GROUP_CHILDREN,
    &GROUP_WEAK_LINK,
    &GROUP_SHARED,
    &GROUP_OWNED,
];

pub static GROUP_NAME: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &GROUP_TYPE,
    "name",
    PropertyFieldFlags::empty(),
    |owner| &owner_cast::<Group>(owner).name,
);

pub static GROUP_REVISION: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &GROUP_TYPE,
    "revision",
    PropertyFieldFlags::INTERNAL,
    |owner| &owner_cast::<Group>(owner).revision,
);

pub static GROUP_LINK: PropertyFieldDescriptor = PropertyFieldDescriptor::reference(
    &GROUP_TYPE,
    "link",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::empty(),
    |owner| &owner_cast::<Group>(owner).link,
);

pub static GROUP_CHILDREN: PropertyFieldDescriptor = PropertyFieldDescriptor::vector(
    &GROUP_TYPE,
    "children",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::empty(),
    |owner| &owner_cast::<Group>(owner).children,
);

pub static GROUP_WEAK_LINK: PropertyFieldDescriptor = PropertyFieldDescriptor::reference(
    &GROUP_TYPE,
    "weak_link",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::WEAK_REF,
    |owner| &owner_cast::<Group>(owner).weak_link,
);

pub static GROUP_SHARED: PropertyFieldDescriptor = PropertyFieldDescriptor::reference(
    &GROUP_TYPE,
    "shared",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::NEVER_CLONE_TARGET,
    |owner| &owner_cast::<Group>(owner).shared,
);

pub static GROUP_OWNED: PropertyFieldDescriptor = PropertyFieldDescriptor::reference(
    &GROUP_TYPE,
    "owned",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::ALWAYS_DEEP_COPY,
    |owner| &owner_cast::<Group>(owner).owned,
);

pub struct Group {
    core: ObjectCore,
    pub name: PropertyField<String>,
    pub revision: PropertyField<i32>,
    pub link: SingleReferenceFieldBase,
    pub children: VectorReferenceFieldBase,
    pub weak_link: SingleReferenceFieldBase,
    pub shared: SingleReferenceFieldBase,
    pub owned: SingleReferenceFieldBase,
    /// Kinds of all events received from referenced targets
    pub events: RefCell<Vec<ReferenceEventType>>,
    /// When set, received events are not passed on
    pub block_events: Cell<bool>,
}

impl Group {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Group> {
        OORef::new_object(dataset, |core| Group {
            core,
            name: PropertyField::new(&GROUP_NAME, String::new()),
            revision: PropertyField::new(&GROUP_REVISION, 0),
            link: SingleReferenceFieldBase::new(&GROUP_LINK),
            children: VectorReferenceFieldBase::new(&GROUP_CHILDREN),
            weak_link: SingleReferenceFieldBase::new(&GROUP_WEAK_LINK),
            shared: SingleReferenceFieldBase::new(&GROUP_SHARED),
            owned: SingleReferenceFieldBase::new(&GROUP_OWNED),
            events: RefCell::new(Vec::new()),
            block_events: Cell::new(false),
        })
    }

    pub fn set_link(&self, target: Option<&OORef<dyn RefTarget>>) -> Result<()> {
        self.link.set_target(self, target.cloned())
    }

    pub fn set_weak_link(&self, target: Option<&OORef<dyn RefTarget>>) -> Result<()> {
        self.weak_link.set_target(self, target.cloned())
    }

    pub fn set_shared(&self, target: Option<&OORef<dyn RefTarget>>) -> Result<()> {
        self.shared.set_target(self, target.cloned())
    }

    pub fn set_owned(&self, target: Option<&OORef<dyn RefTarget>>) -> Result<()> {
        self.owned.set_target(self, target.cloned())
    }

    pub fn add_child(&self, child: &OORef<dyn RefTarget>) -> Result<usize> {
        self.children.push(self, child.clone())
    }

    pub fn take_events(&self) -> Vec<ReferenceEventType> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl RefMaker for Group {
    fn reference_event(&self, _source: &OORef<dyn RefTarget>, event: &ReferenceEvent) -> bool {
        record_delivery(self.core.id());
        self.events.borrow_mut().push(event.kind());
        !self.block_events.get()
    }
}

impl RefTarget for Group {
    fn object_title(&self) -> String {
        let name = self.name.get();
        if name.is_empty() {
            "Group".to_string()
        } else {
            name
        }
    }
}

object_class!(target Group => GROUP_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Observer: a maker that cannot be referenced
// ═══════════════════════════════════════════════════════════════════════

pub static OBSERVER_TYPE: ObjectType =
    ObjectType::new("Observer", Some(&REF_MAKER_TYPE), &OBSERVER_FIELDS);

static OBSERVER_FIELDS: [&PropertyFieldDescriptor; 2] = [&OBSERVER_WATCHED, &OBSERVER_WATCH_LIST];

pub static OBSERVER_WATCHED: PropertyFieldDescriptor = PropertyFieldDescriptor::reference(
    &OBSERVER_TYPE,
    "watched",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::NO_UNDO,
    |owner| &owner_cast::<Observer>(owner).watched,
);

pub static OBSERVER_WATCH_LIST: PropertyFieldDescriptor = PropertyFieldDescriptor::vector(
    &OBSERVER_TYPE,
    "watch_list",
    &REF_TARGET_TYPE,
    PropertyFieldFlags::NO_UNDO,
    |owner| &owner_cast::<Observer>(owner).watch_list,
);

/// One event as seen by an [`Observer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub kind: ReferenceEventType,
    pub sender: ObjectId,
    pub field: Option<&'static str>,
    pub index: Option<usize>,
}

pub struct Observer {
    core: ObjectCore,
    pub watched: SingleReferenceFieldBase,
    pub watch_list: VectorReferenceFieldBase,
    pub seen: RefCell<Vec<Seen>>,
}

impl Observer {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Observer> {
        OORef::new_object(dataset, |core| Observer {
            core,
            watched: SingleReferenceFieldBase::new(&OBSERVER_WATCHED),
            watch_list: VectorReferenceFieldBase::new(&OBSERVER_WATCH_LIST),
            seen: RefCell::new(Vec::new()),
        })
    }

    /// Create an observer watching `target`.
    pub fn watching(dataset: &Rc<DataSet>, target: &OORef<dyn RefTarget>) -> OORef<Observer> {
        let observer = Observer::new(dataset);
        observer
            .watched
            .set_target(&*observer, Some(target.clone()))
            .expect("observers can watch any target");
        observer
    }

    pub fn take_seen(&self) -> Vec<Seen> {
        std::mem::take(&mut *self.seen.borrow_mut())
    }

    pub fn take_kinds(&self) -> Vec<ReferenceEventType> {
        self.take_seen().into_iter().map(|seen| seen.kind).collect()
    }
}

impl RefMaker for Observer {
    fn reference_event(&self, _source: &OORef<dyn RefTarget>, event: &ReferenceEvent) -> bool {
        record_delivery(self.core.id());
        self.seen.borrow_mut().push(Seen {
            kind: event.kind(),
            sender: event.sender().id(),
            field: event.field().map(|field| field.identifier()),
            index: event.index(),
        });
        true
    }
}

object_class!(maker Observer => OBSERVER_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Sketch: a target class without a factory
// ═══════════════════════════════════════════════════════════════════════

pub static SKETCH_TYPE: ObjectType = ObjectType::new("Sketch", Some(&REF_TARGET_TYPE), &[]);

pub struct Sketch {
    core: ObjectCore,
}

impl Sketch {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Sketch> {
        OORef::new_object(dataset, |core| Sketch { core })
    }
}

impl RefMaker for Sketch {}

impl RefTarget for Sketch {}

object_class!(target Sketch => SKETCH_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Note: data outside the field system
// ═══════════════════════════════════════════════════════════════════════

pub static NOTE_TYPE: ObjectType = ObjectType::new("Note", Some(&REF_TARGET_TYPE), &NOTE_FIELDS)
    .with_factory(|dataset| Note::new(dataset).to_target());

static NOTE_FIELDS: [&PropertyFieldDescriptor; 1] = [&NOTE_TEXT];

pub static NOTE_TEXT: PropertyFieldDescriptor = PropertyFieldDescriptor::property(
    &NOTE_TYPE,
    "text",
    PropertyFieldFlags::empty(),
    |owner| &owner_cast::<Note>(owner).text,
);

pub struct Note {
    core: ObjectCore,
    pub text: PropertyField<String>,
    pub tags: RefCell<Vec<String>>,
}

impl Note {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Note> {
        OORef::new_object(dataset, |core| Note {
            core,
            text: PropertyField::new(&NOTE_TEXT, String::new()),
            tags: RefCell::new(Vec::new()),
        })
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.borrow().clone()
    }
}

impl RefMaker for Note {
    fn save_extra_data(&self) -> Option<Value> {
        Some(self.tags.borrow().to_value())
    }

    fn load_extra_data(&self, data: &Value) -> Result<()> {
        *self.tags.borrow_mut() = Vec::<String>::from_value(data)?;
        Ok(())
    }
}

impl RefTarget for Note {
    fn clone_object(&self, deep_copy: bool, helper: &mut CloneHelper) -> Result<OORef<dyn RefTarget>> {
        let clone = clone_fields(self, deep_copy, helper)?;
        if let Some(note) = clone.downcast::<Note>() {
            *note.tags.borrow_mut() = self.tags();
        }
        Ok(clone)
    }

    fn object_title(&self) -> String {
        self.text.get()
    }
}

object_class!(target Note => NOTE_TYPE);

// ═══════════════════════════════════════════════════════════════════════
// Impostor: a clone override returning an unrelated class
// ═══════════════════════════════════════════════════════════════════════

pub static IMPOSTOR_TYPE: ObjectType = ObjectType::new("Impostor", Some(&REF_TARGET_TYPE), &[])
    .with_factory(|dataset| Impostor::new(dataset).to_target());

pub struct Impostor {
    core: ObjectCore,
}

impl Impostor {
    pub fn new(dataset: &Rc<DataSet>) -> OORef<Impostor> {
        OORef::new_object(dataset, |core| Impostor { core })
    }
}

impl RefMaker for Impostor {}

impl RefTarget for Impostor {
    fn clone_object(&self, _deep_copy: bool, _helper: &mut CloneHelper) -> Result<OORef<dyn RefTarget>> {
        let dataset = self.core.dataset().ok_or(RefGraphError::DataSetReleased)?;
        Ok(Material::new(&dataset).to_target())
    }
}

object_class!(target Impostor => IMPOSTOR_TYPE);
