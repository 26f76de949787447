//! Tests for cloning objects and sub-graphs

mod common;

use common::*;
use pretty_assertions::assert_eq;
use refgraph::*;

fn clone_group(group: &OORef<Group>, deep_copy: bool) -> OORef<Group> {
    CloneHelper::new().clone_typed(group, deep_copy).unwrap()
}

#[test]
fn test_clone_copies_properties() {
    let dataset = DataSet::new();
    let cube = Cube::new(&dataset);
    cube.set_size(3.5);
    cube.label.set(&*cube, "box".to_string());

    let copy = CloneHelper::new().clone_typed(&cube, false).unwrap();

    assert_ne!(copy.id(), cube.id());
    assert_eq!(copy.size.get(), 3.5);
    assert_eq!(copy.label.get(), "box");
}

#[test]
fn test_shallow_clone_shares_targets() {
    let dataset = DataSet::new();
    let cube = Cube::new(&dataset);
    let material = Material::new(&dataset);
    cube.set_material(Some(&material)).unwrap();
    cube.add_part(&material).unwrap();

    let copy = CloneHelper::new().clone_typed(&cube, false).unwrap();

    assert_eq!(copy.material.get().map(|m| m.id()), Some(material.id()));
    assert_eq!(ids(&copy.parts.to_vec()), vec![material.id()]);
    assert_eq!(ids(&material.dependents()), vec![cube.id(), copy.id()]);
}

#[test]
fn test_deep_clone_copies_targets() {
    let dataset = DataSet::new();
    let cube = Cube::new(&dataset);
    let material = Material::named(&dataset, "steel");
    cube.set_material(Some(&material)).unwrap();

    let copy = CloneHelper::new().clone_typed(&cube, true).unwrap();
    let copied_material = copy.material.get().unwrap();

    assert_ne!(copied_material.id(), material.id());
    assert_eq!(copied_material.name.get(), "steel");
    assert_eq!(ids(&material.dependents()), vec![cube.id()]);
    assert_eq!(ids(&copied_material.dependents()), vec![copy.id()]);
}

#[test]
fn test_deep_clone_preserves_shared_structure() {
    let dataset = DataSet::new();
    let cube = Cube::new(&dataset);
    let shared = Material::new(&dataset);
    let other = Material::new(&dataset);
    cube.set_material(Some(&shared)).unwrap();
    cube.add_part(&shared).unwrap();
    cube.add_part(&other).unwrap();
    cube.add_part(&shared).unwrap();

    let mut helper = CloneHelper::new();
    let copy = helper.clone_typed(&cube, true).unwrap();
    let parts = copy.parts.to_vec();

    assert_eq!(helper.len(), 3);
    let material = copy.material.get().unwrap();
    assert_eq!(parts[0].id(), material.id());
    assert_eq!(parts[2].id(), material.id());
    assert_ne!(parts[1].id(), material.id());
    assert_ne!(material.id(), shared.id());
}

#[test]
fn test_one_helper_shares_clones_between_roots() {
    let dataset = DataSet::new();
    let material = Material::new(&dataset);
    let a = Cube::new(&dataset);
    let b = Cube::new(&dataset);
    a.set_material(Some(&material)).unwrap();
    b.set_material(Some(&material)).unwrap();

    let mut helper = CloneHelper::new();
    let a2 = helper.clone_typed(&a, true).unwrap();
    let b2 = helper.clone_typed(&b, true).unwrap();
    assert_eq!(
        a2.material.get().map(|m| m.id()),
        b2.material.get().map(|m| m.id())
    );

    let separate = CloneHelper::new().clone_typed(&b, true).unwrap();
    assert_ne!(
        separate.material.get().map(|m| m.id()),
        a2.material.get().map(|m| m.id())
    );
}

#[test]
fn test_cloning_the_same_object_twice_returns_one_copy() {
    let dataset = DataSet::new();
    let material = Material::new(&dataset).to_target();
    let mut helper = CloneHelper::new();

    let first = helper.clone_target(&material, false).unwrap();
    let second = helper.clone_target(&material, true).unwrap();
    assert_eq!(first, second);
    assert!(helper.clone_object(None, true).unwrap().is_none());
}

#[test]
fn test_clone_flags() {
    let dataset = DataSet::new();
    let group = Group::new(&dataset);
    let linked = Material::new(&dataset).to_target();
    let shared = Material::new(&dataset).to_target();
    let owned = Material::new(&dataset).to_target();
    group.set_link(Some(&linked)).unwrap();
    group.set_shared(Some(&shared)).unwrap();
    group.set_owned(Some(&owned)).unwrap();

    let shallow = clone_group(&group, false);
    assert_eq!(shallow.link.target_id(), Some(linked.id()));
    assert_eq!(shallow.shared.target_id(), Some(shared.id()));
    assert_ne!(shallow.owned.target_id(), Some(owned.id()));

    let deep = clone_group(&group, true);
    assert_ne!(deep.link.target_id(), Some(linked.id()));
    assert_eq!(deep.shared.target_id(), Some(shared.id()));
    assert_ne!(deep.owned.target_id(), Some(owned.id()));
}

#[test]
fn test_always_deep_copy_propagates_deep_flag() {
    let dataset = DataSet::new();
    let group = Group::new(&dataset);
    let inner = Group::new(&dataset);
    let leaf = Material::new(&dataset).to_target();
    inner.set_link(Some(&leaf)).unwrap();
    group.set_owned(Some(&inner.to_target())).unwrap();

    let copy = clone_group(&group, false);
    let inner_copy = copy.owned.target().unwrap().downcast::<Group>().unwrap();

    assert_ne!(inner_copy.id(), inner.id());
    assert_ne!(inner_copy.link.target_id(), Some(leaf.id()));
}

#[test]
fn test_weak_reference_is_shared() {
    let dataset = DataSet::new();
    let group = Group::new(&dataset);
    let material = Material::new(&dataset).to_target();
    group.set_weak_link(Some(&material)).unwrap();

    let copy = clone_group(&group, true);
    assert_eq!(copy.weak_link.target_id(), Some(material.id()));
    assert!(material.dependents().is_empty());
}

#[test]
fn test_weak_reference_to_cloned_object_stays_on_source() {
    let dataset = DataSet::new();
    let parent = Group::new(&dataset);
    let child = Group::new(&dataset);
    parent.add_child(&child.to_target()).unwrap();
    child.set_weak_link(Some(&parent.to_target())).unwrap();

    let copy = clone_group(&parent, true);
    let child_copy = copy.children.get(0).unwrap().downcast::<Group>().unwrap();

    assert_ne!(child_copy.id(), child.id());
    assert_eq!(child_copy.weak_link.target_id(), Some(parent.id()));
}

#[test]
fn test_clone_override_copies_extra_state() {
    let dataset = DataSet::new();
    let note = Note::new(&dataset);
    note.text.set(&*note, "hello".to_string());
    note.tags.borrow_mut().push("greeting".to_string());

    let copy = CloneHelper::new().clone_typed(&note, false).unwrap();

    assert_eq!(copy.text.get(), "hello");
    assert_eq!(copy.tags(), vec!["greeting"]);
    assert_eq!(copy.object_title(), "hello");
}

#[test]
fn test_class_without_factory_is_not_cloneable() {
    let dataset = DataSet::new();
    let sketch = Sketch::new(&dataset).to_target();
    let result = CloneHelper::new().clone_target(&sketch, false);
    assert!(matches!(result, Err(RefGraphError::NotCloneable { .. })));
}

#[test]
fn test_referenced_class_without_factory_fails_deep_clone() {
    let dataset = DataSet::new();
    let group = Group::new(&dataset);
    group.set_link(Some(&Sketch::new(&dataset).to_target())).unwrap();

    assert!(CloneHelper::new().clone_typed(&group, false).is_ok());
    assert!(matches!(
        CloneHelper::new().clone_typed(&group, true),
        Err(RefGraphError::NotCloneable { class }) if class == "Sketch"
    ));
}

#[test]
fn test_override_returning_wrong_class_is_rejected() {
    let dataset = DataSet::new();
    let impostor = Impostor::new(&dataset).to_target();
    let result = CloneHelper::new().clone_target(&impostor, false);
    assert!(matches!(
        result,
        Err(RefGraphError::InvalidClone { class, got }) if class == "Impostor" && got == "Material"
    ));
}

#[test]
fn test_clone_is_recorded_as_one_step() {
    let dataset = DataSet::new();
    let cube = Cube::new(&dataset);
    let material = Material::new(&dataset);
    cube.set_material(Some(&material)).unwrap();

    let copy = dataset
        .undoable_transaction("Clone", || CloneHelper::new().clone_typed(&cube, false))
        .unwrap();
    assert_eq!(ids(&material.dependents()), vec![cube.id(), copy.id()]);

    dataset.undo_stack().undo().unwrap();
    assert!(copy.material.is_empty());
    assert_eq!(ids(&material.dependents()), vec![cube.id()]);
}

#[test]
fn test_copy_reference_follows_deep_flag() {
    let dataset = DataSet::new();
    let material = Material::new(&dataset);
    let mut helper = CloneHelper::new();

    let shared = helper.copy_typed(&material, false).unwrap();
    assert_eq!(shared.id(), material.id());
    assert!(helper.is_empty());

    let copied = helper.copy_typed(&material, true).unwrap();
    assert_ne!(copied.id(), material.id());
    assert_eq!(helper.len(), 1);
}

#[test]
fn test_helper_lists_clones_in_creation_order() {
    let dataset = DataSet::new();
    let cube = Cube::new(&dataset);
    let first = Material::new(&dataset);
    let second = Material::new(&dataset);
    cube.set_material(Some(&first)).unwrap();
    cube.add_part(&second).unwrap();

    let mut helper = CloneHelper::new();
    let copy = helper.clone_typed(&cube, true).unwrap();

    let sources: Vec<_> = helper.clones().map(|(source, _)| source.id()).collect();
    assert_eq!(sources, vec![first.id(), second.id(), cube.id()]);
    let (_, last) = helper.clones().last().unwrap();
    assert_eq!(last.id(), copy.id());
}
