//! Content binding between observable lists and list properties.

use std::cell::Cell;
use std::rc::Rc;

use proplink::{BindError, ContentBindMode, ListProperty, ObservableList};

fn change_counter<E: Clone + PartialEq + 'static>(list: &ObservableList<E>) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let count_clone = Rc::clone(&count);
    list.on_change(move |_| count_clone.set(count_clone.get() + 1));
    count
}

#[test]
fn unidirectional_binding_mirrors_source() {
    let source = ObservableList::from_vec(vec![1, 2, 3]);
    let target = ObservableList::from_vec(vec![9]);
    target.bind_content(&source).unwrap();
    assert!(target.is_content_bound());
    assert!(!source.is_content_bound());
    assert_eq!(target.to_vec(), vec![1, 2, 3]);

    source.push(4);
    source.insert(0, 0);
    source.remove(2);
    source.set(0, 10);
    source.replace_range(1..3, vec![7]);
    assert_eq!(target.to_vec(), source.to_vec());

    source.clear();
    assert!(target.is_empty());
}

#[test]
fn rebinding_same_source_notifies_once() {
    let a = ObservableList::<&str>::new();
    let b = ObservableList::new();
    a.bind_content(&b).unwrap();
    a.bind_content(&b).unwrap();

    let count = change_counter(&a);
    b.push("x");
    assert_eq!(count.get(), 1);
    assert_eq!(b.change_listener_count(), 1);
}

#[test]
fn unbind_content_keeps_elements() {
    let source = ObservableList::from_vec(vec!["a"]);
    let target = ObservableList::new();
    target.bind_content(&source).unwrap();
    target.unbind_content();
    target.unbind_content();

    assert!(!target.is_content_bound());
    source.push("b");
    assert_eq!(target.to_vec(), vec!["a"]);
}

#[test]
fn direct_mutation_tears_unidirectional_binding_down() {
    let a = ObservableList::new();
    let b = ObservableList::from_vec(vec![1]);
    a.bind_content(&b).unwrap();

    a.push(2);
    assert!(!a.is_content_bound());
    assert_eq!(b.change_listener_count(), 0);

    b.push(3);
    assert_eq!(a.to_vec(), vec![1, 2]);
    assert_eq!(b.to_vec(), vec![1, 3]);
}

#[test]
fn bidirectional_after_unidirectional_conflicts() {
    let a = ObservableList::<i32>::named("a");
    let b = ObservableList::named("b");
    a.bind_content(&b).unwrap();

    let err = a.bind_content_bidirectional(&b).unwrap_err();
    assert_eq!(err, BindError::conflict(ContentBindMode::Bidirectional, "a"));
    assert!(a.is_content_bound());
    assert!(!a.is_content_bound_bidirectional());
    assert!(!b.is_content_bound_bidirectional());
}

#[test]
fn unidirectional_after_bidirectional_conflicts() {
    let a = ObservableList::<i32>::named("a");
    let b = ObservableList::named("b");
    a.bind_content_bidirectional(&b).unwrap();

    let err = a.bind_content(&b).unwrap_err();
    assert_eq!(err, BindError::conflict(ContentBindMode::Unidirectional, "a"));
    assert!(!a.is_content_bound());
    assert!(a.is_content_bound_bidirectional());
}

#[test]
fn bidirectional_conflict_on_the_other_endpoint_touches_nothing() {
    let a = ObservableList::from_vec(vec![1]);
    let b = ObservableList::from_vec(vec![2]);
    let c = ObservableList::from_vec(vec![2]);
    b.bind_content(&c).unwrap();

    let a_changes = change_counter(&a);
    assert!(matches!(
        a.bind_content_bidirectional(&b),
        Err(BindError::ContentBindConflict {
            mode: ContentBindMode::Bidirectional,
            ..
        })
    ));
    assert_eq!(a.to_vec(), vec![1]);
    assert_eq!(a_changes.get(), 0);
    assert!(b.is_content_bound());
}

#[test]
fn bidirectional_binding_converges_and_unbinds() {
    let a = ObservableList::new();
    let b = ObservableList::new();
    a.bind_content_bidirectional(&b).unwrap();

    b.push("foo");
    assert_eq!(a.len(), 1);

    a.unbind_content_bidirectional(&b).unwrap();
    b.push("bar");
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 2);
}

#[test]
fn rebinding_same_bidirectional_pair_notifies_once() {
    let a = ObservableList::new();
    let b = ObservableList::new();
    a.bind_content_bidirectional(&b).unwrap();
    a.bind_content_bidirectional(&b).unwrap();
    b.bind_content_bidirectional(&a).unwrap();

    let a_changes = change_counter(&a);
    let b_changes = change_counter(&b);
    b.push(1);
    assert_eq!(a_changes.get(), 1);
    assert_eq!(b_changes.get(), 1);

    a.push(2);
    assert_eq!(a_changes.get(), 2);
    assert_eq!(b_changes.get(), 2);
    assert_eq!(b.to_vec(), vec![1, 2]);
}

#[test]
fn bidirectional_binding_adopts_other_content() {
    let a = ObservableList::from_vec(vec!["stale"]);
    let b = ObservableList::from_vec(vec!["x", "y"]);
    a.bind_content_bidirectional(&b).unwrap();
    assert_eq!(a.to_vec(), vec!["x", "y"]);
    assert_eq!(b.to_vec(), vec!["x", "y"]);
}

#[test]
fn self_content_binding_is_rejected() {
    let a = ObservableList::<i32>::named("a");
    assert_eq!(
        a.bind_content(&a.clone()).unwrap_err(),
        BindError::self_binding("a")
    );
    assert_eq!(
        a.bind_content_bidirectional(&a).unwrap_err(),
        BindError::self_binding("a")
    );
    assert!(a.unbind_content_bidirectional(&a).is_err());
}

#[test]
fn sources_may_fan_out() {
    let source = ObservableList::from_vec(vec![0]);
    let left = ObservableList::new();
    let right = ObservableList::new();
    left.bind_content(&source).unwrap();
    right.bind_content(&source).unwrap();

    source.push(1);
    assert_eq!(left.to_vec(), vec![0, 1]);
    assert_eq!(right.to_vec(), vec![0, 1]);
}

#[test]
fn unidirectional_chain_propagates() {
    let first = ObservableList::new();
    let second = ObservableList::new();
    let third = ObservableList::new();
    second.bind_content(&first).unwrap();
    third.bind_content(&second).unwrap();

    first.extend(vec![1, 2]);
    assert_eq!(third.to_vec(), vec![1, 2]);
    assert!(second.is_content_bound());
}

#[test]
fn list_property_mirrors_source() {
    let source = ObservableList::from_vec(vec![1]);
    let property = ListProperty::named("items", ObservableList::new());
    property.bind_content(&source).unwrap();
    assert!(property.is_content_bound());

    source.push(2);
    assert_eq!(property.to_vec(), vec![1, 2]);

    property.unbind_content();
    assert!(!property.is_content_bound());
}

#[test]
fn list_property_bidirectional_with_list() {
    let model = ObservableList::from_vec(vec!["a".to_string()]);
    let view = ListProperty::new(ObservableList::new());
    view.bind_content_bidirectional(&model).unwrap();
    assert_eq!(view.to_vec(), vec!["a".to_string()]);

    view.push("b".to_string()).unwrap();
    assert_eq!(model.len(), 2);
    assert!(view.is_content_bound_bidirectional());

    view.unbind_content_bidirectional(&model).unwrap();
    model.push("c".to_string());
    assert_eq!(view.len(), 2);
}

#[test]
fn list_property_keeps_content_binding_across_list_switch() {
    let source = ObservableList::from_vec(vec![1]);
    let first = ObservableList::new();
    let target = ListProperty::new(first.clone());
    target.bind_content(&source).unwrap();

    let second = ObservableList::new();
    target.set(Some(second.clone())).unwrap();
    assert!(target.is_content_bound());
    assert_eq!(second.to_vec(), vec![1]);

    source.push(2);
    assert_eq!(target.to_vec(), vec![1, 2]);
    assert_eq!(first.to_vec(), vec![1]);

    // The list that was switched away from is no longer watched.
    first.push(9);
    assert!(target.is_content_bound());

    second.push(3);
    assert!(!target.is_content_bound());
    source.push(4);
    assert_eq!(second.to_vec(), vec![1, 2, 3]);
}

#[test]
fn content_binding_follows_source_property_list_switch() {
    let items = ListProperty::new(ObservableList::from_vec(vec![1]));
    let mirror = ObservableList::new();
    mirror.bind_content(&items).unwrap();

    let old = items.get().unwrap();
    let fresh = ObservableList::from_vec(vec![7, 8]);
    items.set(Some(fresh.clone())).unwrap();
    assert_eq!(mirror.to_vec(), vec![7, 8]);

    fresh.push(9);
    assert_eq!(items.to_vec(), vec![7, 8, 9]);
    assert_eq!(mirror.to_vec(), vec![7, 8, 9]);

    old.push(2);
    assert_eq!(mirror.to_vec(), vec![7, 8, 9]);
    assert!(mirror.is_content_bound());

    items.set(None).unwrap();
    assert!(mirror.is_empty());
}

#[test]
fn bidirectional_binding_follows_list_property_switch() {
    let model = ObservableList::from_vec(vec!["a"]);
    let view = ListProperty::new(ObservableList::new());
    view.bind_content_bidirectional(&model).unwrap();
    assert_eq!(view.to_vec(), vec!["a"]);

    let replacement = ObservableList::from_vec(vec!["x", "y"]);
    view.set(Some(replacement.clone())).unwrap();
    assert_eq!(model.to_vec(), vec!["x", "y"]);

    model.push("z");
    assert_eq!(replacement.to_vec(), vec!["x", "y", "z"]);
    replacement.remove(0);
    assert_eq!(model.to_vec(), vec!["y", "z"]);
    assert!(view.is_content_bound_bidirectional());
    assert!(model.is_content_bound_bidirectional());
}

fn empty_list_property(name: &str) -> ListProperty<&'static str> {
    let property = ListProperty::named(name, ObservableList::new());
    property.set(None).unwrap();
    property
}

#[test]
fn empty_list_property_content_bound_rejects_bidirectional() {
    let target = empty_list_property("target");
    let source = ObservableList::new();
    target.bind_content(&source).unwrap();

    assert_eq!(
        target.bind_content_bidirectional(&source).unwrap_err(),
        BindError::conflict(ContentBindMode::Bidirectional, "target")
    );
    assert!(target.is_content_bound());
}

#[test]
fn empty_list_property_bidirectionally_bound_rejects_unidirectional() {
    let target = empty_list_property("target");
    let source = ObservableList::new();
    target.bind_content_bidirectional(&source).unwrap();

    assert_eq!(
        target.bind_content(&source).unwrap_err(),
        BindError::conflict(ContentBindMode::Unidirectional, "target")
    );
    assert!(target.is_content_bound_bidirectional());
}

#[test]
fn empty_list_property_picks_up_content_once_it_holds_a_list() {
    let target = empty_list_property("target");
    let source = ObservableList::new();
    target.bind_content(&source).unwrap();
    source.push("foo");
    assert!(target.is_empty());

    let held = ObservableList::new();
    target.set(Some(held.clone())).unwrap();
    assert_eq!(held.to_vec(), vec!["foo"]);

    target.unbind_content();
    source.push("bar");
    assert_eq!(target.len(), 1);
}

#[test]
fn list_property_content_binding_is_replaced() {
    let target = ListProperty::new(ObservableList::new());
    let source = ListProperty::new(ObservableList::new());
    target.bind_content(&source).unwrap();
    target.bind_content(&source).unwrap();

    let calls = Rc::new(Cell::new(0));
    let calls_clone = Rc::clone(&calls);
    target.on_list_change(move |_| calls_clone.set(calls_clone.get() + 1));

    source.push("foo").unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn list_property_bidirectional_binding_is_replaced_and_removed() {
    let target = ListProperty::new(ObservableList::new());
    let source = ListProperty::new(ObservableList::new());
    target.bind_content_bidirectional(&source).unwrap();
    target.bind_content_bidirectional(&source).unwrap();

    let calls = Rc::new(Cell::new(0));
    let calls_clone = Rc::clone(&calls);
    target.on_list_change(move |_| calls_clone.set(calls_clone.get() + 1));

    source.push("foo").unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(target.len(), 1);

    target.unbind_content_bidirectional(&source).unwrap();
    source.push("bar").unwrap();
    assert_eq!(target.len(), 1);
}

#[test]
fn binding_to_an_empty_list_property_reports_null() {
    let empty = empty_list_property("empty");
    let list = ObservableList::new();
    assert_eq!(
        list.bind_content(&empty).unwrap_err(),
        BindError::null("empty")
    );
    assert_eq!(
        list.bind_content_bidirectional(&empty).unwrap_err(),
        BindError::null("empty")
    );
    assert!(!list.is_content_bound());
    assert!(empty.push("x").is_err());
}
