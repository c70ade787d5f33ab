use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use super::{Artifact, ObjectType};
use crate::collection::Collection;

pub type Factory<T> = Rc<dyn Fn(&str, &Value) -> Option<Rc<T>>>;
pub type CollectionCallback<T> = Rc<dyn Fn(&Rc<T>)>;

/// Index-or-name lookup accepted by [`ObjectCollection::get`].
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for Selector<'_> {
    fn from(index: usize) -> Self {
        Selector::Index(index)
    }
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(name: &'a str) -> Self {
        Selector::Name(name)
    }
}

/// Named, typed set of artifacts with creation and change callbacks.
///
/// Rejections (duplicate name, wrong object type, factory refusal) are
/// reported as `None`/`false`, never as errors.
pub struct ObjectCollection<T: Artifact> {
    item_type: ObjectType,
    items: RefCell<Collection<Rc<T>>>,
    factory: Option<Factory<T>>,
    added: RefCell<Option<CollectionCallback<T>>>,
    removed: RefCell<Option<CollectionCallback<T>>>,
}

impl<T: Artifact> ObjectCollection<T> {
    pub fn new(item_type: ObjectType) -> Self {
        Self {
            item_type,
            items: RefCell::new(Collection::new()),
            factory: None,
            added: RefCell::new(None),
            removed: RefCell::new(None),
        }
    }

    pub fn with_factory(item_type: ObjectType, factory: Factory<T>) -> Self {
        Self {
            factory: Some(factory),
            ..Self::new(item_type)
        }
    }

    pub fn item_type(&self) -> ObjectType {
        self.item_type
    }

    pub fn set_added_callback(&self, callback: impl Fn(&Rc<T>) + 'static) {
        *self.added.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn set_removed_callback(&self, callback: impl Fn(&Rc<T>) + 'static) {
        *self.removed.borrow_mut() = Some(Rc::new(callback));
    }

    /// Build a new item through the factory without inserting it.
    pub fn create(&self, name: &str, options: &Value) -> Option<Rc<T>> {
        let factory = self.factory.as_ref()?;
        factory(name, options)
    }

    /// Create an item by name through the factory and insert it.
    pub fn add(&self, name: &str, options: &Value) -> Option<Rc<T>> {
        if self.get_by_name(name).is_some() {
            return None;
        }
        let item = self.create(name, options)?;
        self.add_item(item)
    }

    /// Insert an item that was built elsewhere.
    pub fn add_item(&self, item: Rc<T>) -> Option<Rc<T>> {
        if item.object_type() != self.item_type {
            return None;
        }
        let name = item.name();
        {
            let mut items = self.items.borrow_mut();
            if items.any(|existing| existing.name() == name) {
                return None;
            }
            items.add(Rc::clone(&item));
        }
        let callback = self.added.borrow().clone();
        if let Some(callback) = callback {
            callback(&item);
        }
        Some(item)
    }

    pub fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut items = self.items.borrow_mut();
            match items.index_of(|item| item.name() == name) {
                Some(index) => items.remove_at(index),
                None => None,
            }
        };
        let Some(item) = removed else {
            return false;
        };
        let callback = self.removed.borrow().clone();
        if let Some(callback) = callback {
            callback(&item);
        }
        true
    }

    /// Remove every item, firing the removed callback for each.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.items.borrow_mut());
        let callback = self.removed.borrow().clone();
        if let Some(callback) = callback {
            for item in &drained {
                callback(item);
            }
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<Rc<T>> {
        self.items
            .borrow()
            .first_where(|item| item.name() == name)
            .cloned()
    }

    pub fn get_by_index(&self, index: usize) -> Option<Rc<T>> {
        self.items.borrow().get_by_index(index).cloned()
    }

    pub fn get<'a>(&self, selector: impl Into<Selector<'a>>) -> Option<Rc<T>> {
        match selector.into() {
            Selector::Index(index) => self.get_by_index(index),
            Selector::Name(name) => self.get_by_name(name),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Snapshot of the current items.
    pub fn to_vec(&self) -> Vec<Rc<T>> {
        self.items.borrow().iter().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.items.borrow().iter().map(|item| item.name()).collect()
    }

    pub fn matching(&self, predicate: impl Fn(&Rc<T>) -> bool) -> Collection<Rc<T>> {
        self.items.borrow().matching(predicate)
    }

    /// A collection of the same kind holding just `item`. Callbacks are not
    /// carried over.
    pub fn wrap(&self, item: Rc<T>) -> ObjectCollection<T> {
        let wrapped = ObjectCollection {
            item_type: self.item_type,
            items: RefCell::new(Collection::new()),
            factory: self.factory.clone(),
            added: RefCell::new(None),
            removed: RefCell::new(None),
        };
        wrapped.add_item(item);
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    struct Item {
        name: String,
        kind: ObjectType,
    }

    impl Artifact for Item {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn object_type(&self) -> ObjectType {
            self.kind
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn collection() -> ObjectCollection<Item> {
        ObjectCollection::with_factory(
            ObjectType::Param,
            Rc::new(|name: &str, _options: &Value| {
                if name.is_empty() {
                    return None;
                }
                Some(Rc::new(Item {
                    name: name.to_string(),
                    kind: ObjectType::Param,
                }))
            }),
        )
    }

    #[test]
    fn rejects_duplicate_names() {
        let items = collection();
        assert!(items.add("x", &json!({})).is_some());
        assert!(items.add("x", &json!({})).is_none());
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn rejects_wrong_item_type_and_factory_refusal() {
        let items = collection();
        let action = Rc::new(Item {
            name: "a".to_string(),
            kind: ObjectType::Action,
        });
        assert!(items.add_item(action).is_none());
        assert!(items.add("", &json!({})).is_none());
        assert!(items.is_empty());
    }

    #[test]
    fn collection_without_factory_creates_nothing() {
        let items: ObjectCollection<Item> = ObjectCollection::new(ObjectType::Param);
        assert!(items.add("x", &json!({})).is_none());
    }

    #[test]
    fn callbacks_fire_on_add_and_remove() {
        let items = collection();
        let added = Rc::new(Cell::new(0));
        let removed = Rc::new(Cell::new(0));
        {
            let added = Rc::clone(&added);
            items.set_added_callback(move |_| added.set(added.get() + 1));
            let removed = Rc::clone(&removed);
            items.set_removed_callback(move |_| removed.set(removed.get() + 1));
        }
        items.add("x", &json!({}));
        items.add("y", &json!({}));
        assert!(items.remove("x"));
        assert!(!items.remove("x"));
        assert_eq!((added.get(), removed.get()), (2, 1));
        assert_eq!(items.names(), vec!["y".to_string()]);
    }

    #[test]
    fn lookup_by_selector_and_wrap() {
        let items = collection();
        items.add("x", &json!({}));
        items.add("y", &json!({}));
        assert_eq!(items.get(1).map(|item| item.name()), Some("y".to_string()));
        assert_eq!(items.get("x").map(|item| item.name()), Some("x".to_string()));
        assert!(items.get("z").is_none());

        let wrapped = items.wrap(items.get("y").expect("y"));
        assert_eq!(wrapped.len(), 1);
        assert!(wrapped.add("w", &json!({})).is_some());
    }
}
