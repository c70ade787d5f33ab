use std::ops::ControlFlow;

/// Ordered, mutable sequence used as the backing store for every object set
/// in the framework. Insertion order is preserved and nothing here enforces
/// uniqueness; callers that need unique names check before inserting.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item to the end of the collection.
    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn push(&mut self, item: T) {
        self.add(item);
    }

    pub fn insert(&mut self, index: usize, item: T) -> bool {
        if index > self.items.len() {
            return false;
        }
        self.items.insert(index, item);
        true
    }

    pub fn get_by_index(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Index lookup from untyped input such as a selector string. Anything
    /// that is not a base-10 index yields `None`.
    pub fn get_by_index_str(&self, raw: &str) -> Option<&T> {
        let index = raw.trim().parse::<usize>().ok()?;
        self.get_by_index(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn first_where(&self, predicate: impl Fn(&T) -> bool) -> Option<&T> {
        self.items.iter().find(|item| predicate(item))
    }

    pub fn any(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.items.iter().any(predicate)
    }

    pub fn index_of(&self, predicate: impl Fn(&T) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    /// Visit items in insertion order. Returns `false` when the visitor broke
    /// out early.
    pub fn each(&self, mut visitor: impl FnMut(&T) -> ControlFlow<()>) -> bool {
        for item in &self.items {
            if visitor(item).is_break() {
                return false;
            }
        }
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Remove every item matching `predicate`, returning how many went.
    pub fn remove_where(&mut self, predicate: impl Fn(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Clone> Collection<T> {
    /// Materialise the items matching `predicate` into a new collection.
    pub fn matching(&self, predicate: impl Fn(&T) -> bool) -> Collection<T> {
        self.items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }
}

impl<T: PartialEq> Collection<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Remove the first item structurally equal to `item`.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|candidate| candidate == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Collection<&'static str> {
        Collection::from_vec(vec!["a", "b", "c", "b"])
    }

    #[test]
    fn preserves_insertion_order() {
        let mut items = Collection::new();
        items.add(3);
        items.push(1);
        items.add(2);
        assert_eq!(items.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn index_lookup_handles_out_of_range_and_text() {
        let items = letters();
        assert_eq!(items.get_by_index(1), Some(&"b"));
        assert_eq!(items.get_by_index(9), None);
        assert_eq!(items.get_by_index_str("2"), Some(&"c"));
        assert_eq!(items.get_by_index_str("two"), None);
        assert_eq!(items.get_by_index_str("-1"), None);
    }

    #[test]
    fn remove_takes_first_match_only() {
        let mut items = letters();
        assert!(items.remove(&"b"));
        assert_eq!(items.as_slice(), &["a", "c", "b"]);
        assert!(!items.remove(&"z"));
    }

    #[test]
    fn each_stops_on_break() {
        let items = letters();
        let mut seen = Vec::new();
        let completed = items.each(|item| {
            seen.push(*item);
            if *item == "b" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(!completed);
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn matching_materialises_new_collection() {
        let items = letters();
        let bs = items.matching(|item| *item == "b");
        assert_eq!(bs.len(), 2);
        assert_eq!(items.len(), 4);
        assert!(items.any(|item| *item == "c"));
        assert_eq!(items.first_where(|item| *item != "a"), Some(&"b"));
    }
}
