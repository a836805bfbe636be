//! Ordered collections of domain objects.

use core::cmp::Ordering;
use core::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::validation::{Validate, ValidationResult};

/// Base collection for domain objects.
///
/// A thin list with sorting and bulk-add helpers; validating a collection validates
/// every item and concatenates the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn add_range(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.extend(items);
    }

    /// Sorts with the given comparer. Stable.
    pub fn sort_by(&mut self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.items.sort_by(compare);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Ord> Collection<T> {
    /// Sorts by the items' natural order.
    pub fn sort(&mut self) {
        self.items.sort();
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Clone> From<&Collection<T>> for Collection<T> {
    fn from(other: &Collection<T>) -> Self {
        other.clone()
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<T> for Collection<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
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
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> Index<usize> for Collection<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for Collection<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<T: Validate> Validate for Collection<T> {
    fn validate(&self) -> Vec<ValidationResult> {
        self.items.iter().flat_map(Validate::validate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_keeps_items() {
        let collection = Collection::from(vec![1, 2, 3]);

        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn cloning_copies_items() {
        let first = Collection::from(vec![1, 2, 3]);
        let second = first.clone();

        assert_eq!(second.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn add_range_appends_items() {
        let first = Collection::from(vec![1, 2, 3]);
        let mut second = Collection::new();
        second.add_range(first);

        assert_eq!(second.len(), 3);
    }

    #[test]
    fn sort_uses_natural_order() {
        let mut ints: Collection<i32> = [3, 2, 1].into_iter().collect();
        ints.sort();

        assert_eq!(ints[0], 1);
        assert_eq!(ints[1], 2);
        assert_eq!(ints[2], 3);
    }

    #[test]
    fn sort_by_uses_comparer() {
        let mut words = Collection::from(vec!["pear", "fig", "apple"]);
        words.sort_by(|a, b| a.len().cmp(&b.len()));

        assert_eq!(words.into_vec(), vec!["fig", "pear", "apple"]);
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut collection = Collection::from(vec![1]);

        assert_eq!(collection.remove(3), None);
        assert_eq!(collection.remove(0), Some(1));
        assert!(collection.is_empty());
    }
}
