//! Merge-by-id annotation collection.
//!
//! [`AnnotationSet`] keeps records in insertion order keyed by
//! [`AnnotationId`]. Merging an update list replaces records in place and
//! appends unseen ids, so records absent from the update never move.

use indexmap::IndexMap;

use crate::annotation::Annotation;
use crate::types::AnnotationId;

/// Insertion-ordered annotation collection keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    records: IndexMap<AnnotationId, Annotation>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current contents and load `annotations`.
    ///
    /// Duplicate ids resolve last-wins at the position of the first
    /// occurrence.
    pub fn replace(&mut self, annotations: impl IntoIterator<Item = Annotation>) {
        self.records.clear();
        self.merge(annotations);
    }

    /// Replace-or-insert each update by id.
    ///
    /// Applying the same updates twice leaves the set exactly as applying
    /// them once. Returns the number of records that were inserted.
    pub fn merge(&mut self, updates: impl IntoIterator<Item = Annotation>) -> usize {
        let mut inserted = 0;
        for update in updates {
            if self.records.insert(update.id, update).is_none() {
                inserted += 1;
            }
        }
        inserted
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.records.values()
    }

    /// Clone the records out in their current order.
    pub fn to_vec(&self) -> Vec<Annotation> {
        self.records.values().cloned().collect()
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

/// Pure form of [`AnnotationSet::merge`] over slices.
pub fn merge_annotations(current: &[Annotation], updates: &[Annotation]) -> Vec<Annotation> {
    let mut set: AnnotationSet = current.iter().cloned().collect();
    set.merge(updates.iter().cloned());
    set.to_vec()
}
