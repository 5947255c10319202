//! Ordering and grouping rules for reviewer-facing views.
//!
//! Everything here is a pure function over borrowed annotations and returns
//! new collections; the backing store is never reordered in place.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;

use crate::annotation::{Annotation, UNDETECTED};

// ---------------------------------------------------------------------------
// Comparators
// ---------------------------------------------------------------------------

/// Compare two species or identity labels.
///
/// The [`UNDETECTED`] sentinel sorts after every other label; everything
/// else compares lexicographically. Equal labels compare equal.
pub fn compare_species(a: &str, b: &str) -> Ordering {
    match (a == UNDETECTED, b == UNDETECTED) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Order annotations by species, then identity, sentinels last.
///
/// Applied to freshly loaded sets before they are stored.
pub fn compare_by_species(a: &Annotation, b: &Annotation) -> Ordering {
    compare_species(&a.predicted_species, &b.predicted_species)
        .then_with(|| compare_species(&a.predicted_name, &b.predicted_name))
}

/// Triage rank: open work first, accepted next, ignored last.
fn review_rank(annotation: &Annotation) -> u8 {
    if annotation.is_ignored() {
        2
    } else if annotation.is_accepted() {
        1
    } else {
        0
    }
}

/// Total order used for reviewer triage.
///
/// 0. sentinel `predicted_name` after every named annotation
/// 1. ignored after everything else
/// 2. accepted after unaccepted
/// 3. lower `species_confidence` first
/// 4. `predicted_name`
///
/// Inside one identity group every name is equal, so step 0 never decides
/// there.
pub fn compare_for_review(a: &Annotation, b: &Annotation) -> Ordering {
    a.has_undetected_name()
        .cmp(&b.has_undetected_name())
        .then_with(|| review_rank(a).cmp(&review_rank(b)))
        .then_with(|| a.species_confidence.total_cmp(&b.species_confidence))
        .then_with(|| compare_species(&a.predicted_name, &b.predicted_name))
}

/// Return a new vector in review order. The sort is stable.
pub fn order_for_review(annotations: &[Annotation]) -> Vec<Annotation> {
    let mut ordered = annotations.to_vec();
    ordered.sort_by(compare_for_review);
    ordered
}

/// Return a new vector in species order. The sort is stable.
pub fn order_by_species(annotations: &[Annotation]) -> Vec<Annotation> {
    let mut ordered = annotations.to_vec();
    ordered.sort_by(compare_by_species);
    ordered
}

/// Unreviewed annotation whose confidence is below `threshold`.
pub fn needs_review(annotation: &Annotation, threshold: f64) -> bool {
    !annotation.is_accepted() && !annotation.is_ignored() && annotation.species_confidence < threshold
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// All annotations sharing one `predicted_name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationGroup {
    pub name: String,
    pub annotations: Vec<Annotation>,
}

impl AnnotationGroup {
    /// Representative species, taken from the first member.
    pub fn species(&self) -> &str {
        self.annotations
            .first()
            .map(|a| a.predicted_species.as_str())
            .unwrap_or(UNDETECTED)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Number of members the reviewer has accepted.
    pub fn reviewed_count(&self) -> usize {
        self.annotations.iter().filter(|a| a.is_accepted()).count()
    }

    pub fn is_undetected(&self) -> bool {
        self.name == UNDETECTED
    }

    /// Members in triage order.
    pub fn ordered_for_review(&self) -> Vec<Annotation> {
        order_for_review(&self.annotations)
    }
}

/// Identity buckets with the sentinel bucket held apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdentityGroups {
    undetected: Option<AnnotationGroup>,
    named: Vec<AnnotationGroup>,
}

impl IdentityGroups {
    /// The "no identity resolved" bucket, if any annotation landed in it.
    pub fn undetected(&self) -> Option<&AnnotationGroup> {
        self.undetected.as_ref()
    }

    /// Named groups in first-occurrence order.
    pub fn named(&self) -> &[AnnotationGroup] {
        &self.named
    }

    /// Detail view order: the sentinel bucket first, then named groups.
    pub fn detail_order(&self) -> impl Iterator<Item = &AnnotationGroup> {
        self.undetected.iter().chain(self.named.iter())
    }

    /// Group names in detail view order.
    pub fn names(&self) -> Vec<&str> {
        self.detail_order().map(|g| g.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationGroup> {
        self.detail_order().find(|g| g.name == name)
    }

    /// Number of groups including the sentinel bucket.
    pub fn len(&self) -> usize {
        self.named.len() + usize::from(self.undetected.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group annotations by `predicted_name`.
///
/// Named groups keep the order in which their first member appears; members
/// keep input order. The [`UNDETECTED`] bucket is always surfaced apart from
/// the named groups regardless of where it first occurs.
pub fn group_by_identity<'a>(annotations: impl IntoIterator<Item = &'a Annotation>) -> IdentityGroups {
    let mut buckets: IndexMap<&str, Vec<Annotation>> = IndexMap::new();
    for annotation in annotations {
        buckets
            .entry(annotation.predicted_name.as_str())
            .or_default()
            .push(annotation.clone());
    }

    let mut groups = IdentityGroups::default();
    for (name, members) in buckets {
        let group = AnnotationGroup {
            name: name.to_string(),
            annotations: members,
        };
        if group.is_undetected() {
            groups.undetected = Some(group);
        } else {
            groups.named.push(group);
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// One row of the identity summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentitySummary {
    /// 1-based row number.
    pub index: usize,
    pub name: String,
    /// Display form of the group's representative species.
    pub species: String,
    pub appearances: usize,
    pub reviewed: usize,
}

/// Summarize named groups; the sentinel bucket is left out.
pub fn summarize(groups: &IdentityGroups) -> Vec<IdentitySummary> {
    groups
        .named()
        .iter()
        .enumerate()
        .map(|(i, group)| IdentitySummary {
            index: i + 1,
            name: group.name.clone(),
            species: group.species().replacen('_', " ", 1),
            appearances: group.len(),
            reviewed: group.reviewed_count(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
