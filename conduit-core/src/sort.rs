//! Sort handlers: sort definitions to record orderings

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::query::{Comparator, RecordOrdering, RecordQuery, SortDefinition};

/// Turns sort definitions into an ordering for one record type.
pub trait SortHandler<T>: Send + Sync {
    /// Ordering applied when a request names no sorters.
    fn default_sort(&self) -> SortDefinition;

    /// Comparator for a field name, matched case-insensitively.
    fn comparator(&self, field: &str) -> Option<Comparator<T>>;

    /// Build a primary-then-tie-break ordering from `sorters` in request order.
    ///
    /// Fields without a comparator are skipped. If none remain, the default
    /// ordering is used instead.
    fn ordering(&self, sorters: &[SortDefinition]) -> RecordOrdering<T> {
        let ordering = sorters.iter().fold(RecordOrdering::new(), |ordering, sort| {
            match self.comparator(&sort.field) {
                Some(comparator) => ordering.then_by(sort.clone(), comparator),
                None => ordering,
            }
        });

        if ordering.is_empty() {
            self.default_ordering()
        } else {
            ordering
        }
    }

    fn default_ordering(&self) -> RecordOrdering<T> {
        let sort = self.default_sort();
        match self.comparator(&sort.field) {
            Some(comparator) => RecordOrdering::new().then_by(sort, comparator),
            None => RecordOrdering::new(),
        }
    }

    fn apply_sorts(&self, sorters: &[SortDefinition], query: RecordQuery<T>) -> RecordQuery<T> {
        query.order_by(self.ordering(sorters))
    }

    fn apply_default_sort(&self, query: RecordQuery<T>) -> RecordQuery<T> {
        query.order_by(self.default_ordering())
    }

    /// Requested fields this handler cannot sort by.
    fn unknown_fields<'a>(&self, sorters: &'a [SortDefinition]) -> Vec<&'a str> {
        sorters
            .iter()
            .filter(|sort| self.comparator(&sort.field).is_none())
            .map(|sort| sort.field.as_str())
            .collect()
    }
}

/// A sort handler backed by a field-name registry.
pub struct RecordSortHandler<T> {
    default_sort: SortDefinition,
    fields: HashMap<String, Comparator<T>>,
}

impl<T> RecordSortHandler<T> {
    pub fn new(default_field: impl Into<String>, default_descending: bool) -> Self {
        Self {
            default_sort: SortDefinition::new(default_field, default_descending),
            fields: HashMap::new(),
        }
    }

    /// Register a field sorted by a totally ordered key.
    pub fn with_field<K, F>(self, name: impl Into<String>, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.with_comparator(name, move |a: &T, b: &T| key(a).cmp(&key(b)))
    }

    /// Register a field with an explicit comparator, e.g. for floats.
    pub fn with_comparator<F>(mut self, name: impl Into<String>, comparator: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.fields
            .insert(name.into().to_lowercase(), Arc::new(comparator));
        self
    }
}

impl<T> SortHandler<T> for RecordSortHandler<T> {
    fn default_sort(&self) -> SortDefinition {
        self.default_sort.clone()
    }

    fn comparator(&self, field: &str) -> Option<Comparator<T>> {
        self.fields.get(&field.to_lowercase()).cloned()
    }
}
