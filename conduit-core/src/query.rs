//! Filter/sort definitions and the store-agnostic record query
//!
//! A [`RecordQuery`] is built by the pipeline in a fixed order (predicates,
//! then ordering, then paging) and handed to a store to execute. Stores that
//! hold rows in memory can run it directly with [`RecordQuery::execute`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::specification::Specification;

// ============================================================================
// DEFINITIONS
// ============================================================================

/// A named filter with an opaque payload, interpreted by a record type's
/// filter handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    pub data: serde_json::Value,
}

impl FilterDefinition {
    pub fn new(name: impl Into<String>, data: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// The payload as text, if it is a JSON string.
    pub fn data_as_str(&self) -> Option<&str> {
        self.data.as_str()
    }
}

/// One sort key: a field name and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDefinition {
    pub field: String,
    pub descending: bool,
}

impl SortDefinition {
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, false)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }
}

// ============================================================================
// ORDERING
// ============================================================================

/// Compares two records on one field.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A primary-then-tie-break chain of comparators.
pub struct RecordOrdering<T> {
    keys: Vec<(SortDefinition, Comparator<T>)>,
}

impl<T> RecordOrdering<T> {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Append a key; earlier keys take precedence.
    pub fn then_by(mut self, sort: SortDefinition, comparator: Comparator<T>) -> Self {
        self.keys.push((sort, comparator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The applied keys, primary first.
    pub fn definitions(&self) -> Vec<SortDefinition> {
        self.keys.iter().map(|(sort, _)| sort.clone()).collect()
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for (sort, comparator) in &self.keys {
            let ordering = comparator(a, b);
            let ordering = if sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl<T> Default for RecordOrdering<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordOrdering<T> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
        }
    }
}

impl<T> fmt::Debug for RecordOrdering<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.definitions()).finish()
    }
}

// ============================================================================
// RECORD QUERY
// ============================================================================

/// A filter/sort/page plan over one record type.
pub struct RecordQuery<T> {
    filters: Vec<Arc<dyn Specification<T>>>,
    ordering: Option<RecordOrdering<T>>,
    skip: usize,
    take: Option<usize>,
}

impl<T> RecordQuery<T> {
    /// A query selecting every record in natural store order.
    pub fn all() -> Self {
        Self {
            filters: Vec::new(),
            ordering: None,
            skip: 0,
            take: None,
        }
    }

    /// Add a predicate; predicates combine conjunctively.
    pub fn filter(mut self, specification: Arc<dyn Specification<T>>) -> Self {
        self.filters.push(specification);
        self
    }

    pub fn order_by(mut self, ordering: RecordOrdering<T>) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn page(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = Some(take);
        self
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn ordering(&self) -> Option<&RecordOrdering<T>> {
        self.ordering.as_ref()
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn take(&self) -> Option<usize> {
        self.take
    }

    /// True when the record satisfies every predicate.
    pub fn matches(&self, record: &T) -> bool {
        self.filters.iter().all(|spec| spec.is_satisfied_by(record))
    }

    /// Number of rows passing the predicates; ordering and paging are ignored.
    pub fn count_in<'a, I>(&self, rows: I) -> usize
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        rows.into_iter().filter(|row| self.matches(row)).count()
    }

    /// Filter, stable-sort, then page the rows.
    pub fn execute<'a, I>(&self, rows: I) -> Vec<T>
    where
        I: IntoIterator<Item = &'a T>,
        T: Clone + 'a,
    {
        let mut selected: Vec<T> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();

        if let Some(ordering) = &self.ordering {
            // sort_by is stable, so equal keys keep store order
            selected.sort_by(|a, b| ordering.compare(a, b));
        }

        let paged = selected.into_iter().skip(self.skip);
        match self.take {
            Some(take) => paged.take(take).collect(),
            None => paged.collect(),
        }
    }
}

impl<T> Default for RecordQuery<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T> fmt::Debug for RecordQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordQuery")
            .field("filters", &self.filters.len())
            .field("ordering", &self.ordering)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .finish()
    }
}
