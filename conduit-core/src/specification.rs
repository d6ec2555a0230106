//! Specifications (named boolean predicates) and filter handlers
//!
//! A filter handler turns a [`FilterDefinition`] into a [`Specification`] for
//! one record type. Names it does not recognise produce no specification,
//! which callers treat as "no additional constraint".

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::query::{FilterDefinition, RecordQuery};

// ============================================================================
// SPECIFICATION
// ============================================================================

/// A boolean predicate over a record type.
pub trait Specification<T>: Send + Sync {
    fn is_satisfied_by(&self, record: &T) -> bool;
}

/// Combinators for building specifications out of other specifications.
pub trait SpecificationExt<T>: Specification<T> + Sized + 'static {
    fn and<S: Specification<T> + 'static>(self, other: S) -> AndSpecification<T> {
        AndSpecification::new(Arc::new(self), Arc::new(other))
    }

    fn or<S: Specification<T> + 'static>(self, other: S) -> OrSpecification<T> {
        OrSpecification::new(Arc::new(self), Arc::new(other))
    }

    fn not(self) -> NotSpecification<T> {
        NotSpecification::new(Arc::new(self))
    }
}

impl<T, S: Specification<T> + Sized + 'static> SpecificationExt<T> for S {}

/// A specification backed by a closure.
pub struct PredicateSpecification<T> {
    predicate: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> PredicateSpecification<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl<T> Specification<T> for PredicateSpecification<T> {
    fn is_satisfied_by(&self, record: &T) -> bool {
        (self.predicate)(record)
    }
}

impl<T> fmt::Debug for PredicateSpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PredicateSpecification")
    }
}

pub struct AndSpecification<T> {
    left: Arc<dyn Specification<T>>,
    right: Arc<dyn Specification<T>>,
}

impl<T> AndSpecification<T> {
    pub fn new(left: Arc<dyn Specification<T>>, right: Arc<dyn Specification<T>>) -> Self {
        Self { left, right }
    }
}

impl<T> Specification<T> for AndSpecification<T> {
    fn is_satisfied_by(&self, record: &T) -> bool {
        self.left.is_satisfied_by(record) && self.right.is_satisfied_by(record)
    }
}

pub struct OrSpecification<T> {
    left: Arc<dyn Specification<T>>,
    right: Arc<dyn Specification<T>>,
}

impl<T> OrSpecification<T> {
    pub fn new(left: Arc<dyn Specification<T>>, right: Arc<dyn Specification<T>>) -> Self {
        Self { left, right }
    }
}

impl<T> Specification<T> for OrSpecification<T> {
    fn is_satisfied_by(&self, record: &T) -> bool {
        self.left.is_satisfied_by(record) || self.right.is_satisfied_by(record)
    }
}

pub struct NotSpecification<T> {
    inner: Arc<dyn Specification<T>>,
}

impl<T> NotSpecification<T> {
    pub fn new(inner: Arc<dyn Specification<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Specification<T> for NotSpecification<T> {
    fn is_satisfied_by(&self, record: &T) -> bool {
        !self.inner.is_satisfied_by(record)
    }
}

/// Case-insensitive text equality using Unicode lowercase folding.
pub fn text_equals_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

// ============================================================================
// FILTER HANDLERS
// ============================================================================

/// Maps filter definitions to specifications for one record type.
pub trait FilterHandler<T>: Send + Sync {
    /// `None` for names this handler does not recognise.
    fn specification(&self, filter: &FilterDefinition) -> Option<Arc<dyn Specification<T>>>;

    /// AND every recognised filter into the query, skipping unknown names.
    fn apply_filters(&self, filters: &[FilterDefinition], query: RecordQuery<T>) -> RecordQuery<T> {
        filters.iter().fold(query, |query, filter| {
            match self.specification(filter) {
                Some(specification) => query.filter(specification),
                None => query,
            }
        })
    }
}

type SpecificationFactory<T> =
    Arc<dyn Fn(&FilterDefinition) -> Option<Arc<dyn Specification<T>>> + Send + Sync>;

/// A filter handler backed by a name-to-factory registry.
pub struct RecordFilterHandler<T> {
    factories: HashMap<String, SpecificationFactory<T>>,
}

impl<T> RecordFilterHandler<T> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under a filter name. The factory may still decline
    /// a definition whose payload it cannot interpret.
    pub fn with_filter<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&FilterDefinition) -> Option<Arc<dyn Specification<T>>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl<T> Default for RecordFilterHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FilterHandler<T> for RecordFilterHandler<T> {
    fn specification(&self, filter: &FilterDefinition) -> Option<Arc<dyn Specification<T>>> {
        self.factories
            .get(&filter.name)
            .and_then(|factory| factory(filter))
    }
}
