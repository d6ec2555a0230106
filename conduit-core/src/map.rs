//! Entity maps between persistence and domain record shapes

use std::marker::PhantomData;

/// Converts between one persistence shape `P` and one domain shape `D`.
///
/// Both directions are pure and total, and the map is the single source of
/// truth for field correspondence, unit conversions included.
pub trait EntityMap<P, D>: Send + Sync {
    fn to_domain(&self, record: &P) -> D;

    fn to_persistence(&self, record: &D) -> P;
}

/// Map used when the domain and persistence shapes are the same type.
#[derive(Debug)]
pub struct IdentityMap<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> IdentityMap<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for IdentityMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> EntityMap<T, T> for IdentityMap<T> {
    fn to_domain(&self, record: &T) -> T {
        record.clone()
    }

    fn to_persistence(&self, record: &T) -> T {
        record.clone()
    }
}
