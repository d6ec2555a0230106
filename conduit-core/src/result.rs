//! Result types
//!
//! Every result carries `successful` and `message`. A failed result is a
//! recoverable data-shape outcome, not an error.

use serde::{Deserialize, Serialize};

use crate::identity::KeyValue;

/// Items plus the filtered total, before paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQueryResult<D> {
    pub items: Vec<D>,
    pub total_count: usize,
    pub successful: bool,
    pub message: Option<String>,
}

impl<D> ListQueryResult<D> {
    pub fn success(items: Vec<D>, total_count: usize) -> Self {
        Self {
            items,
            total_count,
            successful: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            successful: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQueryResult<D> {
    pub item: Option<D>,
    pub successful: bool,
    pub message: Option<String>,
}

impl<D> ItemQueryResult<D> {
    pub fn success(item: D) -> Self {
        Self {
            item: Some(item),
            successful: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            item: None,
            successful: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub successful: bool,
    pub message: Option<String>,
    /// Present only after a successful add of a store-keyed record.
    pub key: Option<KeyValue>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            successful: true,
            message: Some(message.into()),
            key: None,
        }
    }

    pub fn success_with_key(key: KeyValue, message: impl Into<String>) -> Self {
        Self {
            successful: true,
            message: Some(message.into()),
            key: Some(key),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            successful: false,
            message: Some(message.into()),
            key: None,
        }
    }
}
