//! Request types for list queries, item queries and commands

use serde::{Deserialize, Serialize};

use crate::cancellation::Cancellation;
use crate::identity::{EntityKey, RawKey};
use crate::query::{FilterDefinition, SortDefinition};

// ============================================================================
// LIST QUERY
// ============================================================================

/// A filtered, sorted, optionally paged query over one record type.
#[derive(Debug, Clone, Default)]
pub struct ListQueryRequest {
    pub filters: Vec<FilterDefinition>,
    pub sorters: Vec<SortDefinition>,
    pub start_index: usize,
    /// Zero or negative returns every matching record.
    pub page_size: i32,
    pub cancellation: Cancellation,
}

impl ListQueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sorter(mut self, sort: SortDefinition) -> Self {
        self.sorters.push(sort);
        self
    }

    pub fn with_page(mut self, start_index: usize, page_size: i32) -> Self {
        self.start_index = start_index;
        self.page_size = page_size;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// `Some(page_size)` when the request is paged.
    pub fn page_size(&self) -> Option<usize> {
        if self.page_size > 0 {
            Some(self.page_size as usize)
        } else {
            None
        }
    }
}

// ============================================================================
// ITEM QUERY
// ============================================================================

/// A point lookup by key.
#[derive(Debug, Clone)]
pub struct ItemQueryRequest<K> {
    pub key: K,
    pub cancellation: Cancellation,
}

impl<K> ItemQueryRequest<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            cancellation: Cancellation::none(),
        }
    }

    pub fn create(key: K, cancellation: Cancellation) -> Self {
        Self { key, cancellation }
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl<K: EntityKey> ItemQueryRequest<K> {
    /// Erase the key type, keeping only its scalar.
    pub fn into_raw(self) -> ItemQueryRequest<RawKey> {
        ItemQueryRequest {
            key: self.key.raw_key(),
            cancellation: self.cancellation,
        }
    }
}

// ============================================================================
// COMMAND
// ============================================================================

/// The mutation a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandState {
    Add,
    Update,
    Delete,
}

impl CommandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandState::Add => "Add",
            CommandState::Update => "Update",
            CommandState::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for CommandState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Add, update or delete one domain record.
#[derive(Debug, Clone)]
pub struct CommandRequest<D> {
    pub item: D,
    pub state: CommandState,
    pub cancellation: Cancellation,
}

impl<D> CommandRequest<D> {
    pub fn new(item: D, state: CommandState) -> Self {
        Self {
            item,
            state,
            cancellation: Cancellation::none(),
        }
    }

    pub fn add(item: D) -> Self {
        Self::new(item, CommandState::Add)
    }

    pub fn update(item: D) -> Self {
        Self::new(item, CommandState::Update)
    }

    pub fn delete(item: D) -> Self {
        Self::new(item, CommandState::Delete)
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}
