use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{ListRecord, RepairPart, TextField};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Rejected(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid service payload: {0}")]
    Decode(String),
}

/// Data service that owns the canonical rows of one module.
#[async_trait(?Send)]
pub trait EntityService<R: ListRecord> {
    /// Rows matching a free-text query. The matching rules belong to the service.
    async fn search(&self, text: &str) -> Result<Vec<R>, ServiceError>;
    async fn get_all(&self) -> Result<Vec<R>, ServiceError>;
    async fn get(&self, id: &str) -> Result<Option<R>, ServiceError>;
    /// Full replacement of the row with the same id.
    async fn upsert(&self, record: R) -> Result<R, ServiceError>;
    async fn remove(&self, id: &str) -> Result<(), ServiceError>;
}

/// Parts recorded against a repair ticket.
#[async_trait(?Send)]
pub trait RepairPartsSource {
    async fn parts_for_repair(&self, repair_id: &str) -> Result<Vec<RepairPart>, ServiceError>;
}

/// Single-threaded in-memory service.
#[derive(Debug)]
pub struct MemoryEntityService<R> {
    rows: RefCell<Vec<R>>,
    upsert_calls: Cell<usize>,
    fail_upserts: RefCell<Option<String>>,
}

impl<R: ListRecord> MemoryEntityService<R> {
    #[must_use]
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows: RefCell::new(rows),
            upsert_calls: Cell::new(0),
            fail_upserts: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.get()
    }

    /// Makes every later `upsert` reject with `message` until cleared.
    pub fn fail_upserts(&self, message: Option<&str>) {
        *self.fail_upserts.borrow_mut() = message.map(ToString::to_string);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<R> {
        self.rows.borrow().clone()
    }

    fn live(&self) -> Vec<R> {
        self.rows
            .borrow()
            .iter()
            .filter(|row| !row.is_deleted())
            .cloned()
            .collect()
    }
}

const SEARCH_FIELDS: [TextField; 5] = [
    TextField::Number,
    TextField::Customer,
    TextField::Supplier,
    TextField::Status,
    TextField::Note,
];

fn search_matches<R: ListRecord>(row: &R, needle: &str) -> bool {
    row.id().to_lowercase().contains(needle)
        || row.repair_id().is_some_and(|id| id.to_lowercase().contains(needle))
        || SEARCH_FIELDS.iter().any(|field| {
            row.text(*field)
                .is_some_and(|value| value.to_lowercase().contains(needle))
        })
        || row.items().iter().any(|item| {
            item.name.to_lowercase().contains(needle) || item.mpn.to_lowercase().contains(needle)
        })
}

#[async_trait(?Send)]
impl<R: ListRecord> EntityService<R> for MemoryEntityService<R> {
    async fn search(&self, text: &str) -> Result<Vec<R>, ServiceError> {
        let needle = text.trim().to_lowercase();
        let rows = self.live();
        if needle.is_empty() {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .filter(|row| search_matches(row, &needle))
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<R>, ServiceError> {
        Ok(self.live())
    }

    async fn get(&self, id: &str) -> Result<Option<R>, ServiceError> {
        let id = id.trim();
        Ok(self
            .rows
            .borrow()
            .iter()
            .find(|row| row.id() == id && !row.is_deleted())
            .cloned())
    }

    async fn upsert(&self, record: R) -> Result<R, ServiceError> {
        self.upsert_calls.set(self.upsert_calls.get() + 1);
        if let Some(message) = self.fail_upserts.borrow().as_ref() {
            return Err(ServiceError::Rejected(message.clone()));
        }
        if record.id().trim().is_empty() {
            return Err(ServiceError::Rejected("record id is required".to_string()));
        }
        let mut rows = self.rows.borrow_mut();
        match rows.iter().position(|row| row.id() == record.id()) {
            Some(index) => rows[index] = record.clone(),
            None => rows.push(record.clone()),
        }
        Ok(record)
    }

    async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        let id = id.trim();
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|row| row.id() != id);
        if rows.len() == before {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
