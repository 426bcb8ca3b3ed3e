//! Data access layer: persisted entities, the storage port and its
//! implementations.

pub mod models;
pub mod quiz_store;
pub mod storage;
