//! MongoDB persistence
//!
//! Typed collections with declared indexes, and MongoDB implementations of
//! every store trait.

pub mod mongo;
pub mod schemas;
mod store;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection};
pub use store::MongoStore;

use std::sync::Arc;

use crate::store::Stores;
use crate::types::Result;

/// Open every collection, apply indexes and wrap them as `Stores`
pub async fn mongo_stores(client: &MongoClient) -> Result<Stores> {
    let store = Arc::new(MongoStore::new(client).await?);
    Ok(Stores {
        users: store.clone(),
        sessions: store.clone(),
        passkeys: store.clone(),
        expressions: store.clone(),
        acknowledgements: store.clone(),
        proofs: store.clone(),
        notifications: store.clone(),
        statistics: store.clone(),
        conversations: store,
        backend: "mongodb",
    })
}
