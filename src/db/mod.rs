//! MongoDB access layer

pub mod mongo;
pub mod schemas;

pub use mongo::{parse_object_id, sort_by_created_desc, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
