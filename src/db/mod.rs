mod repository;
mod schema;

pub use repository::{QuotaStore, Repository};
