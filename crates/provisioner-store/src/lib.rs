pub mod error;
pub mod memory;
pub mod redb_store;
pub mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use redb_store::RedbStore;
pub use store::{calc_record_age, group_records, StateStore};
