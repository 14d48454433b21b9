pub mod storage;

pub use storage::StoredItem;
