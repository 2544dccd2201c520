pub mod cache;

pub use cache::{column_key, CacheError, OrderCache};
