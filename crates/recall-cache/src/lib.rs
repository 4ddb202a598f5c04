mod query_cache;

pub use query_cache::{fingerprint, CacheConfig, QueryCache};
