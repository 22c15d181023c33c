mod in_memory;
mod redis;

pub use in_memory::InMemoryCache;
pub use redis::RedisCache;
