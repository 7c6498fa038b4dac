mod cache;
mod fetch;
mod provider;

pub use cache::KeySetCache;
pub use fetch::{keys_from_slice, KeySetFetcher};
pub use provider::JwksProvider;
