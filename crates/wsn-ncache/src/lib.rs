pub mod cache;
pub mod nce;
pub mod state;
pub mod token_bucket;

pub use cache::{NcacheError, NeighborCache};
pub use nce::Nce;
pub use state::NeighborState;
pub use token_bucket::TokenBucket;
