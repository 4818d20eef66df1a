mod conversions;
mod error;
mod models;
mod schema;
mod store;

pub use conversions::{TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};
pub use error::StoreError;
pub use store::{ClaimInfo, FaucetFilter, FaucetInfo, FaucetStore, NewClaim};

pub type Result<T> = std::result::Result<T, StoreError>;
