pub mod config;
pub mod error;
pub mod numeric;
pub mod types;

#[cfg(feature = "concentration")]
pub mod concentration;

#[cfg(feature = "concentration")]
pub mod schema;

#[cfg(feature = "template")]
pub mod template;

#[cfg(feature = "lendable")]
pub mod lendable;

#[cfg(feature = "repo")]
pub mod repo;

pub use config::RuleConfig;
pub use error::HcclError;
pub use types::*;

/// Standard result type for all hccl operations
pub type HcclResult<T> = Result<T, HcclError>;
