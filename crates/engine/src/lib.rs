//! Domain model and persistence operations for the cambio backend.
//!
//! The engine owns every database write. Each multi-step operation (user
//! registration, currency exchange) runs inside a single database
//! transaction; correctness under concurrent requests is delegated to the
//! database, not to in-process locking.

pub use currency::Currency;
pub use error::EngineError;
pub use exchanges::Exchange;
pub use money::{convert_minor, fee_minor, format_minor, parse_major};
pub use ops::{Engine, EngineBuilder, ExchangeCmd, ExchangeListFilter};
pub use rate_provider::RateProvider;
pub use users::User;

pub mod balances;
mod currency;
mod error;
pub mod exchanges;
mod money;
mod ops;
mod rate_provider;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
