//! Core data types for prettysql.
//!
//! - [`Value`]: one dynamically-typed result cell or bound parameter
//! - [`Decimal`]: exact fixed-point number stored as a scaled integer

mod decimal;
mod value;

pub use decimal::{Decimal, ParseDecimalError};
pub use value::Value;
