mod money;

pub mod fees;
pub mod helpers;
pub mod op;
mod secret;

pub use fees::{FeeBreakdown, FeeCalculationError, FeeSchedule};
pub use money::{MoneyCents, MoneyConversionError};
pub use secret::Secret;
