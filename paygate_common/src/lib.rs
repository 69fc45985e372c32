pub mod helpers;
mod money;
mod secret;

pub use money::{Money, MoneyConversionError, AMOUNT_TOLERANCE, MONEY_SCALE};
pub use secret::Secret;
