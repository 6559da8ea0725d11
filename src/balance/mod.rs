//! Class balancing by per-column bootstrap of the minority class.

mod resample;

pub use resample::{BalanceOutcome, BalanceReport, ClassBalancer};
