//! Types that represent the portal's data, such as `YearLedger`, `Car` and `Payment`.
mod amount;
mod fleet;
mod history;
mod ledger;
mod payment;
mod trip;

pub use amount::{Amount, AmountError, NegativeStyle};
pub use fleet::{Car, Client, User};
pub use history::{HistoryEntry, HistoryFilter};
pub use ledger::{
    CellChange, CellKey, LedgerCategory, LedgerCell, Month, Receipt, SignPolicy, YearLedger,
};
pub use payment::{Payment, PaymentFilter, PaymentStatus};
pub use trip::{Notification, TuroTrip};
