pub mod events;
pub mod money;

pub use events::{Notification, NotificationKind, Recipient};
pub use money::{CommissionRate, CommissionSplit, Money, MoneyError};
