//! Service layer: price oracle, retry policy, payment submitter,
//! fulfillment requester, and receipt notifier.

pub mod fulfillment;
pub mod payment;
pub mod price;
pub mod receipt;
pub mod retry;
