pub mod cycle;
pub mod group;
pub mod ledger;
pub mod member;
pub mod money;
pub mod period;
pub mod ports;
pub mod selector;
pub mod wallet;

/// Group identifiers as stored by the backing store.
pub type GroupId = u64;
pub type UserId = u64;
