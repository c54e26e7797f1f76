use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Tunables for the payout cycle engine.
///
/// Passed explicitly into the processor at construction; nothing reads
/// ambient global state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Defaulter fee, as a percentage of the per-member contribution.
    pub default_fee_rate: Decimal,
    /// How long a per-group processing lock is held before it expires on
    /// its own. Expiry is the sole recovery path if a worker crashes while
    /// holding the lock.
    pub lock_ttl: Duration,
    /// Sanity cap on elapsed intervals between anchor and now. Anything
    /// beyond this means corrupted anchor data, not a real schedule.
    pub elapsed_cap: u32,
    /// Recipients paid per cycle run.
    pub recipients_per_cycle: usize,
    /// Retry bound for a failed run, enforced by the job runner.
    pub max_attempts: u32,
    pub currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fee_rate: dec!(10),
            lock_ttl: Duration::from_secs(300),
            elapsed_cap: 1000,
            recipients_per_cycle: 1,
            max_attempts: 3,
            currency: "NGN".to_string(),
        }
    }
}
