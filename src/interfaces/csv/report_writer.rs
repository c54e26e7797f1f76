use crate::domain::cycle::Cycle;
use crate::domain::money::round_money;
use crate::domain::wallet::Wallet;
use crate::domain::{GroupId, UserId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Writes the engine's end-of-run state as CSV.
///
/// Wraps `csv::Writer`; rows serialize through serde so the header line is
/// derived from the row structs.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

/// Rounds to 2 decimals and pads the scale, so `150` prints as `150.00`.
fn report_amount(value: Decimal) -> Decimal {
    let mut value = round_money(value);
    value.rescale(2);
    value
}

#[derive(Serialize)]
struct WalletRow {
    user_id: UserId,
    available: Decimal,
}

#[derive(Serialize)]
struct CycleRow {
    group_id: GroupId,
    cycle_number: u32,
    recipient: UserId,
    period_start: String,
    period_end: String,
    amount: Decimal,
}

impl<W: Write> ReportWriter<W> {
    /// Creates a new `ReportWriter` over any `Write` sink (e.g. stdout).
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per wallet, balances rounded to 2 decimals.
    pub fn write_wallets(&mut self, wallets: Vec<Wallet>) -> Result<()> {
        for wallet in wallets {
            self.writer.serialize(WalletRow {
                user_id: wallet.user_id,
                available: report_amount(wallet.available.value()),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes one row per recorded payout cycle.
    pub fn write_cycles(&mut self, cycles: Vec<Cycle>) -> Result<()> {
        for cycle in cycles {
            self.writer.serialize(CycleRow {
                group_id: cycle.group_id,
                cycle_number: cycle.cycle_number,
                recipient: cycle.recipient,
                period_start: cycle.period_start.date_naive().to_string(),
                period_end: cycle.period_end.date_naive().to_string(),
                amount: report_amount(cycle.amount),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
