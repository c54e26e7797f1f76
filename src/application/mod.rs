pub mod ledger_writer;
pub mod processor;
pub mod scheduler;
