pub mod config;
pub mod error;
pub mod ledger;
pub mod receiver;
pub mod report;
pub mod sender;
pub mod signal;
pub mod stats;
pub mod time;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod test;
