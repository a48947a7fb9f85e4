//! `backhouse-accounts` — account records and their authorization state machine.
//!
//! Pure domain rules over `(active | inactive) × role`; persistence goes
//! through the [`AccountStore`] port.

pub mod account;
pub mod store;

pub use account::Account;
pub use store::{AccountPage, AccountStore, AccountStoreError};
