//! Client library for the German HBCI/FinTS home-banking protocol.
//!
//! The crate covers the message plane: the wire codec (segments, data
//! elements, escaping, binary framing), the segment catalogue, message
//! assembly with the signature and encryption envelopes, the dialog state
//! machine, and the embedded SWIFT MT940/MT942 statement parser. Transport
//! pipes (HTTPS and raw TCP) and the PIN/TAN security providers are
//! included; RDH key material stays behind the [`security`] traits.
//!
//! # Opening a dialog
//!
//! ```no_run
//! use hbci::config::ClientConfig;
//! use hbci::dialog::Dialog;
//! use hbci::domain::BankId;
//! use hbci::security::{PinTanCryptoProvider, PinTanSignatureProvider};
//! use hbci::transport::HttpsTransport;
//!
//! # async fn run() -> Result<(), hbci::error::Error> {
//! let bank = BankId::german("10090000")?;
//! let transport = Box::new(HttpsTransport::new("https://banking.example.com/hbci"));
//! let signer = Box::new(PinTanSignatureProvider::new(bank.clone(), "user1", "secret"));
//! let crypter = Box::new(PinTanCryptoProvider::new(bank.clone(), "user1"));
//!
//! let mut dialog = Dialog::new(transport, signer, crypter, bank, "user1");
//! dialog.sync().await?;
//! for account in dialog.accounts().to_vec() {
//!     let balances = dialog.balances(&account.account_connection).await?;
//!     println!("{}: {:?}", account.name1, balances.value);
//! }
//! dialog.end().await?;
//! # Ok(())
//! # }
//! ```

pub mod charset;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod element;
pub mod error;
pub mod extractor;
pub mod message;
pub mod security;
pub mod segment;
pub mod swift;
pub mod token;
pub mod transport;

pub use dialog::{Dialog, DialogState};
pub use domain::{AckClass, Acknowledgement, Amount, Balance, BankId, KeyName};
pub use error::{Error, Result};
pub use message::{BankMessage, ClientMessage};
