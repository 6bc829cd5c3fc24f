//! PayDesk: a conversational payment-intake bot for a WhatsApp-style
//! messaging channel.
//!
//! Inbound text messages arrive over a webhook, are routed by a
//! priority-ordered intent classifier, and drive per-user finite-state
//! purchase flows (bill payment via pay-code, ZESA electricity tokens,
//! airtime top-up). Transactions are simulated; the interesting parts
//! are the session-scoped dialogue engine and the code-validation /
//! rate-limiting core.

pub mod catalog;
pub mod codes;
pub mod config;
pub mod engine;
pub mod flows;
pub mod intent;
pub mod messages;
pub mod money;
pub mod outbound;
pub mod resolver;
pub mod session;
pub mod webhook;
