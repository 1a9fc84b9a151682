//! Dinero Store Gateway - the two thin server processes the storefront
//! engine talks to.
//!
//! - `provider-proxy` (port 3005): forwards print-provider API requests,
//!   injecting the server-held bearer credential and re-shaping shipping
//!   addresses on order creation. The browser-side engine never sees the
//!   credential.
//! - `mail-bridge` (port 3001): relays receipt and mail requests to SMTP,
//!   but only after verifying the referenced payment transaction exists
//!   on-chain.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod mailer;
pub mod proxy;
pub mod telemetry;
