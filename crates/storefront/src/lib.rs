//! Dinero Store Storefront - the buyer-side checkout engine.
//!
//! This crate owns everything between "buyer clicks pay" and "order
//! recorded": the cart and profile store, the SOL/USD price oracle, the
//! on-chain payment submitter, the print-provider fulfillment requester,
//! and the checkout orchestrator that sequences them.
//!
//! # Architecture
//!
//! - Cart, profile, and completed orders persist client-side as one flat
//!   JSON document ([`store::LocalStore`]) - there is no server database.
//! - Every external system sits behind a trait seam ([`services::price::RateSource`],
//!   [`solana::ChainRpc`], [`solana::WalletSigner`],
//!   [`services::fulfillment::FulfillmentApi`],
//!   [`services::receipt::ReceiptSender`]) so the orchestrator is testable
//!   with in-process fakes.
//! - The wallet is an injected capability that can sign a transfer and
//!   nothing more; this crate never sees key material.
//! - Outbound provider and mail traffic goes through the `gateway`
//!   processes, which hold the real credentials.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod solana;
pub mod store;

pub use checkout::{CheckoutOrchestrator, CheckoutStage, CheckoutSummary};
pub use error::CheckoutError;
