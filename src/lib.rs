//! A signing proxy for creating Binance C2C (peer-to-peer) ads with buyer
//! eligibility filters that the Binance interface does not expose.
//!
//! The pieces, from the bottom up:
//! * [signer] computes HMAC-SHA256 signatures over canonical query strings
//! * [query] builds ordered, timestamped, signed query strings
//! * [merge] assembles the ad payload from fixed defaults, filters and a payment method
//! * [client] makes signed calls to the exchange with per-call credentials
//! * [proxy] serves the `/get-ad-details` and `/create-ad` endpoints
//! * [form] drives the multi-step flow as a state machine
//!
//! Credentials are never stored: they travel with each request and are dropped
//! when it completes.

#![deny(missing_docs)]

mod error;
pub use error::*;

mod messages;
pub use messages::*;

mod config;
pub use config::*;

pub mod client;
pub use client::{C2cRestAPI, C2cRestClient};

pub mod disclaimer;
pub use disclaimer::DisclaimerGate;

pub mod form;
pub use form::{AdForm, FormState};

pub mod merge;
pub use merge::{TradeMethodTagging, build_ad_payload, build_ad_payload_for_method};

pub mod proxy;

pub mod query;

mod serde_helpers;

pub mod signer;
