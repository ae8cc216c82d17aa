//! account-explorer library
//!
//! Read-only account explorer: an account overview (balance, coins, NFTs,
//! modules) and a paginated transaction feed stitched together from an
//! indexed GraphQL service and a node's REST API.
//! The HTTP binary is in main.rs.

pub mod address;
pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod indexer;
pub mod ledger;
pub mod metrics;
pub mod node;
pub mod registry;
pub mod routes;
pub mod source;
