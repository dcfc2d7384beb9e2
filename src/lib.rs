//! The K5 CLI client library.
//!
//! Its core is a token cache shared by every caller in the process and
//! mirrored to disk for other processes: the [`token_supervisor`] hands out
//! tokens that pass the [`token::ExpiryPolicy`], consulting memory, then the
//! disk file, and only then the identity service.
//!
//! # Modules
//!
//! - `token`: token records, timestamp parsing and the expiry policy
//! - `cache`: the durable token file
//! - `token_store`: the locked in-memory/disk store
//! - `token_supervisor`: tiered lookup and refresh
//! - `auth`: the identity service client
//! - `http_utils`: the networking API client
//! - `configuration`, `keyring`: settings and password storage
//! - `commands`, `actions`: the command line surface

pub mod actions;
pub mod auth;
pub mod cache;
pub mod commands;
pub mod configuration;
pub mod error;
pub mod exit_codes;
pub mod format;
pub mod http_utils;
pub mod keyring;
pub mod token;
pub mod token_store;
pub mod token_supervisor;
