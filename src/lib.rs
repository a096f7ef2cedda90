//! Offline cache and push notification worker for the SST SENA web application.
//!
//! The worker sits between pages and the network. It precaches the page shell
//! on install, drops stale cache versions on activation, and routes every
//! request by path prefix: `/api/` goes to the network only, `/static/` is
//! served cache-first, and everything else is network-first with a cache
//! fallback. It also turns push messages into notifications and routes
//! notification clicks back into an open window.

pub mod cache;
pub mod clients;
pub mod config;
pub mod http;
pub mod network;
pub mod notify;
pub mod worker;
