//! Poll widget backend for dropped assets.
//!
//! Each dropped asset carries a data object holding one poll. The HTTP
//! handlers resolve the interactive session from the query string, load the
//! asset's poll, run it through [`voting::reconcile`] and write the result back
//! under a time-bucketed lock. [`widget`] models the client side of the same
//! flow without any rendering.
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod tasks;
pub mod voting;
pub mod widget;
