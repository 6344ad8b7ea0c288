//! Client-side model of the poll widget: session state, the poll page and
//! the admin form. Rendering lives outside this crate.
pub mod admin;
pub mod state;
pub mod view;
