//! Book catalog service.
//!
//! `modules` holds the feature modules; `app` wires storage, modules, and
//! the HTTP server together at process start.

pub mod app;
pub mod modules;

pub use app::{bootstrap, migrate, run, Application};
