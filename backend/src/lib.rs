pub mod billing;
pub mod config;
pub mod content;
pub mod context;
pub mod db;
pub mod error;
pub mod generation;
pub mod history;
pub mod routes;
pub mod webhooks;

pub use context::{AppContext, Collaborators, ContextSettings};
