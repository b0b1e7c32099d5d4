// Library root
// -----------
// This crate exposes the LangConnect client as a library; the binary
// (`main.rs`) wires it to a clap command line.
//
// Module responsibilities:
// - `config`: settings from the environment / `.env`.
// - `session`: credentials and tokens for one process.
// - `api`: HTTP request layer and authentication.
// - `models`, `resources`: typed endpoint records and operations.
// - `discovery`, `split`: local document files.
// - `upload`: batched, paced document upload.
// - `output`: terminal rendering for the CLI.
pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod output;
pub mod resources;
pub mod session;
pub mod split;
pub mod upload;

pub use api::{ApiClient, Outcome, Payload};
pub use config::{Credential, Settings};
pub use error::{ClientError, Result};
