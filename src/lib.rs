#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod interaction;
pub mod lifecycle;
pub mod registry;
pub mod remote;
pub mod render;
pub mod transport;

pub use config::Config;
pub use error::{RegistryError, RemoteError, RoleError};
pub use lifecycle::{Assignment, Candidate, ClearReport, LifecycleManager};
pub use registry::{GradientRole, RoleRegistry, ServerRegistry};
pub use remote::RoleGateway;
