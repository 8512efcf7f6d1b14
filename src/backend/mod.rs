//! Finding the backend and waiting for it to come up.

mod bootstrap;
mod locator;

pub use bootstrap::{
    BootstrapFailure, BootstrapState, Bootstrapper, HealthProbe, ReadinessPolicy,
};
pub use locator::{BackendLocator, DEFAULT_BACKEND_PORT, LocatorError};
