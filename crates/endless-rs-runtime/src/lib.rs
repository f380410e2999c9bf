//! Runtime orchestration: the dimension service, teleport helpers, portal
//! router, seed-derived dimension configuration, and data-directory setup.

pub mod bootstrap;
pub mod config;
pub mod derive;
pub mod error;
pub mod router;
pub mod service;
pub mod teleport;

pub use config::RuntimeConfig;
pub use error::DimensionServiceError;
pub use router::{PortalRouter, RouterConfig};
pub use service::{
    DimensionService, InstanceCallback, InstanceFuture, InstanceHost, InstanceResult,
};
