//! Build stamping and over-the-air firmware publishing for the smart garden controller.
//!
//! Two workflows live here: [`versioning::VersionStamper`] bumps the build
//! counter and regenerates `include/version.h`, and
//! [`publisher::FirmwarePublisher`] pushes the compiled image to the device's
//! realtime database node and asks it to update itself.

pub mod config;
pub mod db_client;
pub mod devices;
pub mod error;
pub mod firmware;
pub mod header;
pub mod identity;
pub mod publisher;
pub mod versioning;

pub use error::{DeployError, DeployResult};
