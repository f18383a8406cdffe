//! App Store Connect collaborators for Launchpad
//!
//! The delivery pipeline in `launchpad-core` talks to the store only through
//! the traits in [`traits`]. This crate defines those seams and implements
//! them against the App Store Connect API and Apple's `iTMSTransporter`.
//!
//! ## Collaborators
//!
//! - [`SessionProvider`]: API key login and team context selection
//! - [`RemoteApp`]: app lookup and (side-effecting) version reconciliation
//! - [`MetadataStageExecutor`]: metadata, screenshot, price tier and asset uploads
//! - [`PackageBuilder`] and [`Transporter`]: `.itmsp` packaging and binary upload
//! - [`SubmissionService`]: review submission
//! - [`ArtifactInspector`]: reading identifiers out of an `.ipa`
//!
//! ## Usage
//!
//! ```ignore
//! use launchpad_stores::apple::{AppStoreConnectConfig, ConnectClient, ConnectSessionProvider};
//!
//! let client = Arc::new(ConnectClient::new(config));
//! let sessions = ConnectSessionProvider::new(client.clone());
//! let mut session = sessions.login("KEY123").await?;
//! ```

pub mod apple;
pub mod error;
pub mod traits;
pub mod types;

pub use error::StoreError;
pub use traits::{
    ArtifactInspector, MetadataStageExecutor, PackageBuilder, RemoteApp, SessionProvider,
    SubmissionService, Transporter,
};
pub use types::*;
