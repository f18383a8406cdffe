//! App Store Connect implementations of the collaborator traits
//!
//! All API-backed collaborators share one [`ConnectClient`]; the session
//! they act under is passed in per call.
//!
//! ```ignore
//! use launchpad_stores::apple::*;
//!
//! let client = Arc::new(ConnectClient::new(AppStoreConnectConfig::new(key_id, issuer_id, key)));
//! let remote_app = ConnectRemoteApp::new(client.clone());
//! let listing = ConnectListingUploader::new(client.clone());
//! ```

mod app;
mod assets;
mod client;
mod inspect;
mod listing;
mod package;
mod pricing;
mod review;
mod screenshots;
mod session;
mod transporter;

pub use app::ConnectRemoteApp;
pub use assets::ConnectAssetUploader;
pub use client::{AppStoreConnectConfig, ConnectClient, API_BASE_URL, EDITABLE_VERSION_STATES};
pub use inspect::IpaInspector;
pub use listing::ConnectListingUploader;
pub use package::{IpaPackageBuilder, PkgPackageBuilder};
pub use pricing::{ConnectPriceTierUploader, BASE_TERRITORY};
pub use review::ConnectReviewSubmitter;
pub use screenshots::ConnectScreenshotUploader;
pub use session::ConnectSessionProvider;
pub use transporter::{transporter_errors, ItunesTransporter};
