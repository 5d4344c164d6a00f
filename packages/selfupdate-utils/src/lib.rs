pub mod context;
pub mod error;
pub mod http;
pub mod logger;
pub mod platform;
pub mod versioning;

// Re-export main utilities
pub use context::Context;
pub use error::{BoxError, HttpError};
pub use http::{ByteStream, HttpClient, HttpsConfigError, HyperClient, Response};
pub use logger::Logger;
pub use versioning::{Version, VersionError};
