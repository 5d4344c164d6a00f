pub mod apply;
pub mod config;
pub mod error;
pub mod filter;
pub mod updater;

pub use apply::{Apply, ApplyError, ApplyOptions, ReplaceExecutable, Staged};
pub use config::{Config, RepositoryType};
pub use error::{Error, Result};
pub use filter::{Filter, Template, TemplateError, DEFAULT_TEMPLATE};
pub use updater::{ReleaseResult, Updater};
