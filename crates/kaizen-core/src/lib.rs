pub mod approval;
pub mod collection;
pub mod config;
pub mod db;
pub mod directory;
pub mod entries;
pub mod error;
pub mod files;
pub mod identifier;
pub mod io;
pub mod notify;
pub mod opportunity;
pub mod paths;
pub mod phase;
pub mod query;
pub mod service;
pub mod transition;
pub mod types;

pub use error::{ErrorKind, KaizenError, Result};
pub use opportunity::Opportunity;
pub use service::OpportunityService;
pub use types::{Role, Status, SubStatus};
