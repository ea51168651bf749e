pub mod cache;
pub mod eligibility;
pub mod format;
pub mod gateway;
pub mod paths;
pub mod pipeline;
pub mod profiles;
pub mod providers;
pub mod reconcile;
pub mod references;
pub mod render;
pub mod settings;
pub mod source;
pub mod thread;
pub mod transport;
pub mod users;
