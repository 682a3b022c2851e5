pub mod config;
pub mod logging;
pub mod record;
pub mod scheduler;
pub mod store;
pub mod system;
