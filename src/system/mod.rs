pub mod host;
pub mod proc;
pub mod sampler;
pub mod snapshot;
pub mod source;
