pub mod classifier;
pub mod handle;
pub mod loader;
pub mod resolver;
pub mod tracking;

pub use handle::{LoadFailure, LoadOutcome, LoadedModel};
pub use resolver::{ModelLocation, Resolver};
