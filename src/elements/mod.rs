mod error;
mod selector;
mod store;
mod types;

pub use error::ElementError;
pub use store::ElementStore;
pub use types::OrbitalElementSet;
