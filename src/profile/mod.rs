// Persistence of settings, monitor region and bindings.

pub mod settings;
pub mod store;

pub use settings::AppSettings;
pub use store::{BindingRecord, History, LoadedProfile, ProfileRecord, ProfileStore, sanitize_file_stem};
