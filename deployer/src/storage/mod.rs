//! Storage module

pub mod layout;
pub mod settings;

pub use layout::StorageLayout;
pub use settings::{load_settings, save_settings, Settings};
