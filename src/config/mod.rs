//! Configuration loaded from `.bastion.toml`.

pub mod settings;

pub use settings::Settings;
