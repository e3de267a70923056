//! Settings for one headless publishing run.

pub mod settings;

pub use settings::RunSettings;
