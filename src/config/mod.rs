//! Configuration module for chapsplit.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    EncodeSettings, FetchSettings, GeneralSettings, PipelineSettings, ServerSettings, Settings,
};
