//! Error type shared by the rack, the instance manager and the slots.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RackError {
    /// No discovered plugin carries this URI.
    #[error("plugin not found: {uri}")]
    DescriptorNotFound { uri: String },

    /// No whole number of copies covers the channel count.
    #[error("plugin `{uri}` ({plugin_channels} channels) cannot serve {requested} channels")]
    ChannelIncompatible {
        uri: String,
        plugin_channels: usize,
        requested: usize,
    },

    /// The native plugin refused to instantiate.
    #[error("failed to instantiate copy {copy} of `{uri}`: {reason}")]
    NativeInstantiate {
        uri: String,
        copy: usize,
        reason: String,
    },

    /// A native processing call failed mid-block.
    #[error("processing failed in copy {copy} of `{uri}` at sample {offset}: {reason}")]
    NativeProcess {
        uri: String,
        copy: usize,
        offset: usize,
        reason: String,
    },

    /// A rack preset could not be read.
    #[error("failed to read rack preset '{path}': {source}")]
    Preset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rack preset could not be parsed.
    #[error("failed to parse rack preset: {0}")]
    PresetParse(#[from] serde_json::Error),
}

impl RackError {
    /// Errors that end a slot's current configuration rather than a
    /// single block.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RackError::NativeProcess { .. })
    }
}
