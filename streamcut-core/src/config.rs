//! Digitizing configuration
//!
//! Controls the vertex acquisition policy of the stream collector.

use serde::{Deserialize, Serialize};

/// Configuration for stream digitizing
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigitizeConfig {
    /// Minimum distance in map units between automatically streamed vertices
    #[serde(default = "default_stream_tolerance")]
    pub stream_tolerance: f64,

    /// Whether cursor motion appends vertices automatically
    #[serde(default)]
    pub stream_enabled: bool,
}

fn default_stream_tolerance() -> f64 {
    5.0
}

impl Default for DigitizeConfig {
    fn default() -> Self {
        Self {
            stream_tolerance: default_stream_tolerance(),
            stream_enabled: false,
        }
    }
}
