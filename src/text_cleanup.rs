// Metadata cleanup
// Strips configured regex patterns from artist, title and album before submission

use crate::config::CleanupConfig;
use crate::scrobbler::TrackMetadata;
use regex::Regex;

pub struct MetadataCleaner {
    patterns: Vec<Regex>,
}

impl MetadataCleaner {
    /// Compile the configured patterns. Invalid ones are logged and skipped.
    pub fn new(config: &CleanupConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let patterns = config
            .patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("Invalid cleanup pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// A cleaner that only trims whitespace
    pub fn disabled() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn clean(&self, text: &str) -> String {
        let cleaned = self
            .patterns
            .iter()
            .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned());

        cleaned.trim().to_string()
    }

    /// Clean every field; an album that cleans down to nothing becomes `None`
    pub fn clean_metadata(&self, metadata: &TrackMetadata) -> TrackMetadata {
        TrackMetadata {
            artist: self.clean(&metadata.artist),
            title: self.clean(&metadata.title),
            album: metadata
                .album
                .as_deref()
                .map(|album| self.clean(album))
                .filter(|album| !album.is_empty()),
        }
    }
}
