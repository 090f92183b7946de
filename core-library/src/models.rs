//! Domain models for the hymnal catalogue
//!
//! Summaries are what listings, search and sync move around. Full records add
//! the verse structure and the lyrics text derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Hymns
// =============================================================================

/// Minimal hymn record used for listings
///
/// `number` is the stable identifier; a full sync replaces every summary
/// wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HymnSummary {
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl HymnSummary {
    pub fn new(number: u32, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            author: None,
            audio_url: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    /// Audio link, ignoring blank values
    pub fn playable_audio_url(&self) -> Option<&str> {
        self.audio_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn has_audio(&self) -> bool {
        self.playable_audio_url().is_some()
    }
}

/// One stanza of a hymn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    #[serde(default)]
    pub sequence: Option<u32>,
    #[serde(default)]
    pub lyrics: String,
    #[serde(default, alias = "chorus")]
    pub is_chorus: bool,
}

impl Verse {
    pub fn verse(sequence: u32, lyrics: impl Into<String>) -> Self {
        Self {
            sequence: Some(sequence),
            lyrics: lyrics.into(),
            is_chorus: false,
        }
    }

    pub fn chorus(sequence: u32, lyrics: impl Into<String>) -> Self {
        Self {
            sequence: Some(sequence),
            lyrics: lyrics.into(),
            is_chorus: true,
        }
    }
}

/// Hymn with verses and derived lyrics
///
/// `lyrics` and `chorus` are always derived from `verses` by
/// [`HymnFull::from_verses`]; they are stored only so offline readers don't
/// need to re-derive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HymnFull {
    #[serde(flatten)]
    pub summary: HymnSummary,
    pub lyrics: String,
    pub verses: Vec<Verse>,
    #[serde(default)]
    pub chorus: String,
}

impl HymnFull {
    pub fn from_verses(summary: HymnSummary, verses: Vec<Verse>) -> Self {
        let lyrics = derive_lyrics(&verses);
        let chorus = chorus_text(&verses);

        Self {
            summary,
            lyrics,
            verses,
            chorus,
        }
    }

    pub fn number(&self) -> u32 {
        self.summary.number
    }
}

/// Build the reading text for a hymn
///
/// Verses with empty lyrics are skipped. Non-chorus verses are prefixed with
/// `"{k}. "`, `k` counting only non-chorus verses from 1. Paragraphs are
/// separated by one blank line.
pub fn derive_lyrics(verses: &[Verse]) -> String {
    let mut ordinal = 0;
    let mut paragraphs = Vec::with_capacity(verses.len());

    for verse in verses {
        if verse.lyrics.trim().is_empty() {
            continue;
        }

        if verse.is_chorus {
            paragraphs.push(verse.lyrics.clone());
        } else {
            ordinal += 1;
            paragraphs.push(format!("{}. {}", ordinal, verse.lyrics));
        }
    }

    paragraphs.join("\n\n")
}

/// Lyrics of the first chorus-flagged verse, empty when there is none
pub fn chorus_text(verses: &[Verse]) -> String {
    verses
        .iter()
        .find(|verse| verse.is_chorus)
        .map(|verse| verse.lyrics.clone())
        .unwrap_or_default()
}

// =============================================================================
// Audio
// =============================================================================

/// A hymn that has a playable recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub audio_url: String,
    /// Last path segment of `audio_url`
    pub filename: String,
}

impl AudioTrack {
    /// Returns `None` for hymns without a non-blank audio link
    pub fn from_summary(summary: &HymnSummary) -> Option<Self> {
        let url = summary.playable_audio_url()?;

        Some(Self {
            number: summary.number,
            title: summary.title.clone(),
            author: summary.author.clone(),
            audio_url: url.to_string(),
            filename: filename_from_url(url),
        })
    }
}

fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

// =============================================================================
// Statistics & cache read models
// =============================================================================

/// Aggregate counts reported by the remote catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HymnStatistics {
    pub total_items: u64,
    pub items_with_audio: u64,
    pub percent_with_audio: f64,
}

impl HymnStatistics {
    pub fn items_without_audio(&self) -> u64 {
        self.total_items.saturating_sub(self.items_with_audio)
    }
}

/// What the local store currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_items: usize,
    pub last_update: Option<DateTime<Utc>>,
}

/// Offline readiness as shown to the UI; derived on demand, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub has_local_data: bool,
    pub total_items: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub cache_valid: bool,
}
