//! Hymn API response types
//!
//! Data structures for deserializing the hymn API responses. Field names
//! follow the server; everything is optional because the server is
//! inconsistent about which fields it sends.

use serde::Deserialize;

/// Hymn record as returned by list, search and lookup endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHymn {
    #[serde(default)]
    pub number: Option<u32>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Verse entry inside a single-hymn response
#[derive(Debug, Clone, Deserialize)]
pub struct RawVerse {
    #[serde(default)]
    pub sequence: Option<u32>,

    #[serde(default)]
    pub lyrics: Option<String>,

    #[serde(default)]
    pub chorus: bool,
}

/// `GET /hinos/{number}` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHymnDetail {
    #[serde(flatten)]
    pub hymn: RawHymn,

    #[serde(default)]
    pub verses: Vec<RawVerse>,
}

/// Structured pagination block
///
/// Zero values are treated as absent during normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPagination {
    #[serde(default)]
    pub pagina: Option<u32>,

    #[serde(default)]
    pub por_pagina: Option<u32>,

    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub total_paginas: Option<u32>,
}

/// Paginated hymn listing
///
/// The server sends either a `paginacao` object (sometimes named
/// `pagination`) or flat `currentPage` / `totalPages` / `totalHinos` fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHymnPage {
    #[serde(default)]
    pub hinos: Option<Vec<RawHymn>>,

    #[serde(default, alias = "pagination")]
    pub paginacao: Option<RawPagination>,

    #[serde(default)]
    pub current_page: Option<u32>,

    #[serde(default)]
    pub total_pages: Option<u32>,

    #[serde(default)]
    pub total_hinos: Option<u64>,
}

/// `GET /hinos/estatisticas` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatistics {
    #[serde(default)]
    pub total_hinos: Option<u64>,

    #[serde(default)]
    pub hinos_com_audio: Option<u64>,

    #[serde(default)]
    pub porcentagem_com_audio: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_page() {
        let raw: RawHymnPage = serde_json::from_str(
            r#"{
                "hinos": [{"number": 1, "title": "Chuvas de Graça", "author": "J. R.", "audioUrl": "https://x/1.mp3"}],
                "paginacao": {"pagina": 1, "porPagina": 20, "total": 640, "totalPaginas": 32}
            }"#,
        )
        .unwrap();

        let hymns = raw.hinos.unwrap();
        assert_eq!(hymns[0].number, Some(1));
        assert_eq!(hymns[0].audio_url.as_deref(), Some("https://x/1.mp3"));
        assert_eq!(raw.paginacao.unwrap().total_paginas, Some(32));
    }

    #[test]
    fn test_parse_english_pagination_alias() {
        let raw: RawHymnPage =
            serde_json::from_str(r#"{"hinos": [], "pagination": {"total": 5}}"#).unwrap();
        assert_eq!(raw.paginacao.unwrap().total, Some(5));
    }

    #[test]
    fn test_parse_detail_with_verses() {
        let raw: RawHymnDetail = serde_json::from_str(
            r#"{
                "number": 2,
                "title": "Hymn",
                "verses": [
                    {"sequence": 1, "lyrics": "Verse", "chorus": false},
                    {"sequence": 2, "lyrics": "Refrain", "chorus": true}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(raw.hymn.number, Some(2));
        assert_eq!(raw.verses.len(), 2);
        assert!(raw.verses[1].chorus);
    }
}
