//! Mapping from raw API payloads to domain types
//!
//! Pagination priority, per field:
//!
//! | Field       | 1st choice              | 2nd choice    | Fallback           |
//! |-------------|-------------------------|---------------|--------------------|
//! | page        | `paginacao.pagina`      | `currentPage` | requested page     |
//! | page size   | `paginacao.porPagina`   |               | requested size     |
//! | total       | `paginacao.total`       | `totalHinos`  | items on this page |
//! | total pages | `paginacao.totalPaginas`| `totalPages`  | 1                  |
//!
//! A zero value counts as missing.

use core_library::{HymnFull, HymnStatistics, HymnSummary, Page, Verse};
use tracing::warn;

use crate::types::{RawHymn, RawHymnDetail, RawHymnPage, RawStatistics};

fn present<T: Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

/// Build a canonical page from any of the server's listing shapes
pub fn normalize_page(
    raw: RawHymnPage,
    requested_page: u32,
    requested_size: u32,
) -> Page<HymnSummary> {
    let items: Vec<HymnSummary> = raw
        .hinos
        .unwrap_or_default()
        .into_iter()
        .filter_map(into_summary)
        .collect();

    let block = raw.paginacao.unwrap_or_default();

    let page = present(block.pagina)
        .or(present(raw.current_page))
        .unwrap_or(requested_page);
    let page_size = present(block.por_pagina).unwrap_or(requested_size);
    let total = present(block.total)
        .or(present(raw.total_hinos))
        .unwrap_or(items.len() as u64);
    let total_pages = present(block.total_paginas)
        .or(present(raw.total_pages))
        .unwrap_or(1);

    Page {
        items,
        total,
        page,
        total_pages,
        page_size,
    }
}

/// Map one raw record; records without a number are dropped
pub fn into_summary(raw: RawHymn) -> Option<HymnSummary> {
    let Some(number) = present(raw.number) else {
        warn!(title = ?raw.title, "Dropping hymn record without a number");
        return None;
    };

    Some(HymnSummary {
        number,
        title: raw.title.unwrap_or_default(),
        author: raw.author.filter(|a| !a.trim().is_empty()),
        audio_url: raw.audio_url.filter(|u| !u.trim().is_empty()),
    })
}

/// Map a single-hymn response into a full record
pub fn into_full(raw: RawHymnDetail) -> Option<HymnFull> {
    let summary = into_summary(raw.hymn)?;

    let verses = raw
        .verses
        .into_iter()
        .map(|verse| Verse {
            sequence: verse.sequence,
            lyrics: verse.lyrics.unwrap_or_default(),
            is_chorus: verse.chorus,
        })
        .collect();

    Some(HymnFull::from_verses(summary, verses))
}

pub fn into_statistics(raw: RawStatistics) -> HymnStatistics {
    HymnStatistics {
        total_items: raw.total_hinos.unwrap_or(0),
        items_with_audio: raw.hinos_com_audio.unwrap_or(0),
        percent_with_audio: raw.porcentagem_com_audio.unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawPagination;

    fn hymn(number: u32) -> RawHymn {
        RawHymn {
            number: Some(number),
            title: Some(format!("Hymn {}", number)),
            ..Default::default()
        }
    }

    #[test]
    fn test_structured_block_wins_over_flat_fields() {
        let raw = RawHymnPage {
            hinos: Some(vec![hymn(21), hymn(22)]),
            paginacao: Some(RawPagination {
                pagina: Some(2),
                por_pagina: Some(20),
                total: Some(640),
                total_paginas: Some(32),
            }),
            current_page: Some(9),
            total_pages: Some(99),
            total_hinos: Some(999),
        };

        let page = normalize_page(raw, 1, 10);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 20);
        assert_eq!(page.total, 640);
        assert_eq!(page.total_pages, 32);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_flat_fields_used_without_block() {
        let raw = RawHymnPage {
            hinos: Some(vec![hymn(1)]),
            current_page: Some(3),
            total_pages: Some(7),
            total_hinos: Some(640),
            ..Default::default()
        };

        let page = normalize_page(raw, 1, 100);
        assert_eq!(page.page, 3);
        assert_eq!(page.page_size, 100);
        assert_eq!(page.total, 640);
        assert_eq!(page.total_pages, 7);
    }

    #[test]
    fn test_fallbacks_when_nothing_reported() {
        let raw = RawHymnPage {
            hinos: Some(vec![hymn(1), hymn(2)]),
            ..Default::default()
        };

        let page = normalize_page(raw, 4, 25);
        assert_eq!(page.page, 4);
        assert_eq!(page.page_size, 25);
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_zero_values_count_as_missing() {
        let raw = RawHymnPage {
            hinos: Some(vec![hymn(1)]),
            paginacao: Some(RawPagination {
                pagina: Some(0),
                por_pagina: Some(0),
                total: Some(0),
                total_paginas: Some(0),
            }),
            total_hinos: Some(12),
            ..Default::default()
        };

        let page = normalize_page(raw, 1, 5);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 5);
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_records_without_number_are_dropped() {
        let raw = RawHymnPage {
            hinos: Some(vec![hymn(1), RawHymn::default(), hymn(3)]),
            ..Default::default()
        };

        let numbers: Vec<u32> = normalize_page(raw, 1, 20)
            .items
            .iter()
            .map(|h| h.number)
            .collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_blank_audio_url_becomes_none() {
        let summary = into_summary(RawHymn {
            number: Some(5),
            title: Some("Five".into()),
            author: Some(" ".into()),
            audio_url: Some("".into()),
        })
        .unwrap();

        assert_eq!(summary.author, None);
        assert_eq!(summary.audio_url, None);
    }

    #[test]
    fn test_full_record_derives_lyrics() {
        let raw: RawHymnDetail = serde_json::from_str(
            r#"{"number": 9, "title": "Nine", "verses": [
                {"sequence": 1, "lyrics": "One", "chorus": false},
                {"sequence": 2, "lyrics": "Refrain", "chorus": true},
                {"sequence": 3, "lyrics": "Two", "chorus": false}
            ]}"#,
        )
        .unwrap();

        let full = into_full(raw).unwrap();
        assert_eq!(full.lyrics, "1. One\n\nRefrain\n\n2. Two");
        assert_eq!(full.chorus, "Refrain");
        assert_eq!(full.verses.len(), 3);
    }

    #[test]
    fn test_statistics_mapping() {
        let stats = into_statistics(RawStatistics {
            total_hinos: Some(640),
            hinos_com_audio: Some(600),
            porcentagem_com_audio: Some(93.75),
        });

        assert_eq!(stats.total_items, 640);
        assert_eq!(stats.items_without_audio(), 40);

        let empty = into_statistics(RawStatistics::default());
        assert_eq!(empty.total_items, 0);
    }
}
