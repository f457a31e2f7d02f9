//! Playlist table extraction for panels without a JSON listing
//!
//! The `/mylist` page renders one `<tr>` per playlist inside the first
//! `<tbody>`: name cell, url cell, then an actions cell whose buttons carry
//! `data-current_id`, `data-protected` and `data-playlist_type`.
//! Rows that do not fit this shape are skipped; a missing table is an
//! empty listing, never an error.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::{PlaylistEntry, DEFAULT_PLAYLIST_TYPE};

lazy_static! {
    static ref TBODY_SELECTOR: Selector = Selector::parse("tbody").unwrap();
    static ref ROW_SELECTOR: Selector = Selector::parse("tr").unwrap();
    static ref CELL_SELECTOR: Selector = Selector::parse("td").unwrap();
    static ref ACTION_SELECTOR: Selector = Selector::parse("[data-current_id]").unwrap();
}

/// Extract playlist rows in document order
pub fn extract_entries(html: &str) -> Vec<PlaylistEntry> {
    let document = Html::parse_document(html);
    let Some(tbody) = document.select(&TBODY_SELECTOR).next() else {
        debug!("No playlist table body in page");
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut rows = 0usize;

    for row in tbody.select(&ROW_SELECTOR) {
        rows += 1;
        if let Some(entry) = entry_from_row(row) {
            entries.push(entry);
        }
    }

    if entries.len() < rows {
        warn!(
            "Playlist table had {} rows but only {} matched the expected layout",
            rows,
            entries.len()
        );
    } else {
        debug!("Extracted {} playlist rows", entries.len());
    }

    entries
}

fn entry_from_row(row: ElementRef<'_>) -> Option<PlaylistEntry> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL_SELECTOR).collect();
    if cells.len() < 3 || !cells[..2].iter().all(is_centred) {
        return None;
    }

    let action = cells[2].select(&ACTION_SELECTOR).next()?;
    let attr = |name: &str| action.value().attr(name).map(|v| v.trim().to_string());

    let id = attr("data-current_id").filter(|id| !id.is_empty())?;
    let protected = attr("data-protected")?;
    let playlist_type = attr("data-playlist_type").unwrap_or_default();

    Some(PlaylistEntry {
        id,
        name: cell_text(cells[0]),
        url: cell_text(cells[1]),
        protected: protected == "1",
        playlist_type: if playlist_type.is_empty() {
            DEFAULT_PLAYLIST_TYPE.to_string()
        } else {
            playlist_type
        },
    })
}

fn is_centred(cell: &ElementRef<'_>) -> bool {
    cell.value().classes().any(|c| c == "text-center")
}

/// Text content with entities decoded by the parser
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, url: &str, id: &str, protected: &str, kind: &str) -> String {
        format!(
            r#"<tr>
                <td class="text-center">{name}</td>
                <td class="text-center">{url}</td>
                <td class="text-center">
                    <button class="btn edit" data-current_id="{id}" data-name="{name}"
                        data-protected="{protected}" data-playlist_type="{kind}">Edit</button>
                </td>
            </tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><table><thead><tr><th>Name</th></tr></thead><tbody>{}</tbody></table></body></html>",
            rows.join("\n")
        )
    }

    #[test]
    fn test_empty_document() {
        assert!(extract_entries("").is_empty());
        assert!(extract_entries("<html><body>Login</body></html>").is_empty());
    }

    #[test]
    fn test_table_without_matching_rows() {
        assert!(extract_entries(&page(&[])).is_empty());
        let html = page(&["<tr><td colspan=\"3\">No playlists yet</td></tr>".to_string()]);
        assert!(extract_entries(&html).is_empty());
    }

    #[test]
    fn test_rows_in_document_order() {
        let html = page(&[
            row("First", "http://a.example/get.php?u=1&amp;p=2", "11", "0", "general"),
            row("Second", "This playlist is protected", "12", "1", ""),
            row("Third", "http://c.example/list.m3u", "13", "0", "m3u"),
        ]);
        let entries = extract_entries(&html);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "First");
        assert_eq!(entries[0].url, "http://a.example/get.php?u=1&p=2");
        assert_eq!(entries[0].id, "11");
        assert!(!entries[0].protected);
        assert!(entries[1].protected);
        assert_eq!(entries[1].playlist_type, DEFAULT_PLAYLIST_TYPE);
        assert_eq!(entries[2].playlist_type, "m3u");
    }

    #[test]
    fn test_malformed_row_skipped_without_bleeding() {
        let html = page(&[
            row("Good", "http://a.example/1", "1", "0", "general"),
            "<tr><td class=\"text-center\">Broken</td></tr>".to_string(),
            row("Also good", "http://a.example/2", "2", "0", "general"),
        ]);
        let entries = extract_entries(&html);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_entities_decoded() {
        let html = page(&[row(
            "Caf&eacute; &#233;t&#xE9; &quot;HD&quot;",
            "http://a.example/get.php?u=1&#38;p=2",
            "7",
            "0",
            "general",
        )]);
        let entries = extract_entries(&html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Café été \"HD\"");
        assert_eq!(entries[0].url, "http://a.example/get.php?u=1&p=2");
    }
}
