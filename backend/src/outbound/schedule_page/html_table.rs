//! HTML to `RawScheduleTable` conversion.
//!
//! Only the first `tbody` of the document is read. Each `tr` child becomes a
//! row and each element child of that row becomes a cell. A cell's text is
//! its text nodes concatenated in document order, with `<br>` read as a line
//! break, so inline markup such as `<b>08:00</b>-<b>10:00</b>` stays one
//! window. Interpreting the lines is left to the domain extractor.

use scraper::{ElementRef, Html, Node, Selector};

use crate::domain::{RawScheduleTable, RawTableRow};

/// Parse `html` into the raw table body the extractor consumes.
///
/// # Examples
/// ```ignore
/// let table = parse_schedule_table("<table><tbody><tr><td>10.01.2024</td></tr></tbody></table>");
/// assert_eq!(table.body.map(|rows| rows.len()), Some(1));
/// ```
pub(super) fn parse_schedule_table(html: &str) -> RawScheduleTable {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("tbody") else {
        return RawScheduleTable::default();
    };
    let Some(tbody) = document.select(&selector).next() else {
        return RawScheduleTable::default();
    };

    let rows = child_elements(tbody)
        .filter(|element| element.value().name() == "tr")
        .map(row_cells)
        .collect();
    RawScheduleTable::with_rows(rows)
}

fn child_elements(parent: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    parent.children().filter_map(ElementRef::wrap)
}

fn row_cells(row: ElementRef<'_>) -> RawTableRow {
    child_elements(row).map(cell_text).collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(element) if element.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
