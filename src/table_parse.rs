use scraper::{ElementRef, Html, Selector};

/// Generic row/column view of one HTML table. Header names are trimmed;
/// cell text is flattened (nested links etc. collapse to their text).
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Extract the first `<table>` in the document.
///
/// Basketball-Reference stat tables carry a decorative over-header row, so
/// the header is taken from the *last* `thead` row. Tables without a `thead`
/// fall back to first-row-is-header.
pub fn first_table(html: &str) -> Option<RawTable> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").ok()?;
    let thead_row_sel = Selector::parse("thead tr").ok()?;
    let tbody_row_sel = Selector::parse("tbody tr").ok()?;
    let cell_sel = Selector::parse("th, td").ok()?;

    let table = document.select(&table_sel).next()?;

    let headers: Vec<String> = table
        .select(&thead_row_sel)
        .last()
        .map(|tr| row_cells(tr, &cell_sel))
        .unwrap_or_default();

    // The parser normalizes loose <tr> into a <tbody>, so this covers both
    // well-formed and bare tables.
    let body_rows: Vec<Vec<String>> = table
        .select(&tbody_row_sel)
        .map(|tr| row_cells(tr, &cell_sel))
        .filter(|cells| !cells.is_empty())
        .collect();

    if headers.is_empty() {
        let mut rows = body_rows.into_iter();
        let headers = rows.next()?;
        return Some(RawTable {
            headers,
            rows: rows.collect(),
        });
    }
    Some(RawTable {
        headers,
        rows: body_rows,
    })
}

/// First column whose trimmed name contains `needle` (case-sensitive).
/// The upstream source varies a trailing marker character on stat columns
/// (e.g. `BPM*`), so lookup is by substring, never by exact name.
pub fn find_column_containing(headers: &[String], needle: &str) -> Option<usize> {
    headers.iter().position(|name| name.contains(needle))
}

fn row_cells(tr: ElementRef, cell_sel: &Selector) -> Vec<String> {
    tr.select(cell_sel)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_matches_substring() {
        let headers: Vec<String> = ["Rk", "Player", "OBPM", "BPM*"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_column_containing(&headers, "BPM"), Some(2));
        assert_eq!(find_column_containing(&headers, "VORP"), None);
    }

    #[test]
    fn column_lookup_is_case_sensitive() {
        let headers: Vec<String> = vec!["bpm".to_string()];
        assert_eq!(find_column_containing(&headers, "BPM"), None);
    }

    #[test]
    fn parses_headerless_table() {
        let html = "<table>\
            <tr><th>A</th><th>B</th></tr>\
            <tr><td>1</td><td>2</td></tr>\
            </table>";
        let table = first_table(html).expect("table should parse");
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn header_comes_from_last_thead_row() {
        let html = "<table>\
            <thead>\
            <tr><th colspan=\"2\">Advanced</th></tr>\
            <tr><th> Rk </th><th> BPM </th></tr>\
            </thead>\
            <tbody><tr><th>1</th><td>4.5</td></tr></tbody>\
            </table>";
        let table = first_table(html).expect("table should parse");
        assert_eq!(table.headers, vec!["Rk", "BPM"]);
        assert_eq!(table.rows, vec![vec!["1", "4.5"]]);
    }

    #[test]
    fn only_first_table_is_consumed() {
        let html = "<table><tr><th>X</th></tr><tr><td>1</td></tr></table>\
            <table><tr><th>Y</th></tr><tr><td>2</td></tr></table>";
        let table = first_table(html).expect("table should parse");
        assert_eq!(table.headers, vec!["X"]);
    }

    #[test]
    fn no_table_yields_none() {
        assert!(first_table("<html><body><p>nothing</p></body></html>").is_none());
    }
}
