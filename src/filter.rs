//! Local row filtering shared by the sidebar and the admin tables.
//!
//! A row is visible iff the search term, lowercased, is a substring of the
//! row's rendered text, lowercased. An empty term shows every row.

/// Case-insensitive substring test.
pub fn matches(row_text: &str, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    row_text.to_lowercase().contains(&term.to_lowercase())
}

/// Keep the rows whose text, as produced by `text`, matches `term`.
pub fn filter_rows<'a, T, F>(rows: &'a [T], term: &str, text: F) -> Vec<&'a T>
where
    F: Fn(&T) -> String,
{
    rows.iter().filter(|row| matches(&text(row), term)).collect()
}
