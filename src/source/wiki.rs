//! Wiki Page Parsing
//!
//! Extracts sections and simple tables from raw MediaWiki markup.
//! Only the flat table layout used by the liaison pages is understood:
//! one row per line, cells separated by `||`, headings by `!!`.

use indexmap::IndexMap;

const TABLE_START: &str = r#"{| class="wikitable""#;

/// One table row keyed by column heading
pub type WikiRow = IndexMap<String, String>;

/// Lines of a `== section ==` block, heading excluded.
///
/// The heading match ignores case. Returns `None` when the section is absent.
pub fn page_section<'a>(page: &'a str, section: &str) -> Option<Vec<&'a str>> {
    let heading = format!("== {} ==", section).to_lowercase();
    let mut lines = page.lines();
    lines.find(|line| line.to_lowercase() == heading)?;
    Some(lines.take_while(|line| !line.starts_with("== ")).collect())
}

/// Rows of the first wiki table inside `section`.
///
/// Returns `None` when the section is absent; a section without a table
/// yields no rows.
pub fn wiki_table(page: &str, section: &str) -> Option<Vec<WikiRow>> {
    let lines = page_section(page, section)?;
    let mut headings: Vec<String> = Vec::new();
    let mut rows = Vec::new();

    for line in lines.into_iter().skip_while(|line| *line != TABLE_START) {
        if line == "|-" {
            continue;
        } else if let Some(rest) = line.strip_prefix('!') {
            headings = rest.split("!!").map(|h| h.trim().to_string()).collect();
        } else if line == "}" || line == "|}" {
            break;
        } else if let Some(rest) = line.strip_prefix('|') {
            let row: WikiRow = headings
                .iter()
                .cloned()
                .zip(rest.split("||").map(|cell| cell.trim().to_string()))
                .collect();
            rows.push(row);
        }
    }

    Some(rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) const PAGE: &str = r#"Intro text.

== Oslo ==
{| class="wikitable"
! Project !! Liaison !! IRC Handle
|-
| Oslo || Someone Else || selse
|}

== Release management ==
Liaisons for the release team.

{| class="wikitable"
! Project !! Liaison !! IRC Handle
|-
| Compute || Alex Smith || asmith
|-
| Storage ||  ||
|-
| Release Management || Sam Rivers || srivers
|}

== Documentation ==
Nothing here.
"#;

    #[test]
    fn test_page_section_bounds() {
        let lines = page_section(PAGE, "Documentation").unwrap();
        assert_eq!(lines, vec!["Nothing here."]);
    }

    #[test]
    fn test_page_section_heading_ignores_case() {
        let lines = page_section(PAGE, "RELEASE MANAGEMENT").unwrap();
        assert_eq!(lines[0], "Liaisons for the release team.");
        assert!(lines.iter().all(|line| !line.starts_with("== ")));
    }

    #[test]
    fn test_missing_section() {
        assert!(page_section(PAGE, "Security").is_none());
        assert!(wiki_table(PAGE, "Security").is_none());
    }

    #[test]
    fn test_wiki_table_rows() {
        let rows = wiki_table(PAGE, "Release management").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Project"], "Compute");
        assert_eq!(rows[0]["Liaison"], "Alex Smith");
        assert_eq!(rows[0]["IRC Handle"], "asmith");
        assert_eq!(rows[1]["Liaison"], "");
        assert_eq!(rows[2]["Project"], "Release Management");
    }

    #[test]
    fn test_table_is_scoped_to_section() {
        let rows = wiki_table(PAGE, "Oslo").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Project"], "Oslo");
    }

    #[test]
    fn test_section_without_table() {
        assert_eq!(wiki_table(PAGE, "Documentation").unwrap(), Vec::<WikiRow>::new());
    }
}
