//! Re-scans an already-generated presentation and proposes the minimal set
//! of text replacements needed to bring it back in sync with the dataset.
//!
//! Zero discovered tokens is a valid terminal result ("already
//! synchronized"), never an error — absence of drift is success.

use crate::engine::slide_builder::PresentationSnapshot;
use common::model::replacement::ReplacementOperation;
use common::model::resync::ResyncMode;
use common::model::row::RowData;
use regex::Regex;
use std::collections::HashSet;

/// The replacement operations proposed for one resync run.
#[derive(Debug)]
pub struct ResyncOutcome {
    pub operations: Vec<ReplacementOperation>,
    pub slide_count: usize,
    pub mode: ResyncMode,
}

pub struct ResyncDiffer;

impl ResyncDiffer {
    /// Diffs the snapshot against the dataset.
    ///
    /// Placeholders mode scans every slide's text for remaining `{{header}}`
    /// or `{header}` tokens and replaces each with the first data row's
    /// value for that header. A token found on several slides still yields a
    /// single unscoped operation (replace everywhere).
    ///
    /// Enrichment mode keeps the documented behavior of the product: the
    /// distinct values of each column are collected, and only columns that
    /// actually carry data and whose token text is still present
    /// un-substituted produce operations. No per-slide value diffing is
    /// attempted.
    pub fn diff(
        snapshot: &PresentationSnapshot,
        headers: &[String],
        rows: &[RowData],
        mode: ResyncMode,
    ) -> ResyncOutcome {
        let first_row = rows.first();
        let mut operations = Vec::new();
        let mut seen = HashSet::new();

        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            if header.is_empty() {
                continue;
            }
            if mode == ResyncMode::Enrichment && !column_has_values(rows, idx) {
                continue;
            }

            let value = first_row.map(|r| r.cell(idx)).unwrap_or("").to_string();
            let double = format!("{{{{{header}}}}}");
            let single = format!("{{{header}}}");

            if snapshot.contains(&double) && seen.insert(double.clone()) {
                operations.push(replace_everywhere(double, value.clone()));
            }
            if contains_single_brace_token(snapshot, header) && seen.insert(single.clone()) {
                operations.push(replace_everywhere(single, value));
            }
        }

        ResyncOutcome {
            operations,
            slide_count: snapshot.slide_count(),
            mode,
        }
    }
}

fn replace_everywhere(match_text: String, replace_text: String) -> ReplacementOperation {
    ReplacementOperation {
        match_text,
        replace_text,
        case_sensitive: true,
        scope_slide_ids: None,
    }
}

fn column_has_values(rows: &[RowData], idx: usize) -> bool {
    rows.iter().any(|r| !r.cell(idx).trim().is_empty())
}

/// Whether `{header}` occurs on its own, not as the inside of a `{{header}}`
/// token. A plain substring check cannot tell the two apart.
fn contains_single_brace_token(snapshot: &PresentationSnapshot, header: &str) -> bool {
    let pattern = format!(
        "(?:^|[^{{])\\{{{}\\}}(?:[^}}]|$)",
        regex::escape(header)
    );
    // The header came from a spreadsheet cell; if it somehow breaks the
    // pattern, treat the token as absent rather than failing the resync.
    match Regex::new(&pattern) {
        Ok(re) => snapshot.texts().any(|t| re.is_match(t)),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::slide_builder::SlideSnapshot;

    fn snapshot(slides: &[(&str, &[&str])]) -> PresentationSnapshot {
        PresentationSnapshot {
            slides: slides
                .iter()
                .map(|(id, texts)| SlideSnapshot {
                    slide_id: id.to_string(),
                    texts: texts.iter().map(|t| t.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn dataset() -> (Vec<String>, Vec<RowData>) {
        (
            vec!["Nombre".into(), "Precio".into()],
            vec![RowData {
                row_index: 0,
                cells: vec!["Ana".into(), "100".into()],
            }],
        )
    }

    #[test]
    fn test_placeholders_mode_replaces_remaining_tokens() {
        let (headers, rows) = dataset();
        let snap = snapshot(&[("s1", &["Hola {{Nombre}}", "vale {{Precio}}"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Placeholders);

        assert_eq!(outcome.slide_count, 1);
        assert_eq!(outcome.operations.len(), 2);
        assert_eq!(outcome.operations[0].match_text, "{{Nombre}}");
        assert_eq!(outcome.operations[0].replace_text, "Ana");
        assert!(outcome.operations[0].scope_slide_ids.is_none());
    }

    #[test]
    fn test_token_on_multiple_slides_yields_single_operation() {
        let (headers, rows) = dataset();
        let snap = snapshot(&[
            ("s1", &["{{Nombre}}"]),
            ("s2", &["otra vez {{Nombre}}"]),
        ]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Placeholders);
        assert_eq!(outcome.operations.len(), 1);
    }

    #[test]
    fn test_single_brace_token_detected_independently() {
        let (headers, rows) = dataset();
        let snap = snapshot(&[("s1", &["Hola {Nombre}, bienvenida"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Placeholders);
        assert_eq!(outcome.operations.len(), 1);
        assert_eq!(outcome.operations[0].match_text, "{Nombre}");
    }

    #[test]
    fn test_double_brace_does_not_count_as_single() {
        let (headers, rows) = dataset();
        let snap = snapshot(&[("s1", &["{{Nombre}}"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Placeholders);
        let matches: Vec<_> = outcome
            .operations
            .iter()
            .map(|o| o.match_text.as_str())
            .collect();
        assert_eq!(matches, vec!["{{Nombre}}"]);
    }

    #[test]
    fn test_no_tokens_left_is_synchronized_not_error() {
        let (headers, rows) = dataset();
        let snap = snapshot(&[("s1", &["Hola Ana, vale 100"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Placeholders);
        assert!(outcome.operations.is_empty());
        assert_eq!(outcome.slide_count, 1);
    }

    #[test]
    fn test_missing_first_row_value_degrades_to_empty() {
        let headers = vec!["Nombre".to_string()];
        let snap = snapshot(&[("s1", &["{{Nombre}}"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &[], ResyncMode::Placeholders);
        assert_eq!(outcome.operations.len(), 1);
        assert_eq!(outcome.operations[0].replace_text, "");
    }

    #[test]
    fn test_enrichment_skips_columns_without_values() {
        let headers = vec!["Nombre".to_string(), "Vacia".to_string()];
        let rows = vec![RowData {
            row_index: 0,
            cells: vec!["Ana".into(), "".into()],
        }];
        let snap = snapshot(&[("s1", &["{{Nombre}} {{Vacia}}"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Enrichment);
        let matches: Vec<_> = outcome
            .operations
            .iter()
            .map(|o| o.match_text.as_str())
            .collect();
        assert_eq!(matches, vec!["{{Nombre}}"]);
    }

    #[test]
    fn test_table_cell_text_is_scanned_too() {
        let (headers, rows) = dataset();
        // Snapshot texts are flattened from shapes and table cells alike.
        let snap = snapshot(&[("s1", &["celda normal", "{{Precio}}"])]);
        let outcome = ResyncDiffer::diff(&snap, &headers, &rows, ResyncMode::Placeholders);
        assert_eq!(outcome.operations.len(), 1);
        assert_eq!(outcome.operations[0].replace_text, "100");
    }
}
