//! Property-Based Tests
//!
//! Invariants of the cleaner, validator and serializer over generated notebooks:
//! - Cleaning is idempotent
//! - Validation never changes the document
//! - Clean documents survive a serialize/parse round trip

use nbhygiene_notebook::{
    clean, parse_notebook_from_slice, parse_notebook_from_str, ExecutionCount, NotebookCell,
    NotebookDocument, Source, Validator,
};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Generators
// ============================================================================

fn arb_source() -> impl Strategy<Value = Source> {
    prop_oneof![
        "[a-zA-Z0-9 =#'\"\n_()äß]{0,80}".prop_map(Source::Text),
        prop::collection::vec("[a-z0-9 =\n]{0,20}", 0..5).prop_map(Source::Lines),
    ]
}

fn arb_cell() -> impl Strategy<Value = NotebookCell> {
    (
        0u8..3,
        arb_source(),
        prop::collection::vec(0i64..100, 0..3),
        prop::option::of(0i64..50),
    )
        .prop_map(|(kind, source, outputs, count)| match kind {
            0 => NotebookCell {
                source: Some(source),
                ..NotebookCell::markdown("")
            },
            1 => NotebookCell {
                source: Some(source),
                outputs: Some(outputs.into_iter().map(|n| json!({"n": n})).collect()),
                execution_count: count.map_or(ExecutionCount::Null, ExecutionCount::Count),
                ..NotebookCell::code("")
            },
            _ => NotebookCell {
                source: Some(source),
                ..parse_notebook_from_str(r#"{"cells": [{"cell_type": "raw", "metadata": {}}]}"#)
                    .expect("static raw cell parses")
                    .cells
                    .remove(0)
            },
        })
}

fn arb_notebook() -> impl Strategy<Value = NotebookDocument> {
    (prop::collection::vec(arb_cell(), 0..8), any::<bool>()).prop_map(|(cells, legacy)| {
        let mut nb = NotebookDocument::new(cells);
        if legacy {
            nb.execution_count = Some(json!(3));
        }
        nb
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Property: cleaning a cleaned notebook changes nothing
    #[test]
    fn proptest_clean_idempotent(nb in arb_notebook()) {
        let once = clean(&nb);
        let twice = clean(&once.document);
        prop_assert!(!twice.changed);
        prop_assert_eq!(&twice.document, &once.document);
    }

    /// Property: cleaned notebooks have no dirty cells
    #[test]
    fn proptest_clean_leaves_no_dirty_cells(nb in arb_notebook()) {
        let outcome = clean(&nb);
        prop_assert!(!outcome.document.is_dirty());
        prop_assert_eq!(outcome.changed, nb.is_dirty() || nb.execution_count.is_some());
    }

    /// Property: validation leaves the serialized document byte-for-byte identical
    #[test]
    fn proptest_validate_non_mutating(nb in arb_notebook()) {
        let before = nb.to_canonical_vec().unwrap();
        let _ = Validator::default().validate(&nb);
        prop_assert_eq!(nb.to_canonical_vec().unwrap(), before);
    }

    /// Property: clean documents round-trip through canonical JSON
    #[test]
    fn proptest_roundtrip(nb in arb_notebook()) {
        let cleaned = clean(&nb).document;
        let bytes = cleaned.to_canonical_vec().unwrap();
        let parsed = parse_notebook_from_slice(&bytes).unwrap();
        prop_assert_eq!(&parsed, &cleaned);
        prop_assert_eq!(parsed.to_canonical_vec().unwrap(), bytes);
    }

    /// Property: markdown cells are identical before and after cleaning
    #[test]
    fn proptest_markdown_untouched(nb in arb_notebook()) {
        let outcome = clean(&nb);
        for (before, after) in nb.cells.iter().zip(&outcome.document.cells) {
            if !before.is_code() {
                prop_assert_eq!(before, after);
            }
        }
    }

    /// Property: arbitrary bytes never make the validator panic
    #[test]
    fn proptest_validate_bytes_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        let findings = Validator::default().validate_bytes(&bytes);
        prop_assert!(!findings.is_empty() || parse_notebook_from_slice(&bytes).is_ok());
    }
}

// ============================================================================
// Scenarios
// ============================================================================

/// Markdown cell plus a run code cell: cleaning strips the code cell only
#[test]
fn scenario_clean_reports_change() {
    let nb = NotebookDocument::new(vec![
        NotebookCell::markdown("# Title"),
        NotebookCell::code("x = 1")
            .with_outputs(vec![json!({})])
            .with_execution_count(3),
    ]);
    let outcome = clean(&nb);
    assert!(outcome.changed);
    let code = &outcome.document.cells[1];
    assert_eq!(code.outputs, Some(Vec::new()));
    assert_eq!(code.execution_count, ExecutionCount::Null);
    assert_eq!(outcome.document.cells[0], nb.cells[0]);
}

/// 25-character quoted token is flagged on the right cell
#[test]
fn scenario_secret_in_code_cell() {
    let nb = NotebookDocument::new(vec![
        NotebookCell::markdown("# Setup"),
        NotebookCell::code("print('ok')"),
        NotebookCell::code("client = Client(key=\"A1b2C3d4E5f6G7h8I9j0K1l2M\")"),
    ]);
    let findings = Validator::default().validate(&nb);
    assert!(findings
        .iter()
        .any(|f| f.cell_index == Some(2) && f.message.contains("hardcoded API key")));
}
