use pdf_mill::*;
use std::result::Result;

fn sel(text: &str, page_count: usize) -> Result<Vec<usize>, SelectionError> {
    select(&SelectionSpec::parse(text)?, page_count)
}

#[test]
fn test_all_selects_every_page() {
    for page_count in 1..30 {
        assert_eq!(sel("all", page_count).unwrap(), (0..page_count).collect::<Vec<_>>());
    }
}

#[test]
fn test_keywords() {
    assert_eq!(sel("first", 5).unwrap(), vec![0]);
    assert_eq!(sel("last", 5).unwrap(), vec![4]);
    assert_eq!(sel("odd", 5).unwrap(), vec![0, 2, 4]);
    assert_eq!(sel("even", 5).unwrap(), vec![1, 3]);
    assert_eq!(sel("  ALL ", 2).unwrap(), vec![0, 1]);
}

#[test]
fn test_last_n() {
    for page_count in 1..12 {
        for n in 1..=page_count {
            let expected: Vec<usize> = (page_count - n..page_count).collect();
            assert_eq!(sel(&format!("-{}", n), page_count).unwrap(), expected);
        }
        let err = sel(&format!("-{}", page_count + 1), page_count).unwrap_err();
        assert!(matches!(err, SelectionError::TooManyPages { .. }));
    }
}

#[test]
fn test_ranges() {
    assert_eq!(sel("2-4", 10).unwrap(), vec![1, 2, 3]);
    assert_eq!(sel("8-", 10).unwrap(), vec![7, 8, 9]);
    // Overshooting end is clamped
    assert_eq!(sel("3-99", 5).unwrap(), vec![2, 3, 4]);
    assert!(matches!(sel("4-2", 5), Err(SelectionError::StartAfterEnd { start: 4, end: 2 })));
    assert!(matches!(sel("7-9", 5), Err(SelectionError::InvalidRange { .. })));
    assert!(matches!(sel("0-2", 5), Err(SelectionError::InvalidRange { .. })));
}

#[test]
fn test_bounded_from_start() {
    assert_eq!(sel("1--1", 5).unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(sel("2--2", 6).unwrap(), vec![1, 2, 3]);
    assert_eq!(sel("--2", 4).unwrap(), vec![0, 1]);
    assert!(sel("1--5", 5).is_err());
    assert!(sel("4--2", 5).is_err());
}

#[test]
fn test_explicit_lists_keep_order() {
    let spec = SelectionSpec::ExplicitList(vec![-1]);
    assert_eq!(select(&spec, 5).unwrap(), vec![4]);

    let spec = SelectionSpec::ExplicitList(vec![1, -1]);
    assert_eq!(select(&spec, 5).unwrap(), vec![0, 4]);

    let spec = SelectionSpec::ExplicitList(vec![3, 1, 3]);
    assert_eq!(select(&spec, 5).unwrap(), vec![2, 0, 2]);

    let spec = SelectionSpec::ExplicitList(vec![6]);
    assert!(matches!(
        select(&spec, 5),
        Err(SelectionError::PageOutOfRange { page: 6, page_count: 5 })
    ));
    assert!(select(&SelectionSpec::ExplicitList(vec![-6]), 5).is_err());
}

#[test]
fn test_bare_page_number() {
    assert_eq!(sel("5", 9).unwrap(), vec![4]);
}

#[test]
fn test_empty_document() {
    assert!(matches!(sel("all", 0), Err(SelectionError::EmptyDocument)));
}

#[test]
fn test_syntax_errors() {
    assert!(matches!(SelectionSpec::parse(""), Err(SelectionError::Syntax { .. })));
    assert!(matches!(SelectionSpec::parse("1-2-3"), Err(SelectionError::Syntax { .. })));
    assert!(matches!(SelectionSpec::parse("a-b"), Err(SelectionError::Syntax { .. })));
    assert!(matches!(SelectionSpec::parse("middle"), Err(SelectionError::UnknownSpec(_))));
    assert!(selector::validate_syntax("3-").is_ok());
}

#[test]
fn test_json_forms() {
    let spec: SelectionSpec = serde_json::from_str("\"odd\"").unwrap();
    assert_eq!(spec, SelectionSpec::Keyword(Keyword::Odd));

    let spec: SelectionSpec = serde_json::from_str("3").unwrap();
    assert_eq!(spec, SelectionSpec::ExplicitList(vec![3]));

    let spec: SelectionSpec = serde_json::from_str("[2, -1]").unwrap();
    assert_eq!(select(&spec, 4).unwrap(), vec![1, 3]);

    assert!(serde_json::from_str::<SelectionSpec>("\"sometimes\"").is_err());
}
