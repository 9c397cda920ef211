mod common;

use common::*;
use pdf_mill::processor::get_input_files;
use pdf_mill::transform::*;
use pdf_mill::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn profile(name: &str, pages: &str, output_dir: &Path) -> OutputProfile {
    OutputProfile::new(name, SelectionSpec::parse(pages).unwrap()).with_output_dir(output_dir)
}

fn config(outputs: Vec<OutputProfile>) -> Config {
    Config {
        outputs,
        ..Default::default()
    }
}

fn printing(targets: Vec<PrintTarget>, merge: bool) -> PrintConfig {
    PrintConfig {
        enabled: true,
        merge,
        targets,
        ..Default::default()
    }
}

fn mock_run(backend: &Arc<MockBackend>) -> RunOptions {
    RunOptions::new(backend.clone())
}

fn file_names(calls: &[PrintCall]) -> Vec<(String, String)> {
    calls
        .iter()
        .map(|call| {
            (
                call.path.file_name().unwrap().to_string_lossy().into_owned(),
                call.printer.clone(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_input_discovery() {
    let dir = tempfile::tempdir().unwrap();
    write_pdf(dir.path(), "b.pdf", create_test_pdf(1));
    write_pdf(dir.path(), "a.pdf", create_test_pdf(1));
    std::fs::write(dir.path().join("notes.txt"), "not a pdf").unwrap();

    let files = get_input_files(dir.path(), "*.pdf").await.unwrap();
    let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
    assert_eq!(names, ["a.pdf", "b.pdf"]);

    let single = get_input_files(&files[1], "*.txt").await.unwrap();
    assert_eq!(single, vec![files[1].clone()]);

    assert!(get_input_files(&dir.path().join("missing"), "*.pdf").await.is_err());
}

#[tokio::test]
async fn test_writes_one_output_per_pair() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "order.pdf", create_test_pdf(4));
    write_pdf(input.path(), "invoice.pdf", create_test_pdf(2));

    let mut label = profile("label", "last", output.path());
    label.filename_prefix = "L_".to_string();
    label.transforms = vec![TransformStep::new(Transform::Rotate(RotateConfig::new(
        RotateAngle::Landscape,
    )))];
    let summary_profile = profile("summary", "1-2", output.path());
    let config = config(vec![label, summary_profile]);

    let backend = Arc::new(MockBackend::default());
    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.written().count(), 4);

    let label_out = output.path().join("L_order_label.pdf");
    assert_eq!(page_sizes(&label_out), vec![(792.0, 612.0)]);
    assert_eq!(page_count(&output.path().join("invoice_summary.pdf")), 2);
    assert_eq!(page_count(&output.path().join("order_summary.pdf")), 2);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_output_dir_override() {
    let input = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let source = write_pdf(input.path(), "doc.pdf", create_test_pdf(1));

    let config = config(vec![profile("copy", "all", Path::new("/nonexistent/never-used"))]);
    let backend = Arc::new(MockBackend::default());
    let run = mock_run(&backend).with_output_dir(elsewhere.path());
    process(&config, &source, &run).await.unwrap();

    assert!(elsewhere.path().join("doc_copy.pdf").exists());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = write_pdf(input.path(), "doc.pdf", create_test_pdf(3));

    let mut p = profile("odd", "odd", output.path());
    p.print = printing(vec![PrintTarget::new("main", "office")], false);
    p.debug = true;
    let config = config(vec![p]);

    let backend = Arc::new(MockBackend::default());
    let summary = process(&config, &source, &mock_run(&backend).with_dry_run(true))
        .await
        .unwrap();

    assert!(matches!(
        summary.reports[0].outcome,
        ProfileOutcome::DryRun { pages: 2 }
    ));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_failures_continue_or_stop() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "a_short.pdf", create_test_pdf(1));
    write_pdf(input.path(), "b_long.pdf", create_test_pdf(6));

    let mut config = config(vec![profile("tail", "-5", output.path())]);
    let backend = Arc::new(MockBackend::default());

    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();
    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    match &summary.reports[0].outcome {
        ProfileOutcome::Failed { error } => {
            assert!(matches!(error, MillError::Profile { profile, .. } if profile == "tail"));
            assert!(error.to_string().contains("a_short.pdf"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(
        summary.reports[1].outcome,
        ProfileOutcome::Written { pages: 5, .. }
    ));

    config.settings.on_error = ErrorPolicy::Stop;
    let err = process(&config, input.path(), &mock_run(&backend)).await.unwrap_err();
    assert!(matches!(err, MillError::Profile { .. }));
}

#[tokio::test]
async fn test_each_file_goes_to_every_target_without_merge() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "a.pdf", create_test_pdf(2));
    write_pdf(input.path(), "b.pdf", create_test_pdf(2));

    let mut p = profile("out", "all", output.path());
    p.print = printing(
        vec![
            PrintTarget::new("one", "printer-1").with_copies(2),
            PrintTarget::new("two", "printer-2"),
        ],
        false,
    );
    let config = config(vec![p]);

    let backend = Arc::new(MockBackend::default());
    process(&config, input.path(), &mock_run(&backend)).await.unwrap();

    let calls = backend.calls();
    assert_eq!(
        file_names(&calls),
        vec![
            ("a_out.pdf".to_string(), "printer-1".to_string()),
            ("a_out.pdf".to_string(), "printer-2".to_string()),
            ("b_out.pdf".to_string(), "printer-1".to_string()),
            ("b_out.pdf".to_string(), "printer-2".to_string()),
        ]
    );
    assert_eq!(calls[0].copies, 2);
    assert!(calls.iter().all(|c| !c.dry_run));
}

#[tokio::test]
async fn test_merge_then_split_by_weight() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "a.pdf", create_test_pdf(12));
    write_pdf(input.path(), "b.pdf", create_test_pdf(8));

    let mut p = profile("batch", "all", output.path());
    p.print = printing(
        vec![
            PrintTarget::new("slow", "printer-slow").with_weight(1),
            PrintTarget::new("fast", "printer-fast").with_weight(3),
        ],
        true,
    );
    let config = config(vec![p]);

    let backend = Arc::new(MockBackend::default());
    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();

    let calls = backend.calls();
    assert_eq!(
        file_names(&calls),
        vec![
            ("split_batch_fast.pdf".to_string(), "printer-fast".to_string()),
            ("split_batch_slow.pdf".to_string(), "printer-slow".to_string()),
        ]
    );
    assert_eq!(page_count(&calls[0].path), 15);
    assert_eq!(page_count(&calls[1].path), 5);

    let temporary: Vec<PathBuf> = summary.temporary_files.clone();
    assert!(temporary.contains(&output.path().join("merged_batch.pdf")));
    assert_eq!(page_count(&output.path().join("merged_batch.pdf")), 20);
    assert_eq!(temporary.len(), 3);
}

#[tokio::test]
async fn test_blocking_safety_keeps_outputs_but_skips_printing() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "big.pdf", create_sized_pdf(&[(1000.0, 1000.0)]));

    let mut p = profile("poster", "all", output.path());
    p.print = printing(vec![PrintTarget::new("main", "office")], false);
    p.print.max_page_size = Some([Coordinate::from("8.5in"), Coordinate::from("11in")]);
    let mut config = config(vec![p]);
    config.settings.on_error = ErrorPolicy::Stop;

    let backend = Arc::new(MockBackend::default());
    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();

    assert!(backend.calls().is_empty());
    assert!(output.path().join("big_poster.pdf").exists());
    assert_eq!(summary.print_errors.len(), 1);
    assert!(matches!(&summary.print_errors[0], MillError::Safety(v) if v.profile == "poster"));
    assert_eq!((summary.succeeded, summary.failed, summary.print_failed), (1, 0, 1));
}

#[tokio::test]
async fn test_warning_safety_prints_anyway() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "big.pdf", create_test_pdf(3));

    let mut p = profile("p", "all", output.path());
    p.print = printing(vec![PrintTarget::new("main", "office")], false);
    p.print.max_pages = Some(2);
    p.print.action = SafetyAction::Warn;
    let config = config(vec![p]);

    let backend = Arc::new(MockBackend::default());
    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();
    assert_eq!(backend.calls().len(), 1);
    assert!(summary.print_errors.is_empty());
}

#[tokio::test]
async fn test_print_failure_policy() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "doc.pdf", create_test_pdf(1));

    let mut p = profile("p", "all", output.path());
    p.print = printing(vec![PrintTarget::new("main", "office")], false);
    let mut config = config(vec![p]);

    let backend = Arc::new(MockBackend::failing());
    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();
    assert_eq!((summary.succeeded, summary.failed), (1, 0));
    assert_eq!(summary.print_failed, 1);
    assert!(matches!(summary.print_errors[0], MillError::Print(_)));

    config.settings.on_error = ErrorPolicy::Stop;
    let err = process(&config, input.path(), &mock_run(&backend)).await.unwrap_err();
    assert!(matches!(err, MillError::Print(_)));
}

#[tokio::test]
async fn test_cleanup_after_print() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let a = write_pdf(input.path(), "a.pdf", create_test_pdf(2));
    let b = write_pdf(input.path(), "b.pdf", create_test_pdf(2));

    let mut printed = profile("printed", "all", output.path());
    printed.print = printing(
        vec![
            PrintTarget::new("x", "printer-x"),
            PrintTarget::new("y", "printer-y"),
        ],
        true,
    );
    let kept = profile("kept", "first", output.path());

    let mut config = config(vec![printed, kept]);
    config.settings.cleanup_source = true;
    config.settings.cleanup_output_after_print = true;

    let backend = Arc::new(MockBackend::default());
    process(&config, input.path(), &mock_run(&backend)).await.unwrap();
    assert_eq!(backend.calls().len(), 2);

    assert!(!a.exists() && !b.exists());
    let mut left: Vec<String> = std::fs::read_dir(output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, ["a_kept.pdf", "b_kept.pdf"]);
}

#[tokio::test]
async fn test_keyword_filter_and_sort() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "a.pdf", create_text_pdf(&["Invoice 1001"]));
    write_pdf(input.path(), "B.pdf", create_text_pdf(&["Packing slip"]));
    write_pdf(input.path(), "c.pdf", create_text_pdf(&["Invoice 1002"]));

    let mut config = config(vec![profile("out", "all", output.path())]);
    config.input.filter = Some(FilterConfig {
        keywords: vec!["Invoice".to_string()],
        match_mode: KeywordMatch::Any,
    });
    config.input.sort = Some(SortOrder::NameDesc);

    let backend = Arc::new(MockBackend::default());
    let summary = process(&config, input.path(), &mock_run(&backend)).await.unwrap();
    let names: Vec<_> = summary
        .inputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["c.pdf", "a.pdf"]);
}

#[tokio::test]
async fn test_conflicting_sorts_are_rejected() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "a.pdf", create_test_pdf(1));

    let mut p = profile("out", "all", output.path());
    p.sort = Some(SortOrder::TimeAsc);
    let mut config = config(vec![p]);
    config.input.sort = Some(SortOrder::NameAsc);

    let backend = Arc::new(MockBackend::default());
    let err = process(&config, input.path(), &mock_run(&backend)).await.unwrap_err();
    assert!(matches!(err, MillError::Config(_)));
}
