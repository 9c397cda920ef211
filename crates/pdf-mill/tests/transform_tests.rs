mod common;

use chrono::NaiveDate;
use common::*;
use pdf_mill::orientation::FixedDetector;
use pdf_mill::raster::SolidRasterizer;
use pdf_mill::transform::*;
use pdf_mill::*;
use std::sync::Arc;

fn source(sizes: &[(f32, f32)]) -> SourceDocument {
    SourceDocument::new("memory.pdf", create_sized_pdf(sizes))
}

fn all_pages(doc: &SourceDocument) -> Vec<Page> {
    let indices: Vec<usize> = (0..doc.page_count()).collect();
    doc.pages(&indices).unwrap()
}

fn run(steps: Vec<Transform>, pages: Vec<Page>) -> Result<Vec<Page>> {
    let origins: Vec<usize> = (0..pages.len()).collect();
    let pipeline = TransformPipeline::new(steps.into_iter().map(TransformStep::from).collect());
    pipeline.apply(pages, &TransformContext::new(origins))
}

fn pt(value: f32) -> Coordinate {
    Coordinate::Points(value)
}

fn crop(llx: f32, lly: f32, urx: f32, ury: f32) -> CropConfig {
    CropConfig::new([pt(llx), pt(lly)], [pt(urx), pt(ury)])
}

fn rotate(degrees: i64) -> Transform {
    Transform::Rotate(RotateConfig::new(RotateAngle::Fixed(
        QuarterTurn::from_degrees(degrees).unwrap(),
    )))
}

#[test]
fn test_crop_then_contain_hits_target_size() {
    let doc = source(&[(612.0, 792.0), (842.0, 595.0), (200.0, 1000.0)]);
    let steps = vec![
        Transform::Crop(crop(10.0, 20.0, 180.0, 400.0)),
        Transform::Resize(ResizeConfig::new("4in", "6in", FitMode::Contain)),
    ];
    let pages = run(steps, all_pages(&doc)).unwrap();
    assert_eq!(pages.len(), 3);
    for page in &pages {
        assert!(close(page.width(), 288.0));
        assert!(close(page.height(), 432.0));
    }
}

#[test]
fn test_every_fit_mode_sets_target_box() {
    for fit in [FitMode::Contain, FitMode::Cover, FitMode::Stretch] {
        let doc = source(&[(612.0, 792.0)]);
        let steps = vec![Transform::Resize(ResizeConfig::new("100mm", "150mm", fit))];
        let pages = run(steps, all_pages(&doc)).unwrap();
        assert!(close(pages[0].width(), 283.46));
        assert!(close(pages[0].height(), 425.2));
    }
}

#[test]
fn test_quarter_turns_compose() {
    let doc = source(&[(612.0, 792.0)]);

    let turned = run(vec![rotate(90)], all_pages(&doc)).unwrap();
    assert_eq!(turned[0].dimensions(), (792.0, 612.0));

    let back = run(vec![rotate(90), rotate(270)], all_pages(&doc)).unwrap();
    assert_eq!(back[0].dimensions(), (612.0, 792.0));

    let half = run(vec![rotate(180)], all_pages(&doc)).unwrap();
    assert_eq!(half[0].dimensions(), (612.0, 792.0));
}

#[test]
fn test_orientation_keywords() {
    let doc = source(&[(612.0, 792.0), (792.0, 612.0)]);

    let landscape = Transform::Rotate(RotateConfig::new(RotateAngle::Landscape));
    let pages = run(vec![landscape], all_pages(&doc)).unwrap();
    assert!(pages.iter().all(Page::is_landscape));

    let portrait = Transform::Rotate(RotateConfig::new(RotateAngle::Portrait));
    let pages = run(vec![portrait], all_pages(&doc)).unwrap();
    assert!(pages.iter().all(|p| !p.is_landscape()));
}

#[test]
fn test_rotate_subset_by_position() {
    let doc = source(&[(100.0, 200.0); 3]);
    let mut config = RotateConfig::new(RotateAngle::Fixed(QuarterTurn::Ninety));
    config.pages = Some(vec![1, 7]);
    let pages = run(vec![Transform::Rotate(config)], all_pages(&doc)).unwrap();
    let dims: Vec<(f32, f32)> = pages.iter().map(Page::dimensions).collect();
    assert_eq!(dims, vec![(100.0, 200.0), (200.0, 100.0), (100.0, 200.0)]);
}

#[test]
fn test_rotate_empty_subset_rotates_every_page() {
    let doc = source(&[(612.0, 792.0); 2]);
    let config: RotateConfig = serde_json::from_str(r#"{"angle": 90, "pages": []}"#).unwrap();
    let pages = run(vec![Transform::Rotate(config)], all_pages(&doc)).unwrap();
    let dims: Vec<(f32, f32)> = pages.iter().map(Page::dimensions).collect();
    assert_eq!(dims, vec![(792.0, 612.0), (792.0, 612.0)]);
}

#[test]
fn test_auto_rotation_asks_about_source_pages() {
    let doc = source(&[(100.0, 200.0); 4]);
    // Selection reorders the source: positions 0 and 1 are source pages 3 and 0
    let pages = doc.pages(&[3, 0]).unwrap();
    let context = TransformContext::new(vec![3, 0]).with_source("memory.pdf");

    let detector = FixedDetector::new(QuarterTurn::Zero).with_page(3, QuarterTurn::Ninety);
    let capabilities = Capabilities::default().with_detector(Arc::new(detector));
    let pipeline = TransformPipeline::new(vec![TransformStep::new(Transform::Rotate(
        RotateConfig::new(RotateAngle::Auto),
    ))])
    .with_capabilities(capabilities);

    let pages = pipeline.apply(pages, &context).unwrap();
    assert_eq!(pages[0].dimensions(), (200.0, 100.0));
    assert_eq!(pages[1].dimensions(), (100.0, 200.0));
}

#[test]
fn test_auto_rotation_without_detector_fails_with_context() {
    let doc = source(&[(100.0, 200.0); 2]);
    let context = TransformContext::new(vec![0, 1]).with_source("memory.pdf");
    let pipeline = TransformPipeline::new(vec![
        TransformStep::new(rotate(0)),
        TransformStep::new(Transform::Rotate(RotateConfig::new(RotateAngle::Auto))),
    ]);

    let err = match pipeline.apply(all_pages(&doc), &context).unwrap_err() {
        MillError::Transform(err) => err,
        other => panic!("expected a transform error, got {other:?}"),
    };
    assert!(matches!(err, TransformError::Step { step: 2, .. }));
    assert_eq!(err.page(), Some(0));
}

#[test]
fn test_combine_batches() {
    let doc = source(&[(612.0, 792.0); 5]);
    let config = CombineConfig {
        page_size: [Coordinate::from("11in"), Coordinate::from("8.5in")],
        layout: vec![
            LayoutItem::new(0, [pt(0.0), pt(0.0)], 1.0),
            LayoutItem::new(1, [Coordinate::from("5.5in"), pt(0.0)], 1.0),
        ],
        pages_per_output: 2,
    };
    let pages = run(vec![Transform::Combine(config)], all_pages(&doc)).unwrap();

    assert_eq!(pages.len(), 3);
    for page in &pages {
        assert_eq!(page.dimensions(), (792.0, 612.0));
    }
    let layer_counts: Vec<usize> = pages.iter().map(|p| p.layers().len()).collect();
    assert_eq!(layer_counts, vec![2, 2, 1]);
}

#[test]
fn test_split_makes_independent_pages() {
    let doc = source(&[(612.0, 792.0); 3]);
    let config = SplitConfig {
        regions: vec![crop(0.0, 396.0, 612.0, 792.0), crop(0.0, 0.0, 306.0, 396.0)],
    };
    let mut pages = run(vec![Transform::Split(config)], all_pages(&doc)).unwrap();
    assert_eq!(pages.len(), 6);
    for pair in pages.chunks(2) {
        assert_eq!(pair[0].dimensions(), (612.0, 396.0));
        assert_eq!(pair[1].dimensions(), (306.0, 396.0));
    }

    // Changing one half leaves its sibling alone
    let first = pages.remove(0);
    let cropped = crop_page(first, pdf_mill::Rect::from_size(50.0, 50.0));
    assert_eq!(cropped.dimensions(), (50.0, 50.0));
    assert_eq!(pages[0].dimensions(), (306.0, 396.0));
    assert_eq!(pages[0].layers().len(), 1);
}

#[test]
fn test_stamp_adds_text_layer() {
    let doc = source(&[(612.0, 792.0); 2]);
    let mut config = StampConfig::new("Page {page} of {total} - {date}");
    config.position = StampPosition::TopLeft;

    let timestamp = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 5, 0)
        .unwrap();
    let context = TransformContext::new(vec![0, 1]).with_timestamp(timestamp);
    let pipeline = TransformPipeline::new(vec![TransformStep::new(Transform::Stamp(config))]);
    let pages = pipeline.apply(all_pages(&doc), &context).unwrap();

    let texts: Vec<String> = pages
        .iter()
        .map(|page| match &page.layers().last().unwrap().content {
            LayerContent::Text(run) => {
                assert!(close(run.x, 10.0));
                assert!(close(run.y, 792.0 - 10.0 - 10.0));
                run.text.clone()
            }
            other => panic!("expected text, got {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["Page 1 of 2 - 2024-03-09", "Page 2 of 2 - 2024-03-09"]);
}

#[test]
fn test_stamp_rejects_bad_styles() {
    let mut config = StampConfig::new("x");
    config.font_color = "chartreusey".to_string();
    assert!(matches!(
        Transform::Stamp(config.clone()).validate(),
        Err(TransformError::InvalidColor(_))
    ));

    config.font_color = "#00ff00".to_string();
    config.opacity = 1.5;
    assert!(Transform::Stamp(config).validate().is_err());
}

#[test]
fn test_render_replaces_content_with_image() {
    let doc = source(&[(144.0, 72.0)]);
    let capabilities =
        Capabilities::default().with_rasterizer(Arc::new(SolidRasterizer::new([200, 0, 0])));
    let pipeline = TransformPipeline::new(vec![TransformStep::new(Transform::Render(RenderConfig {
        dpi: 72,
    }))])
    .with_capabilities(capabilities);

    let pages = pipeline.apply(all_pages(&doc), &TransformContext::new(vec![0])).unwrap();
    assert_eq!(pages[0].dimensions(), (144.0, 72.0));
    assert_eq!(pages[0].layers().len(), 1);
    match &pages[0].layers()[0].content {
        LayerContent::Image(image) => assert_eq!((image.width_px, image.height_px), (144, 72)),
        other => panic!("expected image, got {other:?}"),
    }
}

#[test]
fn test_render_without_rasterizer_fails() {
    let doc = source(&[(144.0, 72.0)]);
    let err = run(vec![Transform::Render(RenderConfig { dpi: 72 })], all_pages(&doc)).unwrap_err();
    assert!(matches!(err, MillError::Transform(TransformError::Step { step: 1, .. })));
}

#[test]
fn test_invalid_parameters_are_reported() {
    assert!(matches!(
        Transform::Crop(crop(100.0, 0.0, 50.0, 50.0)).validate(),
        Err(TransformError::InvalidCrop { .. })
    ));
    assert!(matches!(
        Transform::Resize(ResizeConfig::new("4 furlongs", "6in", FitMode::Contain)).validate(),
        Err(TransformError::InvalidDimension { .. })
    ));
    assert!(Transform::Split(SplitConfig { regions: vec![] }).validate().is_err());
    assert!(matches!(QuarterTurn::from_degrees(45), Err(TransformError::UnsupportedAngle(45))));
}

#[test]
fn test_transformed_pages_write_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let doc = source(&[(612.0, 792.0); 2]);
    let steps = vec![
        rotate(90),
        Transform::Stamp(StampConfig::new("{page}")),
        Transform::Crop(crop(0.0, 0.0, 400.0, 300.0)),
    ];
    let pages = run(steps, all_pages(&doc)).unwrap();

    let mut written = write_pages(&pages).unwrap();
    let path = dir.path().join("out.pdf");
    written.save(&path).unwrap();

    assert_eq!(page_count(&path), 2);
    assert_eq!(page_sizes(&path), vec![(400.0, 300.0); 2]);
}
