use deckscript_core::prelude::*;
use deckscript_core::PLACEHOLDER_TEXT;
use deckscript_dispatch::{Element, ShapeKind};
use deckscript_test_utils::{
    element_kinds, records_for, BENIGN, CARD_GRID, CHART_SLIDE, COUNTED_LOOP, MALICIOUS, TABLE_SLIDE,
    TITLE_SLIDE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn pipeline(choice: ValidatorChoice) -> Pipeline {
    Pipeline::new(DeckScriptConfig::new().with_validator(choice)).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_counted_loop_emits_one_shape_per_iteration() {
    let snippet = r#"let n = 3; for (let i = 0; i < n; i++) { slide.addShape("rect", {x:i, y:0, w:1, h:1}); }"#;
    let mut builder = RecordingBuilder::new();
    let report = pipeline(ValidatorChoice::Auto)
        .render(snippet, &mut builder)
        .await
        .unwrap();

    assert_eq!(report.records_extracted, 3);
    assert_eq!(report.dispatched, 3);
    let xs: Vec<Option<f64>> = builder.deck().slides[0]
        .elements
        .iter()
        .map(|e| match e {
            Element::Shape { kind, options } => {
                assert_eq!(*kind, ShapeKind::Rect);
                options.geometry.x
            }
            other => panic!("expected shape, got {other:?}"),
        })
        .collect();
    assert_eq!(xs, vec![Some(0.0), Some(1.0), Some(2.0)]);
}

#[tokio::test]
async fn test_disallowed_call_rejected_before_extraction() {
    let snippet = "const out = pptx;\nslide.addText(\"kept?\", {x: 1, y: 1});\nout[\"writeFile\"]({fileName: \"deck.pptx\"});";
    for choice in [ValidatorChoice::Auto, ValidatorChoice::Pattern] {
        let pipeline = pipeline(choice);
        assert!(matches!(pipeline.extract(snippet), Err(RenderError::Rejected(_))));

        let mut builder = RecordingBuilder::new();
        let err = pipeline.render(snippet, &mut builder).await.unwrap_err();
        assert!(matches!(err, RenderError::Rejected(ref v) if !v.passed));
        assert_eq!(builder.slide_count(), 0);
    }
}

#[tokio::test]
async fn test_malicious_corpus_draws_placeholder_only() {
    let pipeline = pipeline(ValidatorChoice::Auto);
    for snippet in MALICIOUS {
        let with_content = format!("slide.addText(\"x\", {{}});\n{snippet}");
        let mut builder = RecordingBuilder::new();
        let report = pipeline.render_or_placeholder(&with_content, &mut builder).await;

        assert!(report.placeholder, "accepted: {snippet}");
        assert_eq!(report.dispatched, 0);
        assert_eq!(element_kinds(builder.deck()), vec![vec!["text"]]);
        match &builder.deck().slides[0].elements[0] {
            Element::Text { runs, .. } => assert_eq!(runs[0].text, PLACEHOLDER_TEXT),
            other => panic!("expected placeholder text, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_fixture_decks_render() {
    let pipeline = pipeline(ValidatorChoice::Auto);
    let cases: [(&str, Vec<Vec<&str>>); 4] = [
        (TITLE_SLIDE, vec![vec!["text", "text"]]),
        (
            CARD_GRID,
            vec![vec!["shape", "text", "shape", "text", "shape", "text"]],
        ),
        (TABLE_SLIDE, vec![vec!["table"]]),
        (CHART_SLIDE, vec![vec!["chart"]]),
    ];
    for (snippet, expected) in cases {
        let mut builder = RecordingBuilder::new();
        let report = pipeline.render(snippet, &mut builder).await.unwrap();
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert_eq!(report.records_extracted, records_for(snippet).len());
        assert_eq!(report.auto_created_slides, 0);
        assert_eq!(element_kinds(builder.deck()), expected);
    }
}

#[tokio::test]
async fn test_card_grid_accumulates_offsets() {
    let mut builder = RecordingBuilder::new();
    pipeline(ValidatorChoice::Pattern)
        .render(CARD_GRID, &mut builder)
        .await
        .unwrap();

    let shapes: Vec<(Option<f64>, Option<&str>)> = builder.deck().slides[0]
        .elements
        .iter()
        .filter_map(|e| match e {
            Element::Shape { options, .. } => Some((options.geometry.x, options.fill.as_deref())),
            _ => None,
        })
        .collect();
    assert_eq!(shapes.len(), 3);
    assert_eq!(shapes[0].1, Some("22C55E"));
    assert_eq!(shapes[2].1, Some("F97316"));
    let x2 = shapes[2].0.unwrap();
    assert!((x2 - 6.7).abs() < 1e-9, "x = {x2}");
}

#[tokio::test]
async fn test_boilerplate_lines_are_tolerated() {
    let snippet = format!("import pptxgen from \"pptxgenjs\";\nconst pptx = new PptxGenJS();\n{TITLE_SLIDE}\n");
    let mut builder = RecordingBuilder::new();
    let report = pipeline(ValidatorChoice::Auto)
        .render(&snippet, &mut builder)
        .await
        .unwrap();
    assert!(report.verdict.passed);
    assert_eq!(report.dispatched, 3);
}

#[tokio::test]
async fn test_trailing_write_call_rejects_whole_snippet() {
    let snippet = format!(
        "import pptxgen from \"pptxgenjs\";\nconst pptx = new PptxGenJS();\n{TITLE_SLIDE}\npptx.writeFile({{fileName: \"q3.pptx\"}});\n"
    );
    for choice in [ValidatorChoice::Auto, ValidatorChoice::Pattern] {
        let mut builder = RecordingBuilder::new();
        let err = pipeline(choice).render(&snippet, &mut builder).await.unwrap_err();
        assert!(matches!(err, RenderError::Rejected(ref v) if !v.passed));
        assert_eq!(builder.slide_count(), 0);
    }
}

#[tokio::test]
async fn test_self_growing_loops_render_within_budgets() {
    let snippet = "let s = 'ab'; let k = 0;\n\
                   for (let i = 0; i < 40; i++) { s += s; }\n\
                   for (let a = 0; a < 100; a++) { for (let b = 0; b < 100; b++) {\n\
                   for (let c = 0; c < 100; c++) { k = k + 1; } } }\n\
                   slide.addText(`${s.length}:${k}`, {x: 0, y: 0});";
    let mut builder = RecordingBuilder::new();
    let report = pipeline(ValidatorChoice::Auto)
        .render(snippet, &mut builder)
        .await
        .unwrap();

    assert_eq!(report.dispatched, 1);
    assert!(report.skipped_statements > 0);
    match &builder.deck().slides[0].elements[0] {
        // 40 doubling passes and one outer pass leave 98 full middle passes plus 60
        Element::Text { runs, .. } => assert_eq!(runs[0].text, "262144:9860"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unbound_receiver_gets_implicit_slide() {
    let mut builder = RecordingBuilder::new();
    let report = pipeline(ValidatorChoice::Auto)
        .render(COUNTED_LOOP, &mut builder)
        .await
        .unwrap();
    assert_eq!(report.auto_created_slides, 1);
    assert_eq!(element_kinds(builder.deck()), vec![vec!["shape"; 3]]);
}

#[test]
fn test_validator_override_from_toml() {
    let config = DeckScriptConfig::from_toml_str("validator = \"pattern\"").unwrap();
    let pipeline = Pipeline::new(config).unwrap();
    let (_, verdict) = pipeline.screen(TITLE_SLIDE).unwrap();
    assert_eq!(verdict.strategy, deckscript_safety::Strategy::Pattern);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_render_never_panics(snippet in "[ -~\n]{0,200}") {
        let pipeline = pipeline(ValidatorChoice::Pattern);
        let mut builder = RecordingBuilder::new();
        let report = runtime().block_on(pipeline.render_or_placeholder(&snippet, &mut builder));
        prop_assert!(report.placeholder || report.verdict.passed);
    }

    #[test]
    fn prop_rejected_snippet_leaves_builder_empty(
        prefix in proptest::sample::select(BENIGN.to_vec()),
        attack in proptest::sample::select(MALICIOUS.to_vec()),
    ) {
        let pipeline = pipeline(ValidatorChoice::Pattern);
        let mut builder = RecordingBuilder::new();
        let snippet = format!("{prefix}\n{attack}");
        let result = runtime().block_on(pipeline.render(&snippet, &mut builder));
        prop_assert!(result.is_err());
        prop_assert_eq!(builder.slide_count(), 0);
    }
}
