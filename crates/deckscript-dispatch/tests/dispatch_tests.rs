use deckscript_dispatch::prelude::*;
use deckscript_dispatch::{
    normalize_color, presentation_constants, Element, IconTinter, StaticAssetFetcher,
};
use deckscript_interp::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

fn extract(src: &str) -> Vec<CallRecord> {
    let mut env = Environment::new();
    env.declare("pptx", presentation_constants());
    Extractor::default().extract(src, env).records
}

#[tokio::test]
async fn test_backend_called_once_per_call_in_order() {
    let records = extract(
        r##"
        const s = pptx.addSlide({background: {color: "#0f172a"}});
        s.addText("Title", {x: 0.5, y: 0.4, w: 9, h: 1, fontSize: 32, color: "fff"});
        s.addShape(pptx.ShapeType.roundRect, {x: 0.5, y: 1.6, w: 4, h: 3, fill: {color: "rgb(30, 41, 59)"}});
        s.addTable([["A", "B"], [1, 2]], {x: 5, y: 1.6, w: 4});
        s.addChart(pptx.charts.PIE, [{name: "Mix", labels: ["x", "y"], values: [60, 40]}], {x: 5, y: 3.5, w: 4, h: 2});
        "##,
    );
    assert_eq!(records.len(), 5);

    let mut builder = RecordingBuilder::new();
    let report = Dispatcher::default().dispatch_all(&records, &mut builder).await;
    assert_eq!(report.dispatched, 5);
    assert!(report.diagnostics.is_empty());

    let deck = builder.into_deck();
    assert_eq!(deck.slides.len(), 1);
    assert_eq!(deck.slides[0].options.background.as_deref(), Some("0F172A"));
    let kinds: Vec<&str> = deck.slides[0]
        .elements
        .iter()
        .map(|e| match e {
            Element::Text { .. } => "text",
            Element::Shape { .. } => "shape",
            Element::Image { .. } => "image",
            Element::Table { .. } => "table",
            Element::Chart { .. } => "chart",
        })
        .collect();
    assert_eq!(kinds, vec!["text", "shape", "table", "chart"]);

    match &deck.slides[0].elements[1] {
        Element::Shape { options, .. } => assert_eq!(options.fill.as_deref(), Some("1E293B")),
        other => panic!("expected shape, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_call_does_not_discard_slide() {
    let records = extract(
        r#"
        slide.addShape("rect", {x: 1, y: 1, w: 2, h: 1});
        slide.addChart("bar", [{name: "A", labels: ["q1", "q2"], values: [1]}], {});
        slide.addShape("hexagon", {x: 4, y: 1, w: 2, h: 1});
        "#,
    );
    let mut builder = RecordingBuilder::new();
    let report = Dispatcher::default().dispatch_all(&records, &mut builder).await;

    assert_eq!(report.dispatched, 2);
    assert_eq!(report.auto_created_slides, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(builder.element_count(), 2);
}

#[tokio::test]
async fn test_tinted_icon_becomes_data_uri() {
    let icon = "chrome-extension://deckscript/icons/check.svg";
    let tinter = IconTinter::new(
        Arc::new(StaticAssetFetcher::new().with_asset(icon, "<svg><path d=\"M0 0\"/></svg>")),
        "chrome-extension://",
    );
    let dispatcher = Dispatcher::default().with_tinter(tinter);
    let records = extract(
        r#"slide.addImage({path: chrome.runtime.getURL("icons/check.svg?color=22C55E"), x: 1, y: 1, w: 0.5, h: 0.5});"#,
    );

    let mut builder = RecordingBuilder::new();
    let report = dispatcher.dispatch_all(&records, &mut builder).await;
    assert_eq!(report.dispatched, 1, "{:?}", report.diagnostics);

    match &builder.deck().slides[0].elements[0] {
        Element::Image { options } => match &options.source {
            deckscript_dispatch::model::ImageSource::Data(uri) => {
                assert!(uri.starts_with("data:image/svg+xml;base64,"));
            }
            other => panic!("expected data URI, got {other:?}"),
        },
        other => panic!("expected image, got {other:?}"),
    }
}

#[test]
fn test_shorthand_forms_agree() {
    let expected = normalize_color("rgb(255,255,255)");
    assert_eq!(expected.as_deref(), Some("FFFFFF"));
    assert_eq!(normalize_color("#fff"), expected);
    assert_eq!(normalize_color("fff"), expected);
}

proptest! {
    #[test]
    fn prop_color_normalization_idempotent(hex in "[0-9a-fA-F]{6}") {
        let once = normalize_color(&hex).unwrap();
        prop_assert_eq!(normalize_color(&once), Some(once.clone()));
        prop_assert_eq!(normalize_color(&format!("#{hex}")), Some(once));
    }

    #[test]
    fn prop_rgb_matches_hex(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
        let from_rgb = normalize_color(&format!("rgb({r}, {g}, {b})"));
        prop_assert_eq!(from_rgb, Some(format!("{r:02X}{g:02X}{b:02X}")));
    }
}
