use deckscript_interp::prelude::*;
use deckscript_interp::{scanner, BaseUrlResolver};
use proptest::prelude::*;
use std::sync::Arc;

const VALUE_BUDGET: usize = 256 * 1024;

/// Statements that grow a binding on every pass
const GROWTH_STATEMENTS: &[&str] = &[
    "s += s;",
    "t = `${t}${t}`;",
    "a = [...a, ...a];",
    "rows.push(rows);",
    "k = k + 1;",
    "o = {...o, [`k${k}`]: s};",
    "slide.addText(s, {x: k});",
];

/// Up to four nested counted loops around a body drawn from [`GROWTH_STATEMENTS`]
fn nested_loops() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(0usize..400, 1..=4),
        proptest::collection::vec(proptest::sample::select(GROWTH_STATEMENTS), 1..6),
    )
        .prop_map(|(bounds, body)| {
            let mut src = String::from(
                "let s = 'ab'; let t = 'cd'; let a = [1]; const rows = ['r']; let k = 0; let o = {};\n",
            );
            for (depth, bound) in bounds.iter().enumerate() {
                src.push_str(&format!("for (let i{depth} = 0; i{depth} < {bound}; i{depth}++) {{ "));
            }
            src.push_str(&body.concat());
            src.push_str(&" }".repeat(bounds.len()));
            src
        })
}

fn extract(src: &str) -> Extraction {
    Extractor::default().extract(src, Environment::new())
}

fn shape_x(record: &CallRecord) -> f64 {
    let options = Evaluator::default()
        .evaluate(&record.args()[1], record.env())
        .expect("options evaluate");
    options
        .as_object()
        .and_then(|o| o.get("x"))
        .and_then(Value::as_number)
        .expect("numeric x")
}

#[test]
fn test_counted_loop_scenario() {
    let src = r#"let n = 3; for (let i = 0; i < n; i++) { slide.addShape("rect", {x:i, y:0, w:1, h:1}); }"#;
    let out = extract(src);

    assert_eq!(out.records.len(), 3);
    assert!(out.records.iter().all(|r| r.operation() == Operation::AddShape));
    let xs: Vec<f64> = out.records.iter().map(shape_x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);
}

#[test]
fn test_argument_split_scenario() {
    let args = scanner::split_top_level(r#"a, "b,c", [1,2]"#, b',').unwrap();
    assert_eq!(args.len(), 3);

    let out = extract(r#"slide.addText(a, "b,c", [1,2]);"#);
    assert_eq!(out.records[0].args().len(), 3);
}

#[test]
fn test_records_equal_iterations_times_calls() {
    let src = r#"
        const items = ["a", "b", "c", "d"];
        for (const item of items) {
            slide.addText(item, {x: 0.5, y: 1});
            slide.addShape("line", {x: 0.5, y: 1.5, w: 9, h: 0});
        }
    "#;
    assert_eq!(extract(src).records.len(), 4 * 2);

    // iterations run = min(length, cap)
    let extractor = Extractor::new(
        Evaluator::default(),
        ExtractOptions {
            max_loop_iterations: 3,
            ..ExtractOptions::default()
        },
    );
    let out = extractor.extract(src, Environment::new());
    assert_eq!(out.records.len(), 3 * 2);
}

#[test]
fn test_snapshots_see_accumulated_state() {
    let src = r#"
        const cards = [{title: "Speed"}, {title: "Scale"}, {title: "Safety"}];
        let x = 0.5;
        cards.forEach((card, i) => {
            slide.addShape("roundRect", {x: x, y: 1.2, w: 2.8, h: 3});
            x += 3;
        });
        slide.addText("Total: " + cards.length, {x: x, y: 4.8});
    "#;
    let out = extract(src);

    assert_eq!(out.records.len(), 4);
    let xs: Vec<f64> = out.records.iter().map(shape_x).collect();
    assert_eq!(xs, vec![0.5, 3.5, 6.5, 9.5]);
    assert!(!out.environment.contains("card"));
}

#[test]
fn test_slide_bindings_recorded() {
    let src = r#"
        const s1 = pptx.addSlide();
        s1.addText("One", {x: 1, y: 1});
        let s2 = pptx.addSlide({background: {color: "F1F5F9"}});
        s2.addText("Two", {x: 1, y: 1});
    "#;
    let out = extract(src);

    let bindings: Vec<_> = out.records.iter().map(CallRecord::binding).collect();
    assert_eq!(bindings, vec![Some("s1"), None, Some("s2"), None]);
    let receivers: Vec<_> = out.records.iter().map(CallRecord::receiver).collect();
    assert_eq!(receivers, vec!["pptx", "s1", "pptx", "s2"]);
}

#[test]
fn test_layout_helpers_through_extraction() {
    let src = r#"
        const boxW = 2;
        for (let i = 0; i < 3; i++) {
            slide.addShape("rect", {x: spaceEvenly(i, 3, boxW), y: centerY(1), w: boxW, h: 1});
        }
    "#;
    let xs: Vec<f64> = extract(src).records.iter().map(shape_x).collect();
    assert_eq!(xs, vec![1.0, 4.0, 7.0]);
}

#[test]
fn test_malformed_statements_do_not_abort() {
    let src = r#"
        const broken = {x: 1;
        slide.addText("still here", {x: 1, y: 1});
    "#;
    let out = extract(src);
    assert_eq!(out.records.len(), 1);
    assert!(!out.skipped.is_empty());
}

#[test]
fn test_self_doubling_string_stops_at_value_budget() {
    let src = "let s = 'ab'; for (let i = 0; i < 40; i++) { s += s; } slide.addText(s, {x:0});";
    let out = extract(src);

    assert_eq!(out.records.len(), 1);
    let s = out.environment.get("s").and_then(Value::as_str).expect("s stays a string");
    assert_eq!(s.len(), VALUE_BUDGET);
    assert!(out.skipped.iter().any(|skip| skip.reason.contains("budget")));
}

#[test]
fn test_template_and_spread_growth_stop_at_value_budget() {
    let out = extract(
        "let t = 'ab'; let a = [1];\n\
         for (let i = 0; i < 40; i++) { t = `${t}${t}`; a = [...a, ...a]; }",
    );

    let t = out.environment.get("t").and_then(Value::as_str).expect("t stays a string");
    assert_eq!(t.len(), VALUE_BUDGET);
    let a = out.environment.get("a").expect("a bound");
    assert!(a.as_array().is_some_and(|items| items.len() > 1));
    assert!(a.footprint() <= VALUE_BUDGET);
    assert!(!out.skipped.is_empty());
}

#[test]
fn test_self_push_stops_at_value_budget() {
    let out = extract("const rows = ['0123456789']; for (let i = 0; i < 40; i++) { rows.push(rows); }");

    let rows = out.environment.get("rows").expect("rows bound");
    assert!(rows.footprint() <= VALUE_BUDGET);
    assert!(out.skipped.iter().any(|skip| skip.reason.starts_with("`rows.push`")));
}

#[test]
fn test_nested_loops_share_one_iteration_budget() {
    let src = "let k = 0;\n\
               for (let a = 0; a < 100; a++) { for (let b = 0; b < 100; b++) {\n\
               for (let c = 0; c < 100; c++) { k = k + 1; } } }";
    let out = extract(src);

    // One outer pass plus 99 middle passes of 101 iterations each use all 10000
    assert_eq!(out.environment.get("k"), Some(&Value::Number(9900.0)));
    assert_eq!(out.skipped.len(), 2);
    assert!(out
        .skipped
        .iter()
        .all(|skip| skip.reason == "iteration budget of 10000 exhausted"));
}

#[test]
fn test_four_deep_loops_stay_bounded() {
    let src = "let k = 0;\n\
               for (let a = 0; a < 100; a++) { for (let b = 0; b < 100; b++) {\n\
               for (let c = 0; c < 100; c++) { for (let d = 0; d < 100; d++) { k = k + 1; } } } }";
    let out = extract(src);

    let k = out.environment.get("k").and_then(Value::as_number).expect("k numeric");
    assert!(k > 0.0 && k < 10_000.0);
    assert!(!out.skipped.is_empty());
}

proptest! {
    #[test]
    fn prop_evaluator_never_panics(text in r#"[a-z0-9 +*/%()\[\]{}'"`$.,:?!<>=&|-]{0,48}"#) {
        let mut env = Environment::new();
        env.declare("a", Value::Number(1.0));
        let _ = Evaluator::default().evaluate(&text, &env);
    }

    #[test]
    fn prop_extractor_never_panics(text in r#"[a-z0-9 ;\n+*/()\[\]{}'"`$.,:?!<>=_-]{0,96}"#) {
        let _ = extract(&text);
    }

    #[test]
    fn prop_split_pieces_are_trimmed(parts in proptest::collection::vec("[a-z0-9]{1,6}", 1..6)) {
        let joined = parts.join(" , ");
        let pieces = scanner::split_top_level(&joined, b',').unwrap();
        prop_assert_eq!(pieces, parts.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_counted_loop_emits_min_of_bound_and_cap(n in 0usize..250) {
        let src = format!("for (let i = 0; i < {n}; i++) {{ slide.addText('t', {{}}); }}");
        prop_assert_eq!(extract(&src).records.len(), n.min(100));
    }

    #[test]
    fn prop_nested_growth_stays_within_budgets(src in nested_loops()) {
        let extractor = Extractor::new(
            Evaluator::new(
                EvalOptions { max_value_bytes: 2048, ..EvalOptions::default() },
                Arc::new(BaseUrlResolver::default()),
            ),
            ExtractOptions { max_total_iterations: 300, ..ExtractOptions::default() },
        );
        let out = extractor.extract(&src, Environment::new());

        prop_assert!(out.records.len() <= 300);
        for (name, value) in out.environment.iter() {
            prop_assert!(value.footprint() <= 2048, "{} grew to {} bytes", name, value.footprint());
        }
    }
}
