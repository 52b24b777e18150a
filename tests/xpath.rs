//! XPath behavior through the public surface.

use pretty_assertions::assert_eq;
use xylem::{evaluate, xpath, Document};

#[test]
fn union_returns_document_order_not_expression_order() {
    let doc = Document::parse_str("<r><a/><b/><c/></r>").unwrap();
    let set = xpath(&doc, "//c | //a").unwrap();
    let names: Vec<&str> = set.iter().map(|&n| doc.name(n).unwrap()).collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn last_selects_the_third_x() {
    let doc = Document::parse_str("<r><x/><x/><x i=\"last\"/></r>").unwrap();
    let set = xpath(&doc, "//x[last()]").unwrap();
    assert_eq!(set.len(), 1);
    assert!(doc.attribute(*set.first().unwrap(), "i").is_some());
}

#[test]
fn every_result_set_is_strictly_increasing_in_position() {
    let doc = Document::parse_str(
        "<library><shelf><book id=\"1\"/><book id=\"2\"/></shelf>\
         <shelf><book id=\"3\"/></shelf></library>",
    )
    .unwrap();
    for expr in ["//book", "//shelf | //book", "//book/.. | //book", "//*"] {
        let set = xpath(&doc, expr).unwrap();
        let positions: Vec<u32> = set.iter().map(|&n| doc.position(n)).collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1], "{expr} broke document order");
        }
    }
}

#[test]
fn context_independent_predicates_filter_uniformly_at_any_depth() {
    let doc = Document::parse_str(
        "<r><flag/><a><k/><a><k/></a></a></r>",
    )
    .unwrap();
    // the predicate never reads its context, so it keeps everything at
    // every depth, or nothing at all
    assert_eq!(xpath(&doc, "//k[//flag]").unwrap().len(), 2);
    assert_eq!(xpath(&doc, "/r/a/k[//flag]").unwrap().len(), 1);
    assert_eq!(xpath(&doc, "//k[//missing]").unwrap().len(), 0);
    assert_eq!(xpath(&doc, "/r/a/k[//missing]").unwrap().len(), 0);
}

#[test]
fn xpath_and_query_surfaces_agree() {
    let doc = Document::parse_str(
        "<bar><ball>A</ball><ball a=\"abcd\">B</ball></bar>",
    )
    .unwrap();
    let via_xpath = xpath(&doc, "//ball[@a]").unwrap();
    let via_query = xylem::find(&doc, doc.root(), "<ball>/@a/").unwrap().unwrap();
    assert_eq!(*via_xpath.first().unwrap(), via_query);
}

#[test]
fn nested_comment_parses_to_a_whitespace_gap() {
    let doc = Document::parse_str("<r><a/></r>").unwrap();
    let set = xpath(&doc, "//a (: outer (: inner :) still outer :)").unwrap();
    assert_eq!(set.len(), 1);
}

#[test]
fn typed_results_come_back_through_evaluate() {
    let doc = Document::parse_str("<r><n>2</n><n>3</n></r>").unwrap();
    assert!(matches!(
        evaluate(&doc, "//n").unwrap(),
        xylem::Value::NodeSet(_)
    ));
    assert!(matches!(
        evaluate(&doc, "sum(//n)").unwrap(),
        xylem::Value::Number(n) if n == 5.0
    ));
    assert!(matches!(
        evaluate(&doc, "concat('a', 'b')").unwrap(),
        xylem::Value::String(s) if s == "ab"
    ));
    assert!(matches!(
        evaluate(&doc, "count(//n) > 1").unwrap(),
        xylem::Value::Boolean(true)
    ));
}

#[test]
fn non_nodeset_results_select_nothing() {
    let doc = Document::parse_str("<r/>").unwrap();
    assert!(xpath(&doc, "1 + 1").unwrap().is_empty());
    assert!(xpath(&doc, "'str'").unwrap().is_empty());
}

#[test]
fn diagnostics_carry_position_information() {
    let doc = Document::parse_str("<r/>").unwrap();
    let err = xpath(&doc, "//r[blorb()]").unwrap_err();
    match err {
        xylem::XPathError::UnknownFunction { name, line, .. } => {
            assert_eq!(name, "blorb");
            assert_eq!(line, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    let err = xpath(&doc, "concat('only-one')").unwrap_err();
    assert!(matches!(err, xylem::XPathError::WrongArity { .. }));
}

#[test]
fn division_errors_echo_the_expression() {
    let doc = Document::parse_str("<r/>").unwrap();
    let err = evaluate(&doc, "10 div 0").unwrap_err();
    match err {
        xylem::XPathError::Eval { expr, .. } => assert_eq!(expr, "10 div 0"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn wildcard_and_prefix_tests_respect_namespaces() {
    let doc = Document::parse_str(
        "<r xmlns:s=\"svg\" xmlns:h=\"html\"><s:rect/><h:div/><rect/></r>",
    )
    .unwrap();
    assert_eq!(xpath(&doc, "//s:*").unwrap().len(), 1);
    assert_eq!(xpath(&doc, "//*:rect").unwrap().len(), 2);
    assert_eq!(xpath(&doc, "//s:rect").unwrap().len(), 1);
    assert_eq!(xpath(&doc, "//rect").unwrap().len(), 1);
}
