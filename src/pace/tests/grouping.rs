use super::*;
use crate::pace::ast::Style;
use crate::pace::group::{GroupKind, TupleShape};
use crate::pace::input_source::ErrorKind;
use crate::pace::PaceOptions;

fn check_tuple(source: &str, shape: TupleShape, rendered: &str) {
    Tester::new(format!("tuple {}", source))
        .with_source(source)
        .group()
        .expect_ok()
        .assert_num_phrases(1)
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_kind(GroupKind::TupleOrParen)
                    .assert_shape(shape)
                    .assert_render(rendered)
                    .assert_stable_render();
            });
        });
}

#[test]
fn test_tuple_shapes() {
    check_tuple("()", TupleShape::Null, "()");
    check_tuple("(a)", TupleShape::Paren, "(a)");
    check_tuple("(a, b, c)", TupleShape::Tuple, "(a, b, c)");
    check_tuple("(,a,b)", TupleShape::Partial(1), "(, a, b)");
    check_tuple("(,,a)", TupleShape::Partial(2), "(, , a)");
    check_tuple("(a,)", TupleShape::Partial(1), "(a,)");
    check_tuple("(;a,b)", TupleShape::Grid, "(;a, b)");
    check_tuple("(1, 2; 3, 4)", TupleShape::Grid, "(1, 2; 3, 4)");
}

#[test]
fn test_braces_blocks_and_frames() {
    Tester::new("struct")
        .with_source("{a: 1, b: 2}")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_kind(GroupKind::FuncOrStruct).assert_struct(2).assert_render("{a: 1, b: 2}");
            });
        });

    Tester::new("single field struct")
        .with_source("{a: 1,}")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_struct(1).assert_render("{a: 1,}").assert_stable_render();
            });
        });

    Tester::new("function with implicit parameters")
        .with_source("{x + 1}")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_function(None).assert_render("{x + 1}");
            });
        });

    Tester::new("function with declared parameters")
        .with_source("{[a <:int>, b] <:int> a}")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_function(Some(Style::Binary)).assert_render("{[a <:int>, b] <:int> a}");
            });
        });

    Tester::new("doubled braces")
        .with_source("{{x}}")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_function(None).assert_render("{{x}}");
            });
        });

    Tester::new("block")
        .with_source("[a. b]")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_kind(GroupKind::Block).assert_render("[a. b]");
            });
        });

    Tester::new("frame")
        .with_source("([a, b] 1, 2; 3, 4)")
        .group()
        .expect_ok()
        .for_phrase(0, |p| {
            p.for_group(0, |g| {
                g.assert_kind(GroupKind::Frame).assert_render("([a, b] 1, 2; 3, 4)");
            });
        });
}

#[test]
fn test_keyword_call_rewrite() {
    Tester::new("two keywords")
        .with_source("(1 < 2) ifTrue: 10 ifFalse: 20")
        .group()
        .expect_ok()
        .assert_render("ifTrue:ifFalse: ((1 < 2), 10, 20)")
        .for_phrase(0, |p| {
            p.assert_num_items(2).for_group(1, |g| {
                g.assert_shape(TupleShape::Tuple);
            });
        });

    Tester::new("assignment is not part of the receiver")
        .with_source("r: (x) ifTrue: 1")
        .group()
        .expect_ok()
        .assert_render("r: ifTrue: ((x), 1)");

    Tester::new("keyword on an indented line")
        .with_source("
            r: (x) ifTrue: 1
                ifFalse: 2
            s: 3
        ")
        .group()
        .expect_ok()
        .assert_num_phrases(2)
        .assert_render("r: ifTrue:ifFalse: ((x), 1, 2)\ns: 3");

    Tester::new("keyword ends at a dot")
        .with_source("a: x ifTrue: 1. b: 2")
        .group()
        .expect_ok()
        .assert_num_phrases(2)
        .assert_render("a: ifTrue: (x, 1)\nb: 2");
}

#[test]
fn test_phrase_separation() {
    Tester::new("dots and line breaks")
        .with_source("
            a. b
            c
        ")
        .group()
        .expect_ok()
        .assert_num_phrases(3);

    Tester::new("indented continuation")
        .with_source("
            x: 1 +
                2
            y: 3
        ")
        .group()
        .expect_ok()
        .assert_num_phrases(2)
        .assert_render("x: 1 + 2\ny: 3");

    Tester::new("function body on its own lines")
        .with_source("
            f: {[n]
                m: n * 10.
                m}
            f(1)
        ")
        .group()
        .expect_ok()
        .assert_num_phrases(2)
        .for_phrase(0, |p| {
            p.for_group(1, |g| {
                g.assert_function(Some(Style::Unary)).assert_render("{[n] m: n * 10. m}");
            });
        });
}

#[test]
fn test_bracket_errors() {
    Tester::new("mismatched closer")
        .with_source("x: (1, 2]")
        .group()
        .expect_err()
        .assert_kind(ErrorKind::Grouping)
        .assert_num(2)
        .assert_msg_has(0, "expected ')' to close the tuple or parenthesis, found ']'")
        .assert_occurs_at(0, "]")
        .assert_msg_has(1, "was opened here with '('")
        .assert_occurs_at(1, "(");

    Tester::new("never closed")
        .with_source("x: {a: 1")
        .group()
        .expect_err()
        .assert_kind(ErrorKind::Grouping)
        .assert_msg_has(0, "is never closed")
        .assert_occurs_at(0, "{");

    Tester::new("closer without opener")
        .with_source("a )")
        .group()
        .expect_err()
        .assert_msg_has(0, "unexpected ')' without a matching opener")
        .assert_occurs_at(0, ")");

    Tester::new("nested too deeply")
        .with_source("((((1))))")
        .with_options(PaceOptions::default().with_max_depth(3))
        .group()
        .expect_err()
        .assert_msg_has(0, "groups are nested too deeply (the limit is 3)")
        .assert_occurs_at(0, "((1");
}

#[test]
fn test_separator_errors() {
    Tester::new("comma in a block")
        .with_source("[a, b]")
        .group()
        .expect_err()
        .assert_kind(ErrorKind::Grouping)
        .assert_msg_has(0, "illegal separator ',' in block")
        .assert_occurs_at(0, ",");

    Tester::new("comma at the top level")
        .with_source("a, b")
        .group()
        .expect_err()
        .assert_msg_has(0, "illegal separator ',' in snippet");

    Tester::new("semicolon in a function body")
        .with_source("{[a] a; a}")
        .group()
        .expect_err()
        .assert_msg_has(0, "illegal separator ';'");

    Tester::new("struct with a bare value")
        .with_source("{a: 1, 2}")
        .group()
        .expect_err()
        .assert_msg_has(0, "struct fields must each be a single 'name: value'")
        .assert_occurs_at(0, "2");

    Tester::new("comma after an expression in braces")
        .with_source("{x + 1, y}")
        .group()
        .expect_err()
        .assert_msg_has(0, "must follow exactly one 'name: value' field");
}

#[test]
fn test_list_errors() {
    Tester::new("parameters without a comma")
        .with_source("{[a b] a}")
        .group()
        .expect_err()
        .assert_kind(ErrorKind::Grouping)
        .assert_msg_has(0, "malformed parameter list: unexpected 'b'")
        .assert_occurs_at(0, "b]");

    Tester::new("frame row too short")
        .with_source("([a, b] 1; 2, 3)")
        .group()
        .expect_err()
        .assert_msg_has(0, "frame row has 1 value(s) for 2 key(s)")
        .assert_occurs_at(0, "1;");

    Tester::new("unterminated type tag")
        .with_source("x: 1 <:int")
        .group()
        .expect_err()
        .assert_msg_has(0, "unterminated type tag");
}

#[test]
fn test_keyword_errors() {
    Tester::new("missing argument between keywords")
        .with_source("x ifTrue: ifFalse: 2")
        .group()
        .expect_err()
        .assert_kind(ErrorKind::Grouping)
        .assert_msg_has(0, "keyword 'ifTrue:' is missing its argument")
        .assert_occurs_at(0, "ifFalse:");

    Tester::new("missing final argument")
        .with_source("x ifTrue:")
        .group()
        .expect_err()
        .assert_msg_has(0, "keyword 'ifTrue:' is missing its argument")
        .assert_occurs_at(0, "ifTrue:");

    Tester::new("missing receiver")
        .with_source("r: ifTrue: 1")
        .group()
        .expect_err()
        .assert_msg_has(0, "keyword 'ifTrue:' needs a value in front of it");
}
