use super::*;
use crate::pace::input_source::ErrorKind;

#[test]
fn test_unknown_names() {
    Tester::new_single_source_expect_err("top level", "y + 1")
        .assert_kind(ErrorKind::UnknownName)
        .assert_msg_has(0, "unknown name 'y'")
        .assert_occurs_at(0, "y");

    Tester::new_single_source_expect_err("parent sigil", "
        f: {[a] .zz}
    ")
    .assert_kind(ErrorKind::UnknownName)
    .assert_msg_has(0, "'.zz' is not bound in that scope")
    .assert_occurs_at(0, ".zz");

    Tester::new_single_source_expect_err("context sigil", "_limit + 1")
        .assert_kind(ErrorKind::UnknownName)
        .assert_msg_has(0, "'_limit' is not bound in that scope");

    Tester::new_single_source_expect_err("attribute of an unknown value", "p.x")
        .assert_kind(ErrorKind::UnknownName)
        .assert_msg_has(0, "unknown value 'p'");
}

#[test]
fn test_read_only_scopes() {
    Tester::new_single_source_expect_err("binding in the parent scope", "
        a: 1
        f: {[b] .a: b}
    ")
    .assert_kind(ErrorKind::ScopeAccess)
    .assert_msg_has(0, "cannot bind '.a': the parent scope is read-only from here")
    .assert_num_parsed(1);

    Tester::new_single_source_expect_err("binding in the module scope", "
        f: {[b] ..a: b}
    ")
    .assert_kind(ErrorKind::ScopeAccess)
    .assert_msg_has(0, "the module scope is read-only from here");

    Tester::new_single_source_expect_err("function in the global scope", "
        __f: {[a] a}
    ")
    .assert_kind(ErrorKind::ScopeAccess)
    .assert_msg_has(0, "functions cannot live in the global scope");
}

#[test]
fn test_value_and_function_names() {
    Tester::new_single_source_expect_err("function name rebound to a value", "
        x: {[a] a}
        x: 1
    ")
    .assert_kind(ErrorKind::ScopeAccess)
    .assert_msg_has(0, "'x' is bound to a function in this scope")
    .assert_num(2)
    .assert_msg_has(1, "the function was bound here");

    Tester::new_single_source_expect_err("value name rebound to a function", "
        x: 1
        x: {[a] a}
    ")
    .assert_kind(ErrorKind::ScopeAccess)
    .assert_msg_has(0, "'x' is bound to a value in this scope");

    Tester::new_single_source_expect_err("value redeclared with another type", "
        x: 1
        x: \"a\"
    ")
    .assert_kind(ErrorKind::IncompatibleTypes)
    .assert_msg_has(0, "'x' was declared as int, it cannot be redeclared as txt")
    .assert_msg_has(1, "the earlier declaration is here")
    .assert_occurs_at(1, "x: 1");

    Tester::new_single_source_expect_err("parameter declared twice", "
        f: {[a, a] a}
    ")
    .assert_kind(ErrorKind::ScopeAccess)
    .assert_msg_has(0, "parameter 'a' is declared twice");

    Tester::new_single_source_expect_ok("value redeclared with the same type", "
        x: 1
        x: 2
        x
    ")
    .assert_value(Value::Int(2));
}

#[test]
fn test_resolution_targets() {
    Tester::new_single_source_expect_ok("local and parent", "
        x: 1
        f: {[x] x + .x}
        f(10)
    ")
    .for_phrase(1, |p| {
        p.assert_render("BindFn(f,Func([x],[TBI],TBI,[Apply(GetOverload(+,2),[GetVal(x),GetVal(.x)])],unary))");
    })
    .assert_value(Value::Int(11));

    Tester::new_single_source_expect_ok("contextual and global", "
        _limit: 3
        __total: 10
        f: {[] _limit + __total}
        f()
    ")
    .for_phrase(2, |p| {
        p.assert_render_has("[GetVal(_limit),GetVal(__total)]");
    })
    .assert_value(Value::Int(13));

    Tester::new_single_source_expect_ok("module sigil from a nested body", "
        x: 4
        f: {[x] g: {[y] ..x * y}. g(x)}
        f(5)
    ")
    .assert_value(Value::Int(20));
}
