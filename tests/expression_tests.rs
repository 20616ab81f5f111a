//! Expression semantics as seen through `filter`, `derive` and `validate`.

use tranfi_exec::{Channel, Pipeline};
use tranfi_planner::{compile, to_sql};

fn mk_run(dsl: &str, input: &str) -> String {
    let plan = compile(dsl).expect("compile");
    let mut p = Pipeline::new(&plan).expect("pipeline");
    p.push(input.as_bytes()).expect("push");
    p.finish().expect("finish");
    String::from_utf8(p.drain(Channel::Main).expect("main")).expect("utf8")
}

#[test]
fn test_arithmetic_and_promotion() {
    let out = mk_run(
        r#"csv | derive "total=price * qty" "ratio=price / qty" | csv"#,
        "price,qty\n2,3\n1.5,2\n7,0\n",
    );
    assert_eq!(
        out,
        "price,qty,total,ratio\n2,3,6,0.6666666666666666\n1.5,2,3,0.75\n7,0,0,\n"
    );
}

#[test]
fn test_unquoted_derive_expression_spans_tokens() {
    let out = mk_run("csv | derive total=a + b | csv", "a,b\n1,2\n");
    assert_eq!(out, "a,b,total\n1,2,3\n");
}

#[test]
fn test_null_comparisons() {
    let input_with_null = "x,y\n1,a\n,b\n2,c\n";
    assert_eq!(
        mk_run("csv | filter \"x == 1\" | csv", input_with_null),
        "x,y\n1,a\n"
    );
    assert_eq!(
        mk_run("csv | filter \"x != 1\" | csv", input_with_null),
        "x,y\n,b\n2,c\n"
    );
    assert_eq!(
        mk_run("csv | filter \"x < 5\" | csv", input_with_null),
        "x,y\n1,a\n2,c\n"
    );
}

#[test]
fn test_dates_and_strings() {
    let input = "name,joined\nAlice,2024-03-01\nBob,2023-12-31\n";
    assert_eq!(
        mk_run("csv | filter \"joined > '2024-01-01'\" | csv", input),
        "name,joined\nAlice,2024-03-01\n"
    );
    assert_eq!(
        mk_run(
            r#"csv | derive "tag=concat(upper(left(name, 1)), '-', len(name))" | select tag | csv"#,
            input
        ),
        "tag\nA-5\nB-3\n"
    );
}

#[test]
fn test_functions_and_boolean_logic() {
    let input = "s,n\n  hi  ,-4\nyo,9\n";
    let out = mk_run(
        r#"csv | derive "t=trim(s)" "a=abs(n)" "big=if(n > 5 and not starts_with(s, 'x'), 'y', 'n')" | select t,a,big | csv"#,
        input,
    );
    assert_eq!(out, "t,a,big\nhi,4,n\nyo,9,y\n");
}

#[test]
fn test_validate_marks_rows() {
    let out = mk_run("csv | validate \"age >= 18\" | csv", "age\n20\n15\n");
    assert_eq!(out, "age,_valid\n20,true\n15,false\n");
}

#[test]
fn test_null_rows_agree_between_engine_and_sql() {
    // Engine keeps the Null row for `!=` and for `not` of a Null comparison;
    // the SQL pins both to the same two-valued result.
    let input = "x,y\n1,a\n,b\n7,c\n";
    let ne = "csv | filter \"x != 1\" | csv";
    assert_eq!(mk_run(ne, input), "x,y\n,b\n7,c\n");
    let sql = to_sql(&compile(ne).expect("compile")).expect("sql");
    assert!(sql.contains("WHERE coalesce((\"x\" <> 1), TRUE)"), "{sql}");

    let not = "csv | filter \"not (x > 5)\" | csv";
    assert_eq!(mk_run(not, input), "x,y\n1,a\n,b\n");
    let sql = to_sql(&compile(not).expect("compile")).expect("sql");
    assert!(sql.contains("WHERE (NOT coalesce((\"x\" > 5), FALSE))"), "{sql}");
}

#[test]
fn test_extreme_integer_arguments() {
    assert_eq!(
        mk_run("csv | derive \"x=substr(name, 1, 9223372036854775807)\" | csv", "name\nAlice\n"),
        "name,x\nAlice,lice\n"
    );
    assert_eq!(
        mk_run("csv | derive \"p=pad_left(name, 1000000000000)\" | csv", "name\nAl\n"),
        "name,p\nAl,\n"
    );
    assert_eq!(
        mk_run("csv | derive \"m=-9223372036854775808\" \"n=-m\" | csv", "a\n1\n"),
        "a,m,n\n1,-9223372036854775808,\n"
    );
}
