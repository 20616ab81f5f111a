//! Codec behaviour through whole pipelines: round trips, repair, options.

use tranfi_exec::{Channel, Pipeline};
use tranfi_planner::compile;

fn mk_run(dsl: &str, input: &str) -> (String, String) {
    let plan = compile(dsl).expect("compile");
    let mut p = Pipeline::new(&plan).expect("pipeline");
    p.push(input.as_bytes()).expect("push");
    p.finish().expect("finish");
    let main = String::from_utf8(p.drain(Channel::Main).expect("main")).expect("utf8");
    let errors = String::from_utf8(p.drain(Channel::Errors).expect("errors")).expect("utf8");
    (main, errors)
}

#[test]
fn test_csv_round_trip() {
    let input = "name,age,score\nAlice,30,1.5\n\"Smith, J\",,2\n\"say \"\"hi\"\"\",7,-3\n";
    let (main, errors) = mk_run("csv | csv", input);
    assert_eq!(main, input);
    assert!(errors.is_empty());
}

#[test]
fn test_jsonl_round_trip() {
    let input = "{\"a\":1,\"b\":\"x\",\"c\":null,\"d\":true,\"e\":1.5}\n{\"a\":-2,\"b\":\"\",\"c\":null,\"d\":false,\"e\":0.25}\n";
    let (main, _) = mk_run("jsonl | jsonl", input);
    assert_eq!(main, input);
}

#[test]
fn test_csv_to_jsonl_types() {
    let (main, _) = mk_run("csv | jsonl", "i,f,s,d,n\n42,2.5,hello,2024-01-15,\n");
    assert_eq!(
        main,
        "{\"i\":42,\"f\":2.5,\"s\":\"hello\",\"d\":\"2024-01-15\",\"n\":null}\n"
    );
}

#[test]
fn test_csv_repair_pads_and_truncates() {
    let input = "a,b,c\n1,2\n3,4,5,6\n7,8,9\n";
    let (main, errors) = mk_run("csv repair=true | csv", input);
    assert_eq!(main, "a,b,c\n1,2,\n3,4,5\n7,8,9\n");
    assert!(errors.is_empty());

    let (main, errors) = mk_run("csv | csv", input);
    assert_eq!(main, "a,b,c\n7,8,9\n");
    let lines: Vec<&str> = errors.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"op\":\"codec.csv.decode\""), "{}", lines[0]);
    assert!(lines[0].contains("\"row\":1"), "{}", lines[0]);
}

#[test]
fn test_delimiters_and_headerless_input() {
    let (main, _) = mk_run(r#"csv delimiter="\t" | csv"#, "a\tb\n1\tx,y\n");
    assert_eq!(main, "a,b\n1,\"x,y\"\n");

    let (main, _) = mk_run(r#"csv | csv delimiter=";""#, "a,b\n1,2\n");
    assert_eq!(main, "a;b\n1;2\n");

    let (main, _) = mk_run("csv header=false | jsonl", "1,x\n2,y\n");
    assert_eq!(main, "{\"col1\":1,\"col2\":\"x\"}\n{\"col1\":2,\"col2\":\"y\"}\n");
}

#[test]
fn test_text_lines() {
    let (main, _) = mk_run("text | grep err | text", "ok 1\r\nerr 2\nerr 3");
    assert_eq!(main, "err 2\nerr 3\n");

    let (main, _) = mk_run("csv | text", "x,y\n1,b\n");
    assert_eq!(main, "1\tb\n");
}

#[test]
fn test_markdown_table() {
    let (main, _) = mk_run("csv | table", "name,age\nAlice,30\nBo,5\n");
    assert_eq!(
        main,
        "| name  | age |\n| ----- | --- |\n| Alice |  30 |\n| Bo    |   5 |\n"
    );
}

#[test]
fn test_malformed_jsonl_lines_are_reported() {
    let (main, errors) = mk_run("jsonl | jsonl", "{\"a\":1}\nnot json\n{\"a\":2}\n");
    assert_eq!(main, "{\"a\":1}\n{\"a\":2}\n");
    assert_eq!(errors.lines().count(), 1);
    assert!(errors.contains("\"row\":2"));
}

#[test]
fn test_stray_quote_does_not_split_later_records() {
    let input = "a,b\n5\" x,1\n\"q\nr\",2\n";
    let expected = "{\"a\":\"5\\\" x\",\"b\":1}\n{\"a\":\"q\\nr\",\"b\":2}\n";
    let (main, errors) = mk_run("csv | jsonl", input);
    assert_eq!(main, expected);
    assert!(errors.is_empty(), "{errors}");

    let plan = compile("csv | jsonl").expect("compile");
    let mut p = Pipeline::new(&plan).expect("pipeline");
    for b in input.as_bytes().chunks(1) {
        p.push(b).expect("push");
    }
    p.finish().expect("finish");
    let main = String::from_utf8(p.drain(Channel::Main).expect("main")).expect("utf8");
    assert_eq!(main, expected);
}
