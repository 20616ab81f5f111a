//! `join` and `stack` against side files.

use std::fs;

use tranfi_exec::{Channel, ExecError, Pipeline};
use tranfi_planner::compile;

fn mk_lookup(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write lookup file");
    path.to_string_lossy().into_owned()
}

fn mk_run(dsl: &str, input: &str) -> Result<(String, String), ExecError> {
    let plan = compile(dsl)?;
    let mut p = Pipeline::new(&plan)?;
    p.push(input.as_bytes())?;
    p.finish()?;
    let main = String::from_utf8_lossy(&p.drain(Channel::Main)?).into_owned();
    let errors = String::from_utf8_lossy(&p.drain(Channel::Errors)?).into_owned();
    Ok((main, errors))
}

const PEOPLE: &str = "id,name\n1,Alice\n2,Bob\n3,Cara\n";

#[test]
fn test_inner_join_keeps_matches_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cities = mk_lookup(&dir, "cities.csv", "id,city\n1,Rome\n3,Oslo\n4,Lima\n");
    let (main, _) = mk_run(&format!("csv | join {cities} on id | csv"), PEOPLE).expect("run");
    assert_eq!(main, "id,name,city\n1,Alice,Rome\n3,Cara,Oslo\n");
}

#[test]
fn test_left_join_preserves_row_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cities = mk_lookup(&dir, "cities.csv", "id,city\n1,Rome\n3,Oslo\n");
    let (main, _) =
        mk_run(&format!("csv | join {cities} on id --left | csv"), PEOPLE).expect("run");
    assert_eq!(main, "id,name,city\n1,Alice,Rome\n2,Bob,\n3,Cara,Oslo\n");
}

#[test]
fn test_join_with_renamed_key_and_collisions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let extra = mk_lookup(
        &dir,
        "extra.jsonl",
        "{\"person\":2,\"name\":\"Robert\",\"age\":40}\n",
    );
    let (main, _) =
        mk_run(&format!("csv | join {extra} on id=person | csv"), PEOPLE).expect("run");
    assert_eq!(main, "id,name,name_right,age\n2,Bob,Robert,40\n");
}

#[test]
fn test_missing_lookup_file_is_fatal() {
    let err = mk_run("csv | join /nonexistent/lookup.csv on id | csv", PEOPLE)
        .expect_err("missing file");
    assert!(matches!(err, ExecError::Operator(_)), "{err}");
    assert!(err.to_string().contains("/nonexistent/lookup.csv"), "{err}");
}

#[test]
fn test_stack_appends_tagged_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let more = mk_lookup(&dir, "more.csv", "id,name\n9,Zed\n");
    let (main, _) = mk_run(
        &format!("csv | stack {more} --tag src --tag-value extra | csv"),
        "id,name\n1,Alice\n",
    )
    .expect("run");
    assert_eq!(main, "id,name,src\n1,Alice,input\n9,Zed,extra\n");

    let (main, _) = mk_run(&format!("csv | stack {more} | csv"), "id,name\n1,Alice\n").expect("run");
    assert_eq!(main, "id,name\n1,Alice\n9,Zed\n");
}
