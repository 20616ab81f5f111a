//! End-to-end pipeline runs: DSL in, channel bytes out.

use tranfi_core::config::EngineConfig;
use tranfi_exec::{Channel, Pipeline, State};
use tranfi_planner::compile;

struct Run {
    main: String,
    errors: String,
    stats: String,
    samples: String,
}

fn mk_run_chunked(dsl: &str, input: &str, chunk: usize) -> Run {
    let plan = compile(dsl).expect("compile");
    let mut p = Pipeline::new(&plan).expect("pipeline");
    let mut main = Vec::new();
    for piece in input.as_bytes().chunks(chunk) {
        p.push(piece).expect("push");
        main.extend(p.drain(Channel::Main).expect("drain"));
    }
    p.finish().expect("finish");
    main.extend(p.drain(Channel::Main).expect("drain"));
    let text = |bytes: Vec<u8>| String::from_utf8(bytes).expect("utf8");
    Run {
        main: text(main),
        errors: text(p.drain(Channel::Errors).expect("errors")),
        stats: text(p.drain(Channel::Stats).expect("stats")),
        samples: text(p.drain(Channel::Samples).expect("samples")),
    }
}

fn mk_run(dsl: &str, input: &str) -> Run {
    mk_run_chunked(dsl, input, 4096)
}

fn stat(block: &str, key: &str) -> Option<u64> {
    block.lines().find_map(|l| {
        l.strip_prefix(key)
            .and_then(|rest| rest.strip_prefix(": "))
            .and_then(|v| v.parse().ok())
    })
}

#[test]
fn test_tail_keeps_last_rows() {
    let run = mk_run("csv | tail 2 | csv", "name\nAlice\nBob\nCharlie\n");
    assert_eq!(run.main, "name\nBob\nCharlie\n");
}

#[test]
fn test_running_sum() {
    let run = mk_run("csv | step val running-sum cumsum | csv", "val\n10\n20\n30\n");
    assert_eq!(run.main, "val,cumsum\n10,10\n20,30\n30,60\n");
}

#[test]
fn test_filter_sort_head() {
    let input = "name,age\nAlice,30\nBob,25\nCharlie,35\nDana,28\n";
    let run = mk_run(r#"csv | filter "age > 26" | sort -age | head 2 | csv"#, input);
    assert_eq!(run.main, "name,age\nCharlie,35\nAlice,30\n");
    assert!(run.errors.is_empty());
}

#[test]
fn test_chunk_boundaries_do_not_change_output() {
    let input = "id,note\r\n1,\"multi\nline\"\r\n2,\"a, b\"\r\n\r\n3,plain\r\n";
    let expected = mk_run_chunked("csv | jsonl", input, 4096).main;
    assert_eq!(
        expected,
        "{\"id\":1,\"note\":\"multi\\nline\"}\n{\"id\":2,\"note\":\"a, b\"}\n{\"id\":3,\"note\":\"plain\"}\n"
    );
    for chunk in [1, 2, 3, 5, 8] {
        assert_eq!(mk_run_chunked("csv | jsonl", input, chunk).main, expected, "chunk {chunk}");
    }
}

#[test]
fn test_stats_block() {
    let input = "x\n1\n2\n3\n";
    let run = mk_run("csv | filter \"x >= 2\" | csv", input);
    assert_eq!(stat(&run.stats, "rows_in"), Some(3));
    assert_eq!(stat(&run.stats, "rows_out"), Some(2));
    assert_eq!(stat(&run.stats, "bytes_in"), Some(input.len() as u64));
    assert_eq!(stat(&run.stats, "bytes_out"), Some(run.main.len() as u64));
    assert_eq!(stat(&run.stats, "errors"), Some(0));
    assert!(run.stats.lines().any(|l| l.starts_with("plan: ") && l.len() == 6 + 64));
}

#[test]
fn test_samples_channel() {
    let input: String = std::iter::once("n\n".to_string())
        .chain((1..=20).map(|i| format!("{i}\n")))
        .collect();
    let run = mk_run("csv | csv", &input);
    let lines: Vec<&str> = run.samples.lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "{\"n\":1}");
    assert_eq!(lines[9], "{\"n\":10}");
}

#[test]
fn test_recipe_by_name_runs() {
    let input: String = std::iter::once("n\n".to_string())
        .chain((1..=15).map(|i| format!("{i}\n")))
        .collect();
    let run = mk_run("preview", &input);
    assert_eq!(run.main.lines().count(), 11);

    let run = mk_run("csv2json", "a,b\n1,x\n");
    assert_eq!(run.main, "{\"a\":1,\"b\":\"x\"}\n");
}

#[test]
fn test_config_from_plan_and_env_defaults() {
    let plan = compile("csv | csv").expect("compile");
    let cfg = EngineConfig {
        emit_stats: false,
        sample_rows: 0,
        ..EngineConfig::default()
    };
    let mut p = Pipeline::with_config(&plan, cfg).expect("pipeline");
    p.push(b"a\n1\n").expect("push");
    p.finish().expect("finish");
    assert!(p.drain(Channel::Stats).expect("stats").is_empty());
    assert!(p.drain(Channel::Samples).expect("samples").is_empty());
    assert_eq!(p.state(), State::Finished);

    let bad = EngineConfig {
        batch_size: 0,
        ..EngineConfig::default()
    };
    assert!(Pipeline::with_config(&plan, bad).is_err());
}

#[test]
fn test_blocking_then_streaming() {
    let input = "g,v\na,1\nb,2\na,3\n";
    let run = mk_run(
        "csv | group-agg g v:sum v:count | derive \"double=v_sum * 2\" | csv",
        input,
    );
    assert_eq!(run.main, "g,v_sum,v_count,double\na,4,2,8\nb,2,1,4\n");
}

#[test]
fn test_empty_input() {
    let run = mk_run("csv | sort x | csv", "");
    assert_eq!(run.main, "");
    assert_eq!(stat(&run.stats, "rows_in"), Some(0));
}
