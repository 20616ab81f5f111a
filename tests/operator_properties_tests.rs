//! Properties of the row transforms, checked on generated input.

use serde_json::Value as J;
use tranfi_exec::{Channel, Pipeline};
use tranfi_planner::compile;

fn mk_rows(dsl: &str, input: &str) -> Vec<serde_json::Map<String, J>> {
    let plan = compile(dsl).expect("compile");
    let mut p = Pipeline::new(&plan).expect("pipeline");
    p.push(input.as_bytes()).expect("push");
    p.finish().expect("finish");
    let out = String::from_utf8(p.drain(Channel::Main).expect("main")).expect("utf8");
    out.lines()
        .map(|l| match serde_json::from_str(l).expect("json line") {
            J::Object(m) => m,
            other => panic!("not an object: {other}"),
        })
        .collect()
}

/// Deterministic pseudo-random CSV: `id,group,score`.
fn mk_csv(rows: usize, groups: u64) -> String {
    let mut state: u64 = 0x2545_f491;
    let mut out = String::from("id,group,score\n");
    for id in 0..rows {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let group = (state >> 33) % groups;
        let score = (state >> 40) % 50;
        out.push_str(&format!("{id},g{group},{score}\n"));
    }
    out
}

fn int(row: &serde_json::Map<String, J>, key: &str) -> i64 {
    row.get(key).and_then(J::as_i64).expect("int field")
}

fn text(row: &serde_json::Map<String, J>, key: &str) -> String {
    row.get(key).and_then(J::as_str).expect("string field").to_string()
}

#[test]
fn test_unique_has_no_duplicate_keys_and_keeps_first_occurrence() {
    let input = mk_csv(200, 7);
    let rows = mk_rows("csv | unique group | jsonl", &input);
    let groups: Vec<String> = rows.iter().map(|r| text(r, "group")).collect();
    let mut seen = std::collections::HashSet::new();
    assert!(groups.iter().all(|g| seen.insert(g.clone())));

    let all = mk_rows("csv | jsonl", &input);
    let mut first = Vec::new();
    for r in &all {
        let g = text(r, "group");
        if !first.contains(&g) {
            first.push(g);
        }
    }
    assert_eq!(groups, first);
    let ids: Vec<i64> = rows.iter().map(|r| int(r, "id")).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let dedup = mk_rows("csv | dedup | jsonl", "a,b\n1,x\n1,x\n2,x\n1,x\n");
    assert_eq!(dedup.len(), 2);
}

#[test]
fn test_sort_is_ordered_and_stable() {
    let input = mk_csv(300, 5);
    let rows = mk_rows("csv | sort -score | jsonl", &input);
    assert_eq!(rows.len(), 300);
    for w in rows.windows(2) {
        let (a, b) = (int(&w[0], "score"), int(&w[1], "score"));
        assert!(a >= b);
        if a == b {
            assert!(int(&w[0], "id") < int(&w[1], "id"), "ties keep input order");
        }
    }

    let rows = mk_rows("csv | sort group,-score | jsonl", &input);
    for w in rows.windows(2) {
        let (ga, gb) = (text(&w[0], "group"), text(&w[1], "group"));
        assert!(ga <= gb);
        if ga == gb {
            assert!(int(&w[0], "score") >= int(&w[1], "score"));
        }
    }
}

#[test]
fn test_sample_size_and_membership() {
    let input = mk_csv(500, 3);
    let ids: Vec<i64> = mk_rows("csv | jsonl", &input).iter().map(|r| int(r, "id")).collect();

    let rows = mk_rows("csv | sample 25 seed=7 | jsonl", &input);
    assert_eq!(rows.len(), 25);
    let sampled: Vec<i64> = rows.iter().map(|r| int(r, "id")).collect();
    assert!(sampled.iter().all(|id| ids.contains(id)));
    assert!(sampled.windows(2).all(|w| w[0] < w[1]), "input order is kept");

    let again: Vec<i64> = mk_rows("csv | sample 25 seed=7 | jsonl", &input)
        .iter()
        .map(|r| int(r, "id"))
        .collect();
    assert_eq!(sampled, again);

    assert_eq!(mk_rows("csv | sample 1000 | jsonl", &input).len(), 500);
}

#[test]
fn test_group_agg_matches_hand_computation() {
    let input = mk_csv(400, 4);
    let all = mk_rows("csv | jsonl", &input);
    let rows = mk_rows(
        "csv | group-agg group score:sum score:count score:min score:max score:avg | jsonl",
        &input,
    );
    assert_eq!(rows.len(), 4);
    for r in &rows {
        let g = text(r, "group");
        let scores: Vec<i64> = all
            .iter()
            .filter(|x| text(x, "group") == g)
            .map(|x| int(x, "score"))
            .collect();
        let sum: i64 = scores.iter().sum();
        assert_eq!(r["score_sum"].as_f64(), Some(sum as f64));
        assert_eq!(r["score_count"].as_i64(), Some(scores.len() as i64));
        assert_eq!(r["score_min"].as_f64(), scores.iter().min().map(|v| *v as f64));
        assert_eq!(r["score_max"].as_f64(), scores.iter().max().map(|v| *v as f64));
        let avg = r["score_avg"].as_f64().expect("avg");
        assert!((avg - sum as f64 / scores.len() as f64).abs() < 1e-9);
    }
}

#[test]
fn test_window_is_null_until_full() {
    let rows = mk_rows("csv | window v 2 avg ma | jsonl", "v\n1\n2\n3\n");
    let ma: Vec<J> = rows.iter().map(|r| r["ma"].clone()).collect();
    assert_eq!(ma, vec![J::Null, J::from(1.5), J::from(2.5)]);
}

#[test]
fn test_reshaping() {
    let rows = mk_rows("csv | unpivot q1 q2 | jsonl", "id,q1,q2\n1,10,20\n");
    assert_eq!(rows.len(), 2);
    assert_eq!(text(&rows[0], "variable"), "q1");
    assert_eq!(int(&rows[1], "value"), 20);
    assert_eq!(int(&rows[1], "id"), 1);

    let rows = mk_rows("csv | explode tags ; | jsonl", "id,tags\n1,a;b;c\n2,d\n");
    let tags: Vec<String> = rows.iter().map(|r| text(r, "tags")).collect();
    assert_eq!(tags, vec!["a", "b", "c", "d"]);

    let rows = mk_rows("csv | fill-down city | jsonl", "city,n\nRome,1\n,2\nOslo,3\n,4\n");
    let cities: Vec<String> = rows.iter().map(|r| text(r, "city")).collect();
    assert_eq!(cities, vec!["Rome", "Rome", "Oslo", "Oslo"]);
}

#[test]
fn test_head_skip_top() {
    let input = mk_csv(50, 2);
    assert_eq!(mk_rows("csv | head 0 | jsonl", &input).len(), 0);
    let skipped = mk_rows("csv | skip 45 | jsonl", &input);
    assert_eq!(skipped.iter().map(|r| int(r, "id")).collect::<Vec<_>>(), vec![45, 46, 47, 48, 49]);

    let top = mk_rows("csv | top 3 score | jsonl", &input);
    assert_eq!(top.len(), 3);
    let best = mk_rows("csv | sort -score | head 1 | jsonl", &input);
    assert_eq!(int(&top[0], "score"), int(&best[0], "score"));
}
