use criterion::{criterion_group, criterion_main, Criterion};
use tranfi::{compile, run_plan, EngineConfig};

fn make_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("id,group,value,label\n");
    for i in 0..rows {
        out.push_str(&format!(
            "{},group-{},{}.{},item {}\n",
            i,
            i % 4,
            i % 97,
            i % 10,
            i
        ));
    }
    out.into_bytes()
}

fn bench_pipelines(c: &mut Criterion) {
    let input = make_csv(10_000);
    let cases = [
        ("csv_passthrough", "csv | csv"),
        ("filter_derive", r#"csv | filter "value > 20" | derive "double=value * 2" | csv"#),
        ("group_agg", "csv | group-agg group value:sum value:avg | csv"),
        ("sort_head", "csv | sort -value | head 100 | jsonl"),
        ("stats_profile", "profile"),
    ];
    for (name, dsl) in cases {
        let plan = compile(dsl).unwrap();
        c.bench_function(name, |b| {
            b.iter(|| {
                let _ = run_plan(&plan, EngineConfig::default(), &input, 64 * 1024).unwrap();
            })
        });
    }
}

criterion_group!(pipelines, bench_pipelines);
criterion_main!(pipelines);
