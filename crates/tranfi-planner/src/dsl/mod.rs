//! Pipe DSL → `Plan`.
//!
//! ```text
//! csv | filter "age > 25" | sort -age | head 10 | jsonl
//! ```
//!
//! `csv`, `jsonl` and `text` are decoders in first position and encoders in
//! last position; `table` is an encoder only. Explicit `csv.decode` or
//! `codec.csv.decode` forms are accepted anywhere the registry allows.

pub mod tokenize;
pub mod verbs;

use tranfi_core::dag::{canonical_name, OpSpec};
use tranfi_core::plan::{Plan, Step};

use crate::error::{CompileError, Result};
use crate::recipes::recipe_by_name;
use tokenize::{rest_after_verb, split_stages, tokenize};
use verbs::StageArgs;

const SHORT_CODECS: &[&str] = &["csv", "jsonl", "text", "table"];

/// Compile DSL text, or a recipe name given on its own.
pub fn compile(src: &str) -> Result<Plan> {
    let trimmed = src.trim();
    if !trimmed.is_empty() && !trimmed.contains(|c: char| c.is_whitespace() || c == '|') {
        if let Some(recipe) = recipe_by_name(trimmed) {
            return compile_dsl(recipe.dsl);
        }
    }
    compile_dsl(src)
}

/// Compile DSL text only; recipe names are not looked up.
pub fn compile_dsl(src: &str) -> Result<Plan> {
    if src.trim().is_empty() {
        return Err(CompileError::EmptyPipeline);
    }
    let stages = split_stages(src)?;
    let last = stages.len() - 1;

    let mut steps = Vec::with_capacity(stages.len());
    for (i, stage) in stages.iter().enumerate() {
        let tokens = tokenize(stage);
        let Some((verb, args)) = tokens.split_first() else {
            return Err(CompileError::EmptyStage(i));
        };
        let op = resolve(verb, i == 0, i == last).map_err(|m| CompileError::stage(i, verb, m))?;
        let args = verbs::build(
            op,
            &StageArgs {
                args,
                rest: rest_after_verb(stage),
            },
        )
        .map_err(|m| CompileError::stage(i, verb, m))?;

        // Validate per stage so the error names the stage; `Plan::new` then
        // only adds codec placement checks.
        OpSpec::from_step(op, &args).map_err(|e| CompileError::stage(i, verb, e.to_string()))?;
        steps.push(Step::new(op, args));
    }
    Ok(Plan::new(steps)?)
}

/// `{"steps":[...]}`; validated exactly like DSL output.
pub fn compile_json(src: &str) -> Result<Plan> {
    Ok(Plan::from_json(src)?)
}

pub fn compile_yaml(src: &str) -> Result<Plan> {
    Ok(Plan::from_yaml(src)?)
}

fn resolve(verb: &str, first: bool, last: bool) -> std::result::Result<&'static str, String> {
    if SHORT_CODECS.contains(&verb) {
        let name = match (verb, first, last) {
            ("table", _, true) => "codec.table.encode",
            ("table", _, false) => return Err("table is an output-only codec".into()),
            (_, true, _) => return Ok(codec_name(verb, "decode")),
            (_, _, true) => return Ok(codec_name(verb, "encode")),
            _ => return Err(format!("codec '{verb}' must be the first or last stage")),
        };
        return Ok(name);
    }
    canonical_name(verb).ok_or_else(|| format!("unknown operator '{verb}'"))
}

fn codec_name(codec: &str, dir: &str) -> &'static str {
    match (codec, dir) {
        ("csv", "decode") => "codec.csv.decode",
        ("csv", _) => "codec.csv.encode",
        ("jsonl", "decode") => "codec.jsonl.decode",
        ("jsonl", _) => "codec.jsonl.encode",
        (_, "decode") => "codec.text.decode",
        _ => "codec.text.encode",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(plan: &Plan) -> Vec<&str> {
        plan.steps().iter().map(|s| s.op.as_str()).collect()
    }

    #[test]
    fn csv_head_csv() {
        let plan = compile("csv | head 5 | csv").expect("compile");
        assert_eq!(ops(&plan), vec!["codec.csv.decode", "head", "codec.csv.encode"]);
        assert_eq!(plan.steps()[1].args, serde_json::json!({ "n": 5 }));
    }

    #[test]
    fn codec_positions_and_options() {
        let plan = compile(r#"csv delimiter="\t" header=false | table"#).expect("compile");
        assert_eq!(ops(&plan), vec!["codec.csv.decode", "codec.table.encode"]);
        match plan.decoder() {
            OpSpec::CsvDecode(a) => {
                assert_eq!(a.delimiter, '\t');
                assert!(!a.header);
            }
            other => panic!("unexpected decoder {other:?}"),
        }

        let plan = compile("codec.jsonl.decode | csv.encode").expect("explicit forms");
        assert_eq!(ops(&plan), vec!["codec.jsonl.decode", "codec.csv.encode"]);

        let err = compile("csv | csv | csv").expect_err("codec in the middle");
        assert_eq!(err.stage_index(), Some(1));
        assert!(compile("table | csv").is_err());
    }

    #[test]
    fn aliases_normalize() {
        let plan = compile("csv | dedup | reorder b,a | fill_down | jsonl").expect("compile");
        assert_eq!(
            ops(&plan),
            vec!["codec.csv.decode", "unique", "select", "fill-down", "codec.jsonl.encode"]
        );
    }

    #[test]
    fn stage_errors_carry_position_and_verb() {
        let err = compile("csv | frobnicate | csv").expect_err("unknown");
        assert_eq!(err.to_string(), "stage 1 (frobnicate): unknown operator 'frobnicate'");
        assert_eq!(err.verb(), Some("frobnicate"));

        let err = compile("csv | head abc | csv").expect_err("bad count");
        assert_eq!(err.to_string(), "stage 1 (head): head: invalid count 'abc'");

        let err = compile(r#"csv | filter "age >" | csv"#).expect_err("bad expr");
        assert_eq!(err.stage_index(), Some(1));
        assert!(err.to_string().contains("cannot parse"), "{err}");

        let err = compile("csv | window x 0 avg | csv").expect_err("zero window");
        assert!(err.to_string().contains("size must be > 0"), "{err}");

        assert!(matches!(compile("  "), Err(CompileError::EmptyPipeline)));
        assert!(matches!(compile("csv || csv"), Err(CompileError::EmptyStage(1))));
    }

    #[test]
    fn placement_errors_come_from_the_plan() {
        let err = compile("csv | head 1").expect_err("no encoder");
        assert_eq!(err.to_string(), "plan has no encoder");
    }

    #[test]
    fn recipe_names_compile() {
        let plan = compile("Preview").expect("recipe");
        assert_eq!(ops(&plan), vec!["codec.csv.decode", "head", "codec.csv.encode"]);
        assert!(compile_dsl("preview").is_err());
    }

    #[test]
    fn json_and_yaml_documents() {
        let plan = compile_json(
            r#"{"steps":[{"op":"csv.decode"},{"op":"group_agg","args":{"group_by":"g","aggs":[{"column":"x","func":"sum"}]}},{"op":"codec.csv.encode"}]}"#,
        )
        .expect("json");
        assert_eq!(plan.steps()[1].op, "group-agg");
        assert!(compile_json("{not json").is_err());

        let plan = compile_yaml("steps:\n  - op: codec.text.decode\n  - op: codec.text.encode\n")
            .expect("yaml");
        assert_eq!(plan.len(), 2);
    }
}
