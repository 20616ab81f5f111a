//! Per-verb argument grammar.
//!
//! Each builder turns the tokens after the verb into the JSON `args` object
//! for one step. Builders check arity and parse counts; argument types and
//! ranges are left to `OpSpec::from_step`. Errors are plain messages; the
//! caller attaches the stage index and verb.

use serde_json::{json, Map, Value as J};

type Built = std::result::Result<J, String>;

/// A stage after tokenization: `args` excludes the verb, `rest` is the raw
/// text after it.
pub struct StageArgs<'a> {
    pub args: &'a [String],
    pub rest: &'a str,
}

/// Build args for canonical op `op`.
pub fn build(op: &str, stage: &StageArgs<'_>) -> Built {
    let a = stage.args;
    match op {
        op if op.starts_with("codec.") => codec_options(a),
        "filter" | "validate" => expression(op, stage),
        "select" => Ok(json!({ "columns": non_empty(a, "select requires at least one column name")? })),
        "rename" => Ok(json!({ "mapping": mapping(op, a, "old=new")? })),
        "cast" => Ok(json!({ "mapping": mapping(op, a, "column=type")? })),
        "fill-null" => Ok(json!({ "mapping": mapping(op, a, "column=value")? })),
        "head" | "skip" | "tail" => Ok(json!({ "n": count_arg(op, a)? })),
        "sample" => sample(a),
        "derive" => derive(a),
        "stats" => Ok(optional_list("stats", a)),
        "unique" | "trim" | "hash" | "fill-down" | "frequency" => Ok(optional_list("columns", a)),
        "sort" => sort(a),
        "top" => top(a),
        "replace" => replace(a),
        "clip" => clip(a),
        "bin" => bin(a),
        "datetime" => datetime(a),
        "date-trunc" => date_trunc(a),
        "explode" => explode(a),
        "split" => split(a),
        "unpivot" => Ok(json!({ "columns": non_empty(a, "unpivot requires at least one column name")? })),
        "group-agg" => group_agg(a),
        "step" => step(a),
        "window" => window(a),
        "lead" => lead(a),
        "grep" => grep(a),
        "pivot" => pivot(a),
        "join" => join(a),
        "stack" => stack(a),
        "flatten" => Ok(json!({})),
        "onehot" => onehot(a),
        "label-encode" => column_and_result(op, a),
        "ewma" => ewma(a),
        "diff" => numeric_then_result(op, a, "order", |t| t.parse::<u64>().ok().map(J::from)),
        "anomaly" => numeric_then_result(op, a, "threshold", |t| {
            t.parse::<f64>().ok().filter(|f| f.is_finite()).map(J::from)
        }),
        "split-data" => split_data(a),
        "interpolate" => column_then(op, a, "method"),
        "normalize" => normalize(a),
        "acf" => acf(a),
        // Every registered op is listed above; anything else gets key=value args
        // and is rejected by validation if it needs more.
        _ => codec_options(a),
    }
}

fn non_empty(args: &[String], message: &str) -> std::result::Result<Vec<String>, String> {
    if args.is_empty() {
        Err(message.to_string())
    } else {
        Ok(args.to_vec())
    }
}

fn optional_list(key: &str, args: &[String]) -> J {
    let mut m = Map::new();
    if !args.is_empty() {
        m.insert(key.into(), json!(args));
    }
    J::Object(m)
}

fn count(verb: &str, tok: &str) -> std::result::Result<u64, String> {
    tok.parse::<u64>()
        .map_err(|_| format!("{verb}: invalid count '{tok}'"))
}

fn count_arg(verb: &str, args: &[String]) -> std::result::Result<u64, String> {
    match args.first() {
        Some(tok) => count(verb, tok),
        None => Err(format!("{verb} requires a count argument")),
    }
}

fn number(verb: &str, what: &str, tok: &str) -> std::result::Result<f64, String> {
    tok.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| format!("{verb}: invalid {what} '{tok}'"))
}

/// Codec options. `true`/`false` become booleans, integers become numbers,
/// `\t` means TAB, and dashes in keys read as underscores.
fn codec_options(args: &[String]) -> Built {
    let mut m = Map::new();
    for tok in args {
        let (key, value) = tok
            .split_once('=')
            .ok_or_else(|| format!("expected key=value option, got '{tok}'"))?;
        m.insert(key.replace('-', "_"), option_value(value));
    }
    Ok(J::Object(m))
}

fn option_value(v: &str) -> J {
    match v {
        "true" => J::Bool(true),
        "false" => J::Bool(false),
        _ => match v.parse::<i64>() {
            Ok(i) => J::from(i),
            Err(_) => J::String(v.replace("\\t", "\t")),
        },
    }
}

/// `filter "expr"` or a bare expression spread over several tokens.
fn expression(verb: &str, stage: &StageArgs<'_>) -> Built {
    let expr = match stage.args {
        [] => return Err(format!("{verb} requires an expression argument")),
        [one] => one.clone(),
        _ => stage.rest.to_string(),
    };
    Ok(json!({ "expr": expr }))
}

/// `old=new` pairs, several per token when comma-joined.
fn mapping(verb: &str, args: &[String], shape: &str) -> Built {
    if args.is_empty() {
        return Err(format!("{verb} requires at least one {shape} mapping"));
    }
    let mut m = Map::new();
    for part in args.iter().flat_map(|t| t.split(',')).filter(|p| !p.is_empty()) {
        let (k, v) = part
            .split_once('=')
            .ok_or_else(|| format!("invalid {verb} mapping: '{part}' (expected {shape})"))?;
        m.insert(k.to_string(), J::String(v.to_string()));
    }
    Ok(J::Object(m))
}

fn sample(args: &[String]) -> Built {
    let n = count_arg("sample", args)?;
    let mut m = Map::new();
    m.insert("n".into(), J::from(n));
    let mut rest = args[1..].iter();
    while let Some(tok) = rest.next() {
        let seed = match tok.strip_prefix("seed=") {
            Some(s) => s,
            None if tok == "--seed" => rest
                .next()
                .map(String::as_str)
                .ok_or("sample: --seed needs a value")?,
            None => return Err(format!("sample: unexpected argument '{tok}'")),
        };
        m.insert("seed".into(), J::from(count("sample", seed)?));
    }
    Ok(J::Object(m))
}

/// True for `name=...` but not for `==`, `<=` and friends.
fn starts_mapping(tok: &str) -> bool {
    match tok.split_once('=') {
        Some((name, value)) => {
            !name.is_empty()
                && !value.starts_with('=')
                && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        }
        None => false,
    }
}

/// `name=expr ...`. Tokens that do not start a new mapping continue the
/// previous expression, so unquoted `total=price * qty` works.
fn derive(args: &[String]) -> Built {
    if args.is_empty() {
        return Err("derive requires at least one name=expression mapping".into());
    }
    let mut columns: Vec<(String, String)> = Vec::new();
    for tok in args {
        if starts_mapping(tok) {
            if let Some((name, expr)) = tok.split_once('=') {
                columns.push((name.to_string(), expr.to_string()));
            }
            continue;
        }
        match columns.last_mut() {
            Some((_, expr)) => {
                expr.push(' ');
                expr.push_str(tok);
            }
            None => return Err(format!("derive: invalid mapping '{tok}' (expected name=expr)")),
        }
    }
    let cols: Vec<J> = columns
        .into_iter()
        .map(|(name, expr)| json!({ "name": name, "expr": expr }))
        .collect();
    Ok(json!({ "columns": cols }))
}

fn sort(args: &[String]) -> Built {
    if args.is_empty() {
        return Err("sort requires at least one column name".into());
    }
    let keys = args
        .iter()
        .map(|tok| {
            let (name, desc) = match tok.strip_prefix('-') {
                Some(n) => (n, true),
                None => (tok.strip_prefix('+').unwrap_or(tok), false),
            };
            if name.is_empty() {
                Err(format!("sort: empty column name in '{tok}'"))
            } else {
                Ok(json!({ "name": name, "desc": desc }))
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(json!({ "columns": keys }))
}

/// `top N col`: descending unless the column is prefixed with `+`.
fn top(args: &[String]) -> Built {
    let [n, col, ..] = args else {
        return Err("top requires a count and a column".into());
    };
    let n = count("top", n)?;
    let (column, desc) = match col.strip_prefix('+') {
        Some(c) => (c, false),
        None => (col.strip_prefix('-').unwrap_or(col), true),
    };
    Ok(json!({ "n": n, "column": column, "desc": desc }))
}

fn replace(args: &[String]) -> Built {
    let mut regex = false;
    let mut positional = Vec::new();
    for tok in args {
        match tok.as_str() {
            "-r" | "--regex" if positional.is_empty() => regex = true,
            _ => positional.push(tok.as_str()),
        }
    }
    match positional.as_slice() {
        [column, pattern, rest @ ..] => Ok(json!({
            "column": column,
            "pattern": pattern,
            "replacement": rest.join(" "),
            "regex": regex,
        })),
        _ => Err("replace requires column, pattern and replacement".into()),
    }
}

fn clip(args: &[String]) -> Built {
    let Some((column, bounds)) = args.split_first() else {
        return Err("clip requires a column".into());
    };
    let mut m = Map::new();
    m.insert("column".into(), J::String(column.clone()));
    for tok in bounds {
        match tok.split_once('=') {
            Some((key @ ("min" | "max"), v)) => {
                m.insert(key.into(), J::from(number("clip", key, v)?));
            }
            _ => return Err(format!("clip: expected min=.. or max=.., got '{tok}'")),
        }
    }
    Ok(J::Object(m))
}

fn bin(args: &[String]) -> Built {
    let [column, bounds @ ..] = args else {
        return Err("bin requires a column and at least one boundary".into());
    };
    if bounds.is_empty() {
        return Err("bin requires a column and at least one boundary".into());
    }
    let boundaries = bounds
        .iter()
        .map(|b| number("bin", "boundary", b))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(json!({ "column": column, "boundaries": boundaries }))
}

fn datetime(args: &[String]) -> Built {
    let [column, parts @ ..] = args else {
        return Err("datetime requires a column".into());
    };
    let mut m = Map::new();
    m.insert("column".into(), J::String(column.clone()));
    if !parts.is_empty() {
        m.insert("extract".into(), json!(parts));
    }
    Ok(J::Object(m))
}

fn date_trunc(args: &[String]) -> Built {
    match args {
        [column, level] => Ok(json!({ "column": column, "trunc": level })),
        [column, level, result, ..] => {
            Ok(json!({ "column": column, "trunc": level, "result": result }))
        }
        _ => Err("date-trunc requires a column and a level".into()),
    }
}

fn explode(args: &[String]) -> Built {
    match args {
        [] => Err("explode requires a column".into()),
        [column] => Ok(json!({ "column": column })),
        [column, delim, ..] => Ok(json!({ "column": column, "delimiter": delim })),
    }
}

fn split(args: &[String]) -> Built {
    match args {
        [column, delim, names @ ..] if !names.is_empty() => {
            Ok(json!({ "column": column, "delimiter": delim, "names": names }))
        }
        _ => Err("split requires a column, a delimiter and at least one name".into()),
    }
}

/// `group-agg by1,by2 col:func[:name] ...`. Tokens without `:` are group
/// columns.
fn group_agg(args: &[String]) -> Built {
    let mut group_by = Vec::new();
    let mut aggs = Vec::new();
    for tok in args {
        let mut parts = tok.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(column), Some(func), name) => {
                if column.is_empty() || func.is_empty() {
                    return Err(format!("group-agg: invalid aggregation '{tok}' (expected col:func)"));
                }
                let mut agg = Map::new();
                agg.insert("column".into(), J::from(column));
                agg.insert("func".into(), J::from(func));
                if let Some(name) = name.filter(|n| !n.is_empty()) {
                    agg.insert("name".into(), J::from(name));
                }
                aggs.push(J::Object(agg));
            }
            _ => group_by.push(tok.clone()),
        }
    }
    if aggs.is_empty() {
        return Err("group-agg requires at least one col:func aggregation".into());
    }
    Ok(json!({ "group_by": group_by, "aggs": aggs }))
}

fn step(args: &[String]) -> Built {
    match args {
        [column, func] => Ok(json!({ "column": column, "func": func })),
        [column, func, result] => Ok(json!({ "column": column, "func": func, "result": result })),
        [_, _, _, extra, ..] => Err(format!("step: unexpected argument '{extra}'")),
        _ => Err("step requires a column and a function".into()),
    }
}

/// Rejects tokens past the last positional a builder understands.
fn no_more(verb: &str, rest: &[String]) -> std::result::Result<(), String> {
    match rest.first() {
        Some(extra) => Err(format!("{verb}: unexpected argument '{extra}'")),
        None => Ok(()),
    }
}

fn window(args: &[String]) -> Built {
    let [column, size, func, rest @ ..] = args else {
        return Err("window requires a column, a size and a function".into());
    };
    let size = size
        .parse::<u64>()
        .map_err(|_| format!("window: invalid size '{size}'"))?;
    let mut m = Map::new();
    m.insert("column".into(), J::String(column.clone()));
    m.insert("size".into(), J::from(size));
    m.insert("func".into(), J::String(func.clone()));
    if let Some((result, extra)) = rest.split_first() {
        no_more("window", extra)?;
        m.insert("result".into(), J::String(result.clone()));
    }
    Ok(J::Object(m))
}

fn lead(args: &[String]) -> Built {
    numeric_then_result("lead", args, "offset", |t| t.parse::<u64>().ok().map(J::from))
}

/// `col [number] [result]`, where a non-numeric second token is the result.
fn numeric_then_result(
    verb: &str,
    args: &[String],
    key: &str,
    parse: impl Fn(&str) -> Option<J>,
) -> Built {
    let Some((column, rest)) = args.split_first() else {
        return Err(format!("{verb} requires a column name"));
    };
    let mut m = Map::new();
    m.insert("column".into(), J::String(column.clone()));
    match rest {
        [] => {}
        [second, tail @ ..] => match parse(second) {
            Some(n) => {
                m.insert(key.into(), n);
                if let Some((result, extra)) = tail.split_first() {
                    no_more(verb, extra)?;
                    m.insert("result".into(), J::String(result.clone()));
                }
            }
            None => {
                no_more(verb, tail)?;
                m.insert("result".into(), J::String(second.clone()));
            }
        },
    }
    Ok(J::Object(m))
}

fn column_then(verb: &str, args: &[String], key: &str) -> Built {
    let Some((column, rest)) = args.split_first() else {
        return Err(format!("{verb} requires a column name"));
    };
    let mut m = Map::new();
    m.insert("column".into(), J::String(column.clone()));
    if let Some((v, extra)) = rest.split_first() {
        no_more(verb, extra)?;
        m.insert(key.into(), J::String(v.clone()));
    }
    Ok(J::Object(m))
}

fn column_and_result(verb: &str, args: &[String]) -> Built {
    column_then(verb, args, "result")
}

/// `grep [-v] [-r|--regex] pattern`; `-rv` and `-vr` combine both flags.
fn grep(args: &[String]) -> Built {
    let mut invert = false;
    let mut regex = false;
    let mut i = 0;
    while let Some(flag) = args.get(i) {
        match flag.as_str() {
            "-v" => invert = true,
            "-r" | "--regex" => regex = true,
            "-rv" | "-vr" => {
                invert = true;
                regex = true;
            }
            _ => break,
        }
        i += 1;
    }
    let pattern = match &args[i..] {
        [] => return Err("grep requires a pattern argument".into()),
        [one] => one.clone(),
        many => many.join(" "),
    };
    Ok(json!({ "pattern": pattern, "invert": invert, "regex": regex }))
}

fn pivot(args: &[String]) -> Built {
    match args {
        [name, value] => Ok(json!({ "name_column": name, "value_column": value })),
        [name, value, agg, ..] => {
            Ok(json!({ "name_column": name, "value_column": value, "agg": agg }))
        }
        _ => Err("pivot requires a name column and a value column".into()),
    }
}

/// `join file on col[=lookup_col] [--left]`
fn join(args: &[String]) -> Built {
    let [file, on_kw, on, flags @ ..] = args else {
        return Err("join requires: file on column".into());
    };
    if on_kw != "on" {
        return Err(format!("join: expected 'on' after file name, got '{on_kw}'"));
    }
    let mut how = "inner";
    for flag in flags {
        match flag.as_str() {
            "--left" => how = "left",
            "--inner" => how = "inner",
            other => return Err(format!("join: unexpected argument '{other}'")),
        }
    }
    Ok(json!({ "file": file, "on": on, "how": how }))
}

/// `stack file [--tag name] [--tag-value v]`
fn stack(args: &[String]) -> Built {
    let Some((file, rest)) = args.split_first() else {
        return Err("stack requires a file".into());
    };
    let mut m = Map::new();
    m.insert("file".into(), J::String(file.clone()));
    let mut it = rest.iter();
    while let Some(flag) = it.next() {
        let key = match flag.as_str() {
            "--tag" => "tag",
            "--tag-value" => "tag_value",
            other => return Err(format!("stack: unexpected argument '{other}'")),
        };
        let value = it.next().ok_or_else(|| format!("stack: {flag} needs a value"))?;
        m.insert(key.into(), J::String(value.clone()));
    }
    Ok(J::Object(m))
}

fn onehot(args: &[String]) -> Built {
    let mut column = None;
    let mut drop = false;
    for tok in args {
        match tok.as_str() {
            "--drop" => drop = true,
            _ if column.is_none() => column = Some(tok.clone()),
            other => return Err(format!("onehot: unexpected argument '{other}'")),
        }
    }
    let column = column.ok_or("onehot requires a column")?;
    Ok(json!({ "column": column, "drop": drop }))
}

fn ewma(args: &[String]) -> Built {
    let [column, alpha, rest @ ..] = args else {
        return Err("ewma requires a column and alpha".into());
    };
    let alpha = number("ewma", "alpha", alpha)?;
    let mut m = Map::new();
    m.insert("column".into(), J::String(column.clone()));
    m.insert("alpha".into(), J::from(alpha));
    if let Some(result) = rest.first() {
        m.insert("result".into(), J::String(result.clone()));
    }
    Ok(J::Object(m))
}

/// `split-data [ratio] [seed=N | --seed N] [result=name | name]`
fn split_data(args: &[String]) -> Built {
    let mut m = Map::new();
    let mut it = args.iter().peekable();
    if let Some(ratio) = it.peek().and_then(|t| t.parse::<f64>().ok()) {
        m.insert("ratio".into(), J::from(ratio));
        it.next();
    }
    while let Some(tok) = it.next() {
        if let Some(seed) = tok.strip_prefix("seed=") {
            m.insert("seed".into(), J::from(count("split-data", seed)?));
        } else if tok == "--seed" {
            let seed = it.next().ok_or("split-data: --seed needs a value")?;
            m.insert("seed".into(), J::from(count("split-data", seed)?));
        } else {
            let name = tok.strip_prefix("result=").unwrap_or(tok);
            m.insert("result".into(), J::String(name.to_string()));
        }
    }
    Ok(J::Object(m))
}

const NORM_METHODS: &[&str] = &["minmax", "min-max", "zscore", "z-score"];

/// `normalize a,b [method]`; the comma list arrives already split, so a
/// trailing method name is recognized by value.
fn normalize(args: &[String]) -> Built {
    let (columns, method) = match args.split_last() {
        Some((last, cols)) if !cols.is_empty() && NORM_METHODS.contains(&last.as_str()) => {
            (cols, Some(last))
        }
        _ => (args, None),
    };
    if columns.is_empty() {
        return Err("normalize requires column names".into());
    }
    let mut m = Map::new();
    m.insert("columns".into(), json!(columns));
    if let Some(method) = method {
        m.insert("method".into(), J::String(method.clone()));
    }
    Ok(J::Object(m))
}

fn acf(args: &[String]) -> Built {
    match args {
        [] => Err("acf requires a column name".into()),
        [column] => Ok(json!({ "column": column })),
        [column, lags, ..] => Ok(json!({ "column": column, "lags": count("acf", lags)? })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::tokenize::{rest_after_verb, tokenize};

    fn args_of(stage: &str) -> Built {
        let tokens = tokenize(stage);
        let op = tokens[0].clone();
        build(
            &op,
            &StageArgs {
                args: &tokens[1..],
                rest: rest_after_verb(stage),
            },
        )
    }

    fn ok(stage: &str) -> J {
        args_of(stage).unwrap_or_else(|e| panic!("{stage}: {e}"))
    }

    #[test]
    fn codec_option_types() {
        assert_eq!(
            ok(r#"codec.csv.decode delimiter="\t" header=false batch-size=64"#),
            json!({ "delimiter": "\t", "header": false, "batch_size": 64 })
        );
        assert!(args_of("codec.csv.decode tab").is_err());
    }

    #[test]
    fn filter_takes_quoted_or_raw_text() {
        assert_eq!(ok(r#"filter "age > 25""#), json!({ "expr": "age > 25" }));
        assert_eq!(ok("filter age > 25 and x == 1"), json!({ "expr": "age > 25 and x == 1" }));
        assert_eq!(
            args_of("filter").expect_err("no expr"),
            "filter requires an expression argument"
        );
    }

    #[test]
    fn counts() {
        assert_eq!(ok("head 5"), json!({ "n": 5 }));
        assert_eq!(ok("head 0"), json!({ "n": 0 }));
        assert_eq!(args_of("head x").expect_err("bad"), "head: invalid count 'x'");
        assert_eq!(args_of("tail").expect_err("bad"), "tail requires a count argument");
        assert_eq!(ok("sample 10 seed=7"), json!({ "n": 10, "seed": 7 }));
    }

    #[test]
    fn mappings_and_derive() {
        assert_eq!(ok("rename a=b,c=d"), json!({ "mapping": { "a": "b", "c": "d" } }));
        assert_eq!(ok("cast age=int"), json!({ "mapping": { "age": "int" } }));
        assert!(args_of("rename a").expect_err("bad").contains("expected old=new"));

        assert_eq!(
            ok("derive total=price*qty tax=total * 0.2"),
            json!({ "columns": [
                { "name": "total", "expr": "price*qty" },
                { "name": "tax", "expr": "total * 0.2" }
            ]})
        );
        assert_eq!(
            ok(r#"derive flag="a == b""#),
            json!({ "columns": [{ "name": "flag", "expr": "a == b" }] })
        );
    }

    #[test]
    fn sort_and_top_directions() {
        assert_eq!(
            ok("sort -price,+name"),
            json!({ "columns": [
                { "name": "price", "desc": true },
                { "name": "name", "desc": false }
            ]})
        );
        assert_eq!(ok("top 3 score"), json!({ "n": 3, "column": "score", "desc": true }));
        assert_eq!(ok("top 3 +score"), json!({ "n": 3, "column": "score", "desc": false }));
    }

    #[test]
    fn group_agg_shapes() {
        assert_eq!(
            ok("group-agg region,year amount:sum qty:avg:mean_qty"),
            json!({
                "group_by": ["region", "year"],
                "aggs": [
                    { "column": "amount", "func": "sum" },
                    { "column": "qty", "func": "avg", "name": "mean_qty" }
                ]
            })
        );
        assert!(args_of("group-agg region").is_err());
    }

    #[test]
    fn flags() {
        assert_eq!(
            ok("grep -rv ^#"),
            json!({ "pattern": "^#", "invert": true, "regex": true })
        );
        assert_eq!(
            ok("replace --regex name \"a+\" b"),
            json!({ "column": "name", "pattern": "a+", "replacement": "b", "regex": true })
        );
        assert_eq!(
            ok("join lookup.csv on id=key --left"),
            json!({ "file": "lookup.csv", "on": "id=key", "how": "left" })
        );
        assert!(args_of("join lookup.csv id").expect_err("no on").contains("expected 'on'"));
        assert_eq!(
            ok("stack more.csv --tag src --tag-value extra"),
            json!({ "file": "more.csv", "tag": "src", "tag_value": "extra" })
        );
        assert_eq!(ok("onehot color --drop"), json!({ "column": "color", "drop": true }));
    }

    #[test]
    fn optional_positionals() {
        assert_eq!(ok("lead price 2 next"), json!({ "column": "price", "offset": 2, "result": "next" }));
        assert_eq!(ok("lead price next"), json!({ "column": "price", "result": "next" }));
        assert_eq!(ok("diff x 2"), json!({ "column": "x", "order": 2 }));
        assert_eq!(ok("anomaly x 2.5 flag"), json!({ "column": "x", "threshold": 2.5, "result": "flag" }));
        assert_eq!(
            ok("split-data 0.7 seed=1 result=part"),
            json!({ "ratio": 0.7, "seed": 1, "result": "part" })
        );
        assert_eq!(
            ok("normalize a,b zscore"),
            json!({ "columns": ["a", "b"], "method": "zscore" })
        );
        assert_eq!(ok("normalize a b"), json!({ "columns": ["a", "b"] }));
        assert_eq!(
            ok("window price 3 avg ma3"),
            json!({ "column": "price", "size": 3, "func": "avg", "result": "ma3" })
        );
        assert_eq!(ok("bin age 18,30"), json!({ "column": "age", "boundaries": [18.0, 30.0] }));
        assert_eq!(ok("clip x min=0 max=10"), json!({ "column": "x", "min": 0.0, "max": 10.0 }));
    }

    #[test]
    fn trailing_positionals_are_rejected() {
        assert_eq!(
            ok("step x running-sum total"),
            json!({ "column": "x", "func": "running-sum", "result": "total" })
        );
        assert_eq!(
            args_of("step x running-sum total junk").expect_err("extra"),
            "step: unexpected argument 'junk'"
        );
        assert_eq!(
            args_of("window price 3 avg ma3 junk").expect_err("extra"),
            "window: unexpected argument 'junk'"
        );
        assert_eq!(
            args_of("lead price 2 next junk").expect_err("extra"),
            "lead: unexpected argument 'junk'"
        );
        assert_eq!(
            args_of("lead price next junk").expect_err("extra"),
            "lead: unexpected argument 'junk'"
        );
        assert_eq!(
            args_of("interpolate x linear junk").expect_err("extra"),
            "interpolate: unexpected argument 'junk'"
        );
        assert!(args_of("label-encode color code").is_ok());
    }
}
