//! Operators that read a second table from disk: `stack` and `join`.
//!
//! Both load through `tranfi_io::lookup::read_table`, which picks a decoder by
//! file extension. Decode problems in the side file go to the error channel
//! under the operator's name.

use std::collections::HashMap;

use tranfi_core::dag::{JoinArgs, JoinHow, StackArgs};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::{OpError, Result};
use crate::operator::Transform;

fn load(op: &'static str, file: &str, errors: &mut Vec<RowError>) -> Result<Vec<Row>> {
    let (rows, errs) = tranfi_io::lookup::read_table(file).map_err(|source| OpError::Lookup {
        op,
        path: file.to_string(),
        source,
    })?;
    errors.extend(errs.into_iter().map(|mut e| {
        e.message = format!("{}: {}", file, e.message);
        e.op = op.to_string();
        e
    }));
    Ok(rows)
}

/// Appends the rows of another file after the primary stream.
pub struct Stack {
    args: StackArgs,
}

impl Stack {
    pub fn new(args: StackArgs) -> Self {
        Self { args }
    }
}

impl Transform for Stack {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        match &self.args.tag {
            Some(tag) => out.extend(rows.into_iter().map(|mut row| {
                row.set(tag.as_str(), Value::from("input"));
                row
            })),
            None => out.extend(rows),
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        let rows = load("stack", &self.args.file, errors)?;
        let label = self.args.tag_value.as_deref().unwrap_or(&self.args.file);
        for mut row in rows {
            if let Some(tag) = &self.args.tag {
                row.set(tag.as_str(), Value::from(label));
            }
            out.push(row);
        }
        Ok(())
    }
}

struct LookupTable {
    /// Every lookup column other than the key, across all lookup rows, with
    /// its `_right` name for rows where the primary side already has it.
    columns: Vec<(String, String)>,
    by_key: HashMap<String, Vec<Row>>,
}

impl LookupTable {
    /// Output names for one primary row. A lookup column takes `_right` only
    /// when that row has a column of the same name.
    fn names_for<'a>(&'a self, left: &Row) -> Vec<(&'a str, &'a str)> {
        self.columns
            .iter()
            .map(|(src, suffixed)| {
                let name = if left.contains(src) { suffixed } else { src };
                (src.as_str(), name.as_str())
            })
            .collect()
    }
}

/// Hash join against a file loaded in full on first use.
pub struct Join {
    args: JoinArgs,
    table: Option<LookupTable>,
}

impl Join {
    pub fn new(args: JoinArgs) -> Self {
        Self { args, table: None }
    }

    fn build(&self, errors: &mut Vec<RowError>) -> Result<LookupTable> {
        let (_, right_key) = self.args.keys();
        let rows = load("join", &self.args.file, errors)?;

        let mut columns: Vec<(String, String)> = Vec::new();
        let mut by_key: HashMap<String, Vec<Row>> = HashMap::new();
        for row in rows {
            for name in row.columns() {
                if name != right_key && !columns.iter().any(|(c, _)| c == name) {
                    columns.push((name.to_string(), format!("{name}_right")));
                }
            }
            let key = row.value(right_key);
            if key.is_null() {
                continue;
            }
            by_key.entry(key.to_text()).or_default().push(row);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(file = %self.args.file, keys = by_key.len(), "join table built");

        Ok(LookupTable { columns, by_key })
    }
}

impl Transform for Join {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        if self.table.is_none() {
            self.table = Some(self.build(errors)?);
        }
        let Some(table) = &self.table else {
            return Ok(());
        };

        let (left_key, _) = self.args.keys();
        for row in rows {
            let key = row.value(left_key);
            let matches = if key.is_null() {
                None
            } else {
                table.by_key.get(&key.to_text())
            };
            match matches {
                Some(hits) => {
                    let names = table.names_for(&row);
                    for hit in hits {
                        let mut joined = row.clone();
                        for (src, name) in &names {
                            joined.set(*name, hit.value(src).clone());
                        }
                        out.push(joined);
                    }
                }
                None if self.args.how == JoinHow::Left => {
                    let names: Vec<String> =
                        table.names_for(&row).into_iter().map(|(_, n)| n.to_string()).collect();
                    let mut joined = row;
                    for name in names {
                        joined.set(name, Value::Null);
                    }
                    out.push(joined);
                }
                None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{column, mk_row, run};

    fn people() -> Vec<Row> {
        vec![
            mk_row(&[("name", Value::from("Alice")), ("city_id", Value::Int(1))]),
            mk_row(&[("name", Value::from("Bob")), ("city_id", Value::Int(3))]),
            mk_row(&[("name", Value::from("Carol")), ("city_id", Value::Int(2))]),
        ]
    }

    fn lookup_file(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("cities.csv");
        std::fs::write(&path, "id,name,country\n1,Paris,FR\n2,Berlin,DE\n").expect("write");
        path.display().to_string()
    }

    #[test]
    fn inner_and_left_join() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = lookup_file(&dir);
        let args = |how| JoinArgs {
            file: file.clone(),
            on: "city_id=id".into(),
            how,
        };

        let (out, errs) = run(&mut Join::new(args(JoinHow::Inner)), people());
        assert!(errs.is_empty());
        assert_eq!(column(&out, "name"), vec![Value::from("Alice"), Value::from("Carol")]);
        assert_eq!(
            out[0].columns().collect::<Vec<_>>(),
            vec!["name", "city_id", "name_right", "country"]
        );
        assert_eq!(out[1].value("name_right"), &Value::from("Berlin"));

        let (out, _) = run(&mut Join::new(args(JoinHow::Left)), people());
        assert_eq!(out.len(), 3);
        assert!(out[1].value("country").is_null());
    }

    #[test]
    fn collisions_follow_each_primary_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cities.jsonl");
        std::fs::write(
            &path,
            "{\"id\":1,\"city\":\"Rome\"}\n{\"id\":2,\"zone\":\"B\",\"city\":\"Oslo\"}\n",
        )
        .expect("write");
        let rows = vec![
            mk_row(&[("id", Value::Int(1))]),
            mk_row(&[("id", Value::Int(2)), ("city", Value::from("own"))]),
            mk_row(&[("id", Value::Int(1)), ("zone", Value::from("A"))]),
        ];
        let mut j = Join::new(JoinArgs {
            file: path.display().to_string(),
            on: "id".into(),
            how: JoinHow::Left,
        });
        let (out, _) = run(&mut j, rows);
        assert_eq!(out[0].columns().collect::<Vec<_>>(), vec!["id", "city", "zone"]);
        assert_eq!(out[0].value("city"), &Value::from("Rome"));
        assert!(out[0].value("zone").is_null());

        assert_eq!(out[1].value("city"), &Value::from("own"));
        assert_eq!(out[1].value("city_right"), &Value::from("Oslo"));
        assert_eq!(out[1].value("zone"), &Value::from("B"));

        assert_eq!(out[2].value("zone"), &Value::from("A"));
        assert!(out[2].value("zone_right").is_null());
        assert_eq!(out[2].value("city"), &Value::from("Rome"));
    }

    #[test]
    fn missing_lookup_file_is_an_error() {
        let mut j = Join::new(JoinArgs {
            file: "/nonexistent/lookup.csv".into(),
            on: "id".into(),
            how: JoinHow::Inner,
        });
        let mut out = Vec::new();
        let mut errs = Vec::new();
        let err = j
            .process(people(), &mut out, &mut errs)
            .expect_err("missing file");
        assert!(matches!(err, OpError::Lookup { op: "join", .. }));
    }

    #[test]
    fn stack_appends_tagged_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("more.jsonl");
        std::fs::write(&path, "{\"name\":\"Dan\",\"city_id\":4}\n").expect("write");
        let mut s = Stack::new(StackArgs {
            file: path.display().to_string(),
            tag: Some("src".into()),
            tag_value: Some("extra".into()),
        });
        let (out, _) = run(&mut s, people());
        assert_eq!(out.len(), 4);
        assert_eq!(
            column(&out, "src"),
            vec![
                Value::from("input"),
                Value::from("input"),
                Value::from("input"),
                Value::from("extra")
            ]
        );
        assert_eq!(out[3].value("name"), &Value::from("Dan"));
    }
}
