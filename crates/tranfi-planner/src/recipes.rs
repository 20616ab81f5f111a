//! Built-in named pipelines.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub name: &'static str,
    pub dsl: &'static str,
    pub description: &'static str,
}

const fn recipe(name: &'static str, dsl: &'static str, description: &'static str) -> Recipe {
    Recipe {
        name,
        dsl,
        description,
    }
}

static RECIPES: &[Recipe] = &[
    recipe(
        "profile",
        "csv | stats count,sum,avg,min,max,var,stddev,median,p25,p75,skewness,kurtosis,distinct,hist,sample | csv",
        "Full data profiling (all statistics per column)",
    ),
    recipe("preview", "csv | head 10 | csv", "Quick preview of first 10 rows"),
    recipe("schema", "csv | head 0 | csv", "Show column names only"),
    recipe(
        "summary",
        "csv | stats count,min,max,avg,stddev | csv",
        "Summary statistics",
    ),
    recipe("count", "csv | stats count | csv", "Row count per column"),
    recipe(
        "cardinality",
        "csv | stats count,distinct | csv",
        "Unique value counts per column",
    ),
    recipe(
        "distro",
        "csv | stats min,p25,median,p75,max | csv",
        "Five-number summary (quartiles)",
    ),
    recipe("freq", "csv | frequency | csv", "Value frequency distribution"),
    recipe("dedup", "csv | dedup | csv", "Remove duplicate rows"),
    recipe("clean", "csv | trim | csv", "Trim whitespace from all columns"),
    recipe("sample", "csv | sample 100 | csv", "Random sample of 100 rows"),
    recipe("head", "csv | head 20 | csv", "First 20 rows"),
    recipe("tail", "csv | tail 20 | csv", "Last 20 rows"),
    recipe("csv2json", "csv | jsonl", "Convert CSV to JSONL"),
    recipe("json2csv", "jsonl | csv", "Convert JSONL to CSV"),
    recipe("tsv2csv", r#"csv delimiter="\t" | csv"#, "Convert TSV to CSV"),
    recipe("csv2tsv", r#"csv | csv delimiter="\t""#, "Convert CSV to TSV"),
    recipe("look", "csv | table", "Pretty-print as Markdown table"),
    recipe("histogram", "csv | stats hist | csv", "Distribution histograms"),
    recipe("hash", "csv | hash | csv", "Add row hash column for change detection"),
    recipe("samples", "csv | stats sample | csv", "Show sample values per column"),
];

static BY_NAME: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    RECIPES
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.to_ascii_lowercase(), i))
        .collect()
});

pub fn recipes() -> &'static [Recipe] {
    RECIPES
}

pub fn recipe_count() -> usize {
    RECIPES.len()
}

pub fn recipe_by_index(i: usize) -> Option<&'static Recipe> {
    RECIPES.get(i)
}

/// Case-insensitive.
pub fn recipe_by_name(name: &str) -> Option<&'static Recipe> {
    BY_NAME
        .get(&name.to_ascii_lowercase())
        .and_then(|&i| RECIPES.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::compile_dsl;

    #[test]
    fn lookup() {
        assert_eq!(recipe_count(), 21);
        assert_eq!(recipe_by_index(0).map(|r| r.name), Some("profile"));
        assert!(recipe_by_index(21).is_none());
        assert_eq!(recipe_by_name("CSV2JSON").map(|r| r.dsl), Some("csv | jsonl"));
        assert!(recipe_by_name("nope").is_none());
    }

    #[test]
    fn every_recipe_compiles() {
        for r in recipes() {
            compile_dsl(r.dsl).unwrap_or_else(|e| panic!("recipe {}: {e}", r.name));
        }
    }
}
