//! Stage splitting and tokenization.
//!
//! Only double quotes group text. A quoted run may sit inside a token
//! (`key="a b"` becomes the single token `key=a b`). A bare token holding
//! commas but no `=` expands into one token per non-empty piece, so
//! `select a,b c` and `select a b c` mean the same thing.

use crate::error::{CompileError, Result};

/// Split on `|` outside double quotes. Every stage is trimmed; an empty one is
/// an error.
pub fn split_stages(src: &str) -> Result<Vec<&str>> {
    let mut stages = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in src.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '|' if !in_quote => {
                stages.push(&src[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    stages.push(&src[start..]);

    stages
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let s = s.trim();
            if s.is_empty() {
                Err(CompileError::EmptyStage(i))
            } else {
                Ok(s)
            }
        })
        .collect()
}

pub fn tokenize(stage: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = stage.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut tok = String::new();
        let mut quoted = false;
        let mut in_quote = false;
        while let Some(&c) = chars.peek() {
            if c == '"' {
                in_quote = !in_quote;
                quoted = true;
            } else if c.is_whitespace() && !in_quote {
                break;
            } else {
                tok.push(c);
            }
            chars.next();
        }

        if !quoted && tok.contains(',') && !tok.contains('=') {
            tokens.extend(
                tok.split(',')
                    .filter(|p| !p.is_empty())
                    .map(String::from),
            );
        } else {
            tokens.push(tok);
        }
    }
    tokens
}

/// Everything after the verb, untokenized.
pub fn rest_after_verb(stage: &str) -> &str {
    stage
        .trim()
        .split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest.trim())
}
