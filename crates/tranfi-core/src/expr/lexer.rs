//! Tokenizer for the expression language.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            ',' => {
                out.push(Token::Comma);
                i += 1;
            }
            '\'' | '"' => {
                let (s, next) = read_string(&chars, i)?;
                out.push(Token::Str(s));
                i = next;
            }
            c if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
                || (c == '-'
                    && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())
                    && !ends_operand(out.last())) =>
            {
                let (tok, next) = read_number(&chars, i)?;
                out.push(tok);
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                out.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let op = match two.as_str() {
                    "==" => Some("=="),
                    "!=" | "<>" => Some("!="),
                    "<=" => Some("<="),
                    ">=" => Some(">="),
                    "&&" => Some("and"),
                    "||" => Some("or"),
                    _ => None,
                };
                if let Some(op) = op {
                    out.push(Token::Op(op));
                    i += 2;
                    continue;
                }
                let op = match c {
                    '=' => "==",
                    '<' => "<",
                    '>' => ">",
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    '%' => "%",
                    '!' => "not",
                    other => {
                        return Err(Error::Expr(format!(
                            "unexpected character '{other}' at offset {i}"
                        )))
                    }
                };
                out.push(Token::Op(op));
                i += 1;
            }
        }
    }
    Ok(out)
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let mut s = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            s.push(match chars[i + 1] {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            i += 2;
            continue;
        }
        if c == quote {
            // doubled quote is an escaped quote
            if chars.get(i + 1) == Some(&quote) {
                s.push(quote);
                i += 2;
                continue;
            }
            return Ok((s, i + 1));
        }
        s.push(c);
        i += 1;
    }
    Err(Error::Expr("unterminated string literal".into()))
}

/// Whether `tok` can end an operand, making a following `-` binary.
fn ends_operand(tok: Option<&Token>) -> bool {
    match tok {
        Some(Token::Int(_) | Token::Float(_) | Token::Str(_) | Token::RParen) => true,
        Some(Token::Ident(word)) => !matches!(
            word.to_ascii_lowercase().as_str(),
            "and" | "or" | "not"
        ),
        _ => false,
    }
}

/// A leading `-` is part of the literal, so `-9223372036854775808` stays an Int.
fn read_number(chars: &[char], start: usize) -> Result<(Token, usize)> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    let mut is_float = false;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            i += 1;
        } else if c == '.' && !is_float {
            is_float = true;
            i += 1;
        } else if (c == 'e' || c == 'E')
            && chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+')
        {
            is_float = true;
            i += 2;
        } else {
            break;
        }
    }
    let text: String = chars[start..i].iter().collect();
    let tok = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| Error::Expr(format!("bad number '{text}'")))?,
        )
    } else {
        match text.parse::<i64>() {
            Ok(v) => Token::Int(v),
            Err(_) => Token::Float(
                text.parse()
                    .map_err(|_| Error::Expr(format!("bad number '{text}'")))?,
            ),
        }
    };
    Ok((tok, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_comparison() {
        let toks = tokenize("age >= 25 and name != 'O''Neil'").expect("tokens");
        assert_eq!(
            toks,
            vec![
                Token::Ident("age".into()),
                Token::Op(">="),
                Token::Int(25),
                Token::Ident("and".into()),
                Token::Ident("name".into()),
                Token::Op("!="),
                Token::Str("O'Neil".into()),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(tokenize("1.5e3").expect("t"), vec![Token::Float(1500.0)]);
        assert_eq!(tokenize(".5").expect("t"), vec![Token::Float(0.5)]);
    }

    #[test]
    fn negative_literals() {
        assert_eq!(
            tokenize("-9223372036854775808").expect("t"),
            vec![Token::Int(i64::MIN)]
        );
        assert_eq!(
            tokenize("a-1").expect("t"),
            vec![Token::Ident("a".into()), Token::Op("-"), Token::Int(1)]
        );
        assert_eq!(
            tokenize("x > -2.5 and -3 < y").expect("t"),
            vec![
                Token::Ident("x".into()),
                Token::Op(">"),
                Token::Float(-2.5),
                Token::Ident("and".into()),
                Token::Int(-3),
                Token::Op("<"),
                Token::Ident("y".into()),
            ]
        );
        assert_eq!(
            tokenize("(1)-2").expect("t"),
            vec![Token::LParen, Token::Int(1), Token::RParen, Token::Op("-"), Token::Int(2)]
        );
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(tokenize("a # b").is_err());
        assert!(tokenize("'open").is_err());
    }
}
