//! The subset of RQL understood by [`InMemoryServer`](crate::InMemoryServer).
//!
//! ```text
//! from 'Users' | from index 'Users/ByName'
//!   [where <expr>] [order by field [desc], ...]
//!
//! expr    := and ("or" and)*
//! and     := primary ("and" primary)*
//! primary := "not" primary | "(" expr ")" | startsWith(field, $p) | field in ($p) | field <op> $p
//! ```

use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Param(String),
    Op(String),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QuerySource {
    Collection(String),
    Index(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        field: String,
        op: CompareOp,
        param: String,
    },
    In {
        field: String,
        param: String,
    },
    StartsWith {
        field: String,
        param: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedQuery {
    pub source: QuerySource,
    pub filter: Option<Expr>,
    /// `(field, descending)`
    pub order_by: Vec<(String, bool)>,
}

fn tokenize(rql: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = rql.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => text.push(escaped),
                            None => return Err("unterminated string".into()),
                        },
                        Some(ch) if ch == quote => break,
                        Some(ch) => text.push(ch),
                        None => return Err("unterminated string".into()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err("expected parameter name after '$'".into());
                }
                tokens.push(Token::Param(name));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let mut op = c.to_string();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    op.push('=');
                }
                if op == "!" {
                    return Err("expected '=' after '!'".into());
                }
                tokens.push(Token::Op(op));
            }
            c if c.is_alphanumeric() || c == '_' || c == '@' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || matches!(ch, '_' | '@' | '.' | '/' | '-') {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected '{keyword}', found {:?}", self.peek()))
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(format!("expected {expected:?}, found {other:?}")),
        }
    }

    fn name(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(name)) | Some(Token::Str(name)) => Ok(name),
            other => Err(format!("expected a name, found {other:?}")),
        }
    }

    fn param(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Param(name)) => Ok(name),
            other => Err(format!("expected a parameter, found {other:?}")),
        }
    }

    fn query(&mut self) -> Result<ParsedQuery, String> {
        self.expect_keyword("from")?;
        let source = if self.peek_keyword("index")
            && matches!(
                self.tokens.get(self.position + 1),
                Some(Token::Str(_)) | Some(Token::Ident(_))
            ) {
            self.position += 1;
            QuerySource::Index(self.name()?)
        } else {
            QuerySource::Collection(self.name()?)
        };

        let filter = if self.eat_keyword("where") {
            Some(self.or_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let field = self.name()?;
                let descending = if self.eat_keyword("desc") {
                    true
                } else {
                    self.eat_keyword("asc");
                    false
                };
                order_by.push((field, descending));
                if self.peek() == Some(&Token::Comma) {
                    self.position += 1;
                } else {
                    break;
                }
            }
        }

        if let Some(token) = self.peek() {
            return Err(format!("unexpected token {token:?}"));
        }

        Ok(ParsedQuery {
            source,
            filter,
            order_by,
        })
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.and_expr()?];
        while self.eat_keyword("or") {
            terms.push(self.and_expr()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.primary()?];
        while self.eat_keyword("and") {
            terms.push(self.primary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn primary(&mut self) -> Result<Expr, String> {
        // `not` is a keyword unless it names a compared field.
        let names_field = match self.tokens.get(self.position + 1) {
            None | Some(Token::Op(_)) => true,
            Some(Token::Ident(next)) => next.eq_ignore_ascii_case("in"),
            _ => false,
        };
        if self.peek_keyword("not") && !names_field {
            self.position += 1;
            return Ok(Expr::Not(Box::new(self.primary()?)));
        }

        if self.peek() == Some(&Token::LParen) {
            self.position += 1;
            let expr = self.or_expr()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }

        if self.peek_keyword("startsWith") && self.tokens.get(self.position + 1) == Some(&Token::LParen)
        {
            self.position += 2;
            let field = self.name()?;
            self.expect(Token::Comma)?;
            let param = self.param()?;
            self.expect(Token::RParen)?;
            return Ok(Expr::StartsWith { field, param });
        }

        let field = self.name()?;
        if self.eat_keyword("in") {
            self.expect(Token::LParen)?;
            let param = self.param()?;
            self.expect(Token::RParen)?;
            return Ok(Expr::In { field, param });
        }

        let op = match self.next() {
            Some(Token::Op(op)) => match op.as_str() {
                "=" => CompareOp::Eq,
                "!=" => CompareOp::NotEq,
                ">" => CompareOp::Gt,
                ">=" => CompareOp::Gte,
                "<" => CompareOp::Lt,
                "<=" => CompareOp::Lte,
                other => return Err(format!("unknown operator '{other}'")),
            },
            other => return Err(format!("expected an operator, found {other:?}")),
        };
        let param = self.param()?;
        Ok(Expr::Compare { field, op, param })
    }
}

/// Parses an RQL query.
pub(crate) fn parse(rql: &str) -> Result<ParsedQuery, String> {
    let tokens = tokenize(rql)?;
    Parser {
        tokens,
        position: 0,
    }
    .query()
}

static NULL: Value = Value::Null;

/// Reads a dotted path from a document.
pub(crate) fn field_value<'a>(document: &'a Map<String, Value>, path: &str) -> &'a Value {
    let mut parts = path.split('.');
    let first = parts.next().and_then(|p| document.get(p));
    parts
        .fold(first, |current, part| current.and_then(|v| v.get(part)))
        .unwrap_or(&NULL)
}

/// Orders two JSON values. Strings compare case-insensitively.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

impl Expr {
    /// Evaluates the expression against a document.
    pub(crate) fn matches(&self, document: &Map<String, Value>, params: &Map<String, Value>) -> bool {
        let param = |name: &str| params.get(name).unwrap_or(&NULL);
        match self {
            Expr::Or(terms) => terms.iter().any(|t| t.matches(document, params)),
            Expr::And(terms) => terms.iter().all(|t| t.matches(document, params)),
            Expr::Not(inner) => !inner.matches(document, params),
            Expr::Compare { field, op, param: p } => {
                let ordering = compare_values(field_value(document, field), param(p));
                match op {
                    CompareOp::Eq => ordering == Some(Ordering::Equal),
                    CompareOp::NotEq => ordering != Some(Ordering::Equal),
                    CompareOp::Gt => ordering == Some(Ordering::Greater),
                    CompareOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                    CompareOp::Lt => ordering == Some(Ordering::Less),
                    CompareOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                }
            }
            Expr::In { field, param: p } => {
                let value = field_value(document, field);
                match param(p) {
                    Value::Array(candidates) => candidates
                        .iter()
                        .any(|c| compare_values(value, c) == Some(Ordering::Equal)),
                    single => compare_values(value, single) == Some(Ordering::Equal),
                }
            }
            Expr::StartsWith { field, param: p } => {
                match (field_value(document, field), param(p)) {
                    (Value::String(value), Value::String(prefix)) => {
                        value.to_lowercase().starts_with(&prefix.to_lowercase())
                    }
                    _ => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_collection_query() {
        let parsed = parse("from 'Users' where name = $p0 or age > $p1 order by age desc, name").unwrap();
        assert_eq!(parsed.source, QuerySource::Collection("Users".into()));
        assert!(matches!(parsed.filter, Some(Expr::Or(ref terms)) if terms.len() == 2));
        assert_eq!(
            parsed.order_by,
            vec![("age".to_string(), true), ("name".to_string(), false)]
        );
    }

    #[test]
    fn parses_index_query() {
        let parsed = parse("from index 'Users/ByName' where startsWith(name, $p0)").unwrap();
        assert_eq!(parsed.source, QuerySource::Index("Users/ByName".into()));

        // A collection literally named "index".
        let parsed = parse("from index").unwrap();
        assert_eq!(parsed.source, QuerySource::Collection("index".into()));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("select * from users").is_err());
        assert!(parse("from 'Users' where name = 'literal'").is_err());
        assert!(parse("from 'Users' where name = $p0 extra").is_err());
        assert!(parse("from 'Users").is_err());
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let parsed = parse("from Users where a = $p0 or b = $p1 and c = $p2").unwrap();
        let filter = parsed.filter.unwrap();
        let params = doc(json!({ "p0": 1, "p1": 2, "p2": 3 }));

        assert!(filter.matches(&doc(json!({ "a": 1 })), &params));
        assert!(!filter.matches(&doc(json!({ "b": 2, "c": 4 })), &params));
        assert!(filter.matches(&doc(json!({ "b": 2, "c": 3 })), &params));
    }

    #[test]
    fn evaluates_operators() {
        let user = doc(json!({ "name": "Alice", "age": 31, "address": { "city": "Oslo" } }));
        let params = doc(json!({
            "p0": "alice",
            "p1": 30,
            "p2": ["Bergen", "oslo"],
            "p3": "Al",
        }));

        let check = |rql: &str| parse(rql).unwrap().filter.unwrap().matches(&user, &params);
        assert!(check("from Users where name = $p0"));
        assert!(check("from Users where age > $p1"));
        assert!(check("from Users where age >= $p1"));
        assert!(!check("from Users where age <= $p1"));
        assert!(check("from Users where address.city in ($p2)"));
        assert!(check("from Users where startsWith(name, $p3)"));
        assert!(check("from Users where (name != $p3 and age < $p9) or age > $p1"));
        assert!(!check("from Users where missing = $p0"));
    }

    #[test]
    fn not_negates_the_next_term() {
        let params = doc(json!({ "p0": "Ann", "p1": 30 }));
        let filter = parse("from Users where age > $p1 and not name = $p0")
            .unwrap()
            .filter
            .unwrap();
        assert!(matches!(filter, Expr::And(ref terms) if matches!(terms[1], Expr::Not(_))));

        assert!(filter.matches(&doc(json!({ "name": "Bob", "age": 40 })), &params));
        assert!(!filter.matches(&doc(json!({ "name": "Ann", "age": 40 })), &params));

        let negated_group = parse("from Users where not (name = $p0 or age > $p1)")
            .unwrap()
            .filter
            .unwrap();
        assert!(negated_group.matches(&doc(json!({ "name": "Bob", "age": 20 })), &params));

        // A field called `not` still parses as a comparison.
        let field = parse("from Users where not = $p0").unwrap().filter.unwrap();
        assert!(field.matches(&doc(json!({ "not": "Ann" })), &params));
    }
}
