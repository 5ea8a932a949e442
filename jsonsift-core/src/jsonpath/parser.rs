//! Recursive-descent parser turning query text into a [`Path`].

use serde_json::Value;

use super::ast::{CompareOp, Expr, Operand, Path, RelativePath, Step};
use crate::query::QueryError;

/// Parses a JSONPath query.
///
/// The whole input must be consumed; trailing characters are an error rather
/// than being silently dropped.
pub fn parse(query: &str) -> Result<Path, QueryError> {
    let mut cursor = Cursor::new(query);
    let path = cursor.path().map_err(|reason| QueryError::invalid(query, reason))?;
    cursor.skip_whitespace();
    match cursor.peek() {
        None => Ok(path),
        Some(c) => Err(QueryError::invalid(
            query,
            format!("unexpected '{c}' at offset {}", cursor.pos),
        )),
    }
}

type ParseResult<T> = Result<T, String>;

/// Deepest filter expression accepted, counting `!`, parentheses and every
/// chained `&&` or `||`.
const MAX_FILTER_DEPTH: usize = 64;

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn nest(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(format!(
                "filter nested deeper than {MAX_FILTER_DEPTH} levels at offset {}",
                self.pos
            ));
        }
        Ok(())
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(format!(
                "expected '{expected}' at offset {}, found '{c}'",
                self.pos
            )),
            None => Err(format!("expected '{expected}', found end of query")),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn path(&mut self) -> ParseResult<Path> {
        self.skip_whitespace();
        self.expect('$')?;

        let mut steps = Vec::new();
        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    steps.push(self.dotted()?);
                }
                Some('[') => steps.push(self.bracketed()?),
                _ => break,
            }
        }
        Ok(Path::new(steps))
    }

    /// Everything after a `.`: a name, `*`, or a descendant step after `..`.
    fn dotted(&mut self) -> ParseResult<Step> {
        if self.eat('.') {
            if self.eat('*') {
                return Ok(Step::DescendantAll);
            }
            if self.peek() == Some('[') {
                return match self.bracketed()? {
                    Step::Member(name) => Ok(Step::DescendantMember(name)),
                    Step::Wildcard => Ok(Step::DescendantAll),
                    _ => Err("only names and '*' may follow '..'".to_owned()),
                };
            }
            return self.identifier().map(Step::DescendantMember);
        }
        if self.eat('*') {
            return Ok(Step::Wildcard);
        }
        self.identifier().map(Step::Member)
    }

    fn identifier(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(format!("expected a member name at offset {start}"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn bracketed(&mut self) -> ParseResult<Step> {
        self.expect('[')?;
        self.skip_whitespace();

        let step = match self.peek() {
            Some('*') => {
                self.bump();
                Step::Wildcard
            }
            Some('?') => {
                self.bump();
                Step::Filter(self.or_expr()?)
            }
            Some('\'' | '"') => Step::Member(self.quoted()?),
            _ => self.index_or_slice()?,
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(step)
    }

    fn index_or_slice(&mut self) -> ParseResult<Step> {
        let start = self.integer()?;
        self.skip_whitespace();
        if !self.eat(':') {
            return start
                .map(Step::Index)
                .ok_or_else(|| format!("expected an index at offset {}", self.pos));
        }

        let end = self.integer()?;
        self.skip_whitespace();
        let step = if self.eat(':') { self.integer()? } else { None };
        if step == Some(0) {
            return Err("slice step cannot be zero".to_owned());
        }
        Ok(Step::Slice { start, end, step })
    }

    fn integer(&mut self) -> ParseResult<Option<i64>> {
        self.skip_whitespace();
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        match &self.input[start..self.pos] {
            "" => Ok(None),
            "-" => Err(format!("dangling '-' at offset {start}")),
            digits => digits
                .parse()
                .map(Some)
                .map_err(|e| format!("bad integer `{digits}`: {e}")),
        }
    }

    fn quoted(&mut self) -> ParseResult<String> {
        let quote = self
            .bump()
            .ok_or_else(|| "expected a quoted string".to_owned())?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_owned()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err("unterminated escape".to_owned()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    // Filter grammar, loosest binding first:
    //   or   := and ( "||" and )*
    //   and  := unary ( "&&" unary )*
    //   unary := "!" unary | "(" or ")" | comparison

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = self.and_expr()?;
        loop {
            self.skip_whitespace();
            if !self.eat_str("||") {
                self.depth = depth;
                return Ok(expr);
            }
            self.nest()?;
            let rhs = self.and_expr()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = self.unary()?;
        loop {
            self.skip_whitespace();
            if !self.eat_str("&&") {
                self.depth = depth;
                return Ok(expr);
            }
            self.nest()?;
            let rhs = self.unary()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();
        if self.peek() == Some('!') && !self.rest().starts_with("!=") {
            self.bump();
            self.nest()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.eat('(') {
            self.nest()?;
            let expr = self.or_expr()?;
            self.skip_whitespace();
            self.expect(')')?;
            self.depth -= 1;
            return Ok(expr);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let lhs = self.operand()?;
        self.skip_whitespace();

        let op = CompareOp::ALL
            .iter()
            .find(|(symbol, _)| self.rest().starts_with(symbol))
            .map(|(symbol, op)| (symbol.len(), *op));

        match (op, lhs) {
            (Some((len, op)), lhs) => {
                self.pos += len;
                let rhs = self.operand()?;
                Ok(Expr::Compare { lhs, op, rhs })
            }
            (None, Operand::Current(path)) => Ok(Expr::Exists(path)),
            (None, Operand::Literal(_)) => {
                Err(format!("expected a comparison operator at offset {}", self.pos))
            }
        }
    }

    fn operand(&mut self) -> ParseResult<Operand> {
        self.skip_whitespace();
        match self.peek() {
            Some('@') => {
                self.bump();
                self.relative_path().map(Operand::Current)
            }
            Some('\'' | '"') => self.quoted().map(|s| Operand::Literal(Value::String(s))),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number().map(Operand::Literal),
            _ if self.eat_str("true") => Ok(Operand::Literal(Value::Bool(true))),
            _ if self.eat_str("false") => Ok(Operand::Literal(Value::Bool(false))),
            _ if self.eat_str("null") => Ok(Operand::Literal(Value::Null)),
            _ => Err(format!("expected a filter operand at offset {}", self.pos)),
        }
    }

    fn relative_path(&mut self) -> ParseResult<RelativePath> {
        let mut members = Vec::new();
        loop {
            if self.eat('.') {
                members.push(self.identifier()?);
            } else if self.rest().starts_with("['") || self.rest().starts_with("[\"") {
                self.bump();
                members.push(self.quoted()?);
                self.expect(']')?;
            } else {
                return Ok(RelativePath { members });
            }
        }
    }

    fn number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.bump();
        }
        let text = &self.input[start..self.pos];
        serde_json::from_str::<serde_json::Number>(text)
            .map(Value::Number)
            .map_err(|_| format!("bad number `{text}`"))
    }
}
