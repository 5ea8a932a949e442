//! jq evaluation backed by [`jaq`](https://github.com/01mf02/jaq).

use jaq_core::{
    Compiler, Ctx, Filter, Native, RcIter,
    load::{Arena, File, Loader},
};
use jaq_json::Val;
use serde_json::Value;

use crate::query::{QueryError, QueryEvaluator};

/// Longest program accepted, in bytes.
const MAX_PROGRAM_LEN: usize = 4096;

/// Deepest bracket or string interpolation nesting accepted.
const MAX_NESTING: usize = 64;

/// Builtins that never terminate, or run for as long as the caller likes,
/// on any input. Also the ones that reach outside the document.
const REJECTED_BUILTINS: &[&str] = &[
    "repeat",
    "while",
    "until",
    "range",
    "combinations",
    "input",
    "inputs",
    "env",
    "debug",
    "stderr",
    "halt",
    "halt_error",
];

/// jq [`QueryEvaluator`].
///
/// The query is compiled with the jq standard library on every call. A
/// single output is returned as is, several outputs are collected into an
/// array. A program that yields nothing, or only `null`, matched nothing.
///
/// jq is Turing complete, so programs are screened before compilation:
/// function definitions (`def`), `recurse(f)`, unbounded generators such as
/// `repeat`, `range` and `while`, and access to the environment are refused,
/// and so are programs longer than 4096 bytes or nested more than 64 levels
/// deep. The screen blocks the known
/// ways to loop forever or exhaust the stack, not every expensive program,
/// so only expose jq to callers you trust with server CPU time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Jq;

#[derive(Debug, Clone, Copy)]
enum Frame {
    /// Program text with the number of brackets opened in it.
    Code(usize),
    /// Inside a string literal.
    Text,
}

impl Jq {
    /// Rejects programs that could run without bound or overflow the stack.
    fn screen(query: &str) -> Result<(), QueryError> {
        if query.len() > MAX_PROGRAM_LEN {
            return Err(QueryError::invalid(
                query,
                format!("program longer than {MAX_PROGRAM_LEN} bytes"),
            ));
        }

        let mut frames = vec![Frame::Code(0)];
        let mut depth = 0usize;
        let mut prev = ' ';
        let mut chars = query.char_indices().peekable();

        while let Some((at, c)) = chars.next() {
            let Some(&frame) = frames.last() else {
                break;
            };
            match (frame, c) {
                (Frame::Text, '\\') => {
                    if chars.next_if(|&(_, next)| next == '(').is_some() {
                        frames.push(Frame::Code(0));
                        depth += 1;
                    } else {
                        chars.next();
                    }
                }
                (Frame::Text, '"') => {
                    frames.pop();
                }
                (Frame::Text, _) => {}
                (Frame::Code(_), '"') => frames.push(Frame::Text),
                (Frame::Code(_), '#') => {
                    while chars.next_if(|&(_, next)| next != '\n').is_some() {}
                }
                (Frame::Code(open), '(' | '[' | '{') => {
                    if let Some(top) = frames.last_mut() {
                        *top = Frame::Code(open + 1);
                    }
                    depth += 1;
                }
                (Frame::Code(0), ')') if frames.len() > 1 => {
                    frames.pop();
                    depth = depth.saturating_sub(1);
                }
                (Frame::Code(open), ')' | ']' | '}') => {
                    if let Some(top) = frames.last_mut() {
                        *top = Frame::Code(open.saturating_sub(1));
                    }
                    depth = depth.saturating_sub(1);
                }
                (Frame::Code(_), c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut end = at + c.len_utf8();
                    while let Some((index, next)) =
                        chars.next_if(|&(_, next)| next.is_ascii_alphanumeric() || next == '_')
                    {
                        end = index + next.len_utf8();
                    }
                    let word = &query[at..end];
                    let called = query[end..].trim_start().starts_with('(');
                    Self::check_word(query, word, prev, called)?;
                }
                _ => {}
            }
            if depth > MAX_NESTING {
                return Err(QueryError::invalid(
                    query,
                    format!("program nested deeper than {MAX_NESTING} levels"),
                ));
            }
            if !c.is_whitespace() {
                prev = c;
            }
        }
        Ok(())
    }

    fn check_word(query: &str, word: &str, prev: char, called: bool) -> Result<(), QueryError> {
        let rejected = match prev {
            // `.name` is a field access.
            '.' => false,
            '$' => word == "ENV",
            _ => {
                word == "def"
                    || (word == "recurse" && called)
                    || REJECTED_BUILTINS.contains(&word)
            }
        };
        if rejected {
            return Err(QueryError::invalid(query, format!("`{word}` is not allowed")));
        }
        Ok(())
    }

    fn compile(query: &str) -> Result<Filter<Native<Val>>, QueryError> {
        Self::screen(query)?;
        let program = File {
            code: query,
            path: (),
        };
        let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = Arena::default();
        let modules = loader
            .load(&arena, program)
            .map_err(|errors| QueryError::invalid(query, format!("{errors:?}")))?;
        Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errors| QueryError::invalid(query, format!("{errors:?}")))
    }
}

impl QueryEvaluator for Jq {
    fn evaluate(&self, document: &Value, query: &str) -> Result<Value, QueryError> {
        let filter = Self::compile(query)?;

        let inputs = RcIter::new(core::iter::empty());
        let outputs: Vec<Val> = filter
            .run((Ctx::new([], &inputs), Val::from(document.clone())))
            .collect::<Result<_, _>>()
            .map_err(|error| QueryError::Runtime {
                query: query.to_owned(),
                reason: error.to_string(),
            })?;

        if matches!(outputs.as_slice(), [] | [Val::Null]) {
            return Err(QueryError::no_match(query));
        }
        let mut values: Vec<Value> = outputs.into_iter().map(Value::from).collect();
        if values.len() == 1 {
            Ok(values.swap_remove(0))
        } else {
            Ok(Value::Array(values))
        }
    }
}
