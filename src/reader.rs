//! Reader: turns program text into [`Value`]s, one top-level form at a time.
//!
//! The reader keeps a cursor into the loaded source buffer. Every call to
//! [`Reader::read`] skips whitespace and `;` comments and yields the next
//! form, a [`Read::Close`] for a `)` (the end-of-list signal, also produced
//! by a stray top-level `)`), or [`Read::End`] once the input is exhausted.
//! Symbols borrow their text straight from the source.

use nom::{
    IResult, Parser,
    bytes::complete::{take_till, take_till1, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    sequence::pair,
};

use crate::Error;
use crate::ast::{IntType, Value};
use crate::stack::ensure_sufficient_stack;

/// Outcome of a single read
#[derive(Debug, Clone, PartialEq)]
pub enum Read<'src> {
    /// A complete atom or list
    Form(Value<'src>),
    /// A `)` was consumed
    Close,
    /// No input left. Not an error: this is how a program ends.
    End,
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while(char::is_whitespace).parse(input)
}

/// `;` through end of line, the newline itself is left for [`whitespace`]
fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), take_till(|c: char| c == '\n'))).parse(input)
}

/// Maximal run of non-whitespace, non-paren characters
fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace() || c == '(' || c == ')').parse(input)
}

/// `(+|-)?[0-9]+`, matching the whole token
fn integer_literal(input: &str) -> IResult<&str, &str> {
    all_consuming(recognize(pair(opt(one_of("+-")), digit1))).parse(input)
}

/// Cursor over a source buffer
#[derive(Debug, Clone)]
pub struct Reader<'src> {
    source: &'src str,
    rest: &'src str,
}

impl<'src> Reader<'src> {
    pub fn new(source: &'src str) -> Self {
        Reader {
            source,
            rest: source,
        }
    }

    /// Byte offset of the cursor into the source
    pub fn position(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    /// Read the next form, `)` or end of input
    pub fn read(&mut self) -> Result<Read<'src>, Error> {
        loop {
            self.advance(whitespace)?;
            match self.rest.chars().next() {
                None => {
                    tracing::trace!(position = self.position(), "end of input");
                    return Ok(Read::End);
                }
                Some(';') => {
                    self.advance(comment)?;
                }
                Some(')') => {
                    self.advance(char(')'))?;
                    return Ok(Read::Close);
                }
                Some('(') => {
                    self.advance(char('('))?;
                    return self.read_list();
                }
                Some(_) => return self.read_atom().map(Read::Form),
            }
        }
    }

    /// Read items until the matching `)`. End of input inside a list ends
    /// the program and the partial list is dropped.
    fn read_list(&mut self) -> Result<Read<'src>, Error> {
        ensure_sufficient_stack(|| {
            let mut items = Vec::new();
            loop {
                match self.read()? {
                    Read::Form(item) => items.push(item),
                    // `()` and `( )` collapse to the empty value
                    Read::Close => return Ok(Read::Form(Value::list(items))),
                    Read::End => return Ok(Read::End),
                }
            }
        })
    }

    fn read_atom(&mut self) -> Result<Value<'src>, Error> {
        let text = self.advance(token)?;
        if integer_literal(text).is_err() {
            return Ok(Value::Symbol(text));
        }
        text.parse::<IntType>()
            .map(Value::Int)
            .map_err(|_| Error::ParseError(format!("integer literal out of range: {text}")))
    }

    /// Run `parser` at the cursor and move the cursor past what it consumed.
    ///
    /// `read` only runs a parser after peeking a character it accepts, so a
    /// failure here is reported with its position and nom error kind.
    fn advance<O>(
        &mut self,
        mut parser: impl Parser<&'src str, Output = O, Error = nom::error::Error<&'src str>>,
    ) -> Result<O, Error> {
        let (rest, output) = parser.parse(self.rest).map_err(|e| {
            let detail = match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => format!("{:?}", e.code),
                nom::Err::Incomplete(_) => "incomplete input".to_owned(),
            };
            Error::ParseError(format!("at position {}: {detail}", self.position()))
        })?;
        self.rest = rest;
        Ok(output)
    }
}

/// Read every top-level form in `source`. Stray `)` are skipped.
pub fn read_all(source: &str) -> Result<Vec<Value<'_>>, Error> {
    let mut reader = Reader::new(source);
    let mut forms = Vec::new();
    loop {
        match reader.read()? {
            Read::Form(form) => forms.push(form),
            Read::Close => {}
            Read::End => return Ok(forms),
        }
    }
}
