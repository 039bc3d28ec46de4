//! Read-eval-print session over a loaded program.
//!
//! Before every top-level read the session writes [`PROMPT`]; each form is
//! evaluated in the global environment and its printed value is written
//! followed by a newline. A stray `)` reads as nothing and prints an empty
//! line. When the input runs out the session writes [`DONE_MESSAGE`] and
//! returns. The first error ends the session.

use std::io::Write;

use crate::Error;
use crate::environment::Environment;
use crate::evaluator::{create_global_env, eval};
use crate::reader::{Read, Reader};

pub const PROMPT: &str = "==> ";
pub const DONE_MESSAGE: &str = "program done";

/// Run `source` to completion in a fresh global environment
pub fn run<W: Write>(source: &str, out: &mut W) -> Result<(), Error> {
    let mut env = create_global_env();
    run_with_env(source, &mut env, out)
}

/// Run `source` in `env`, which keeps its bindings afterwards
pub fn run_with_env<'src, W: Write>(
    source: &'src str,
    env: &mut Environment<'src>,
    out: &mut W,
) -> Result<(), Error> {
    let mut reader = Reader::new(source);
    let mut forms = 0usize;
    loop {
        write!(out, "{PROMPT}")?;
        match reader.read()? {
            Read::Form(form) => {
                forms += 1;
                let value = eval(&form, env)?;
                writeln!(out, "{value}")?;
            }
            Read::Close => writeln!(out)?,
            Read::End => {
                tracing::debug!(forms, "program finished");
                writeln!(out, "{DONE_MESSAGE}")?;
                return Ok(());
            }
        }
    }
}
