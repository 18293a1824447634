use super::{PResult, ParseFailure, Parser, Rejection, Stream};

/// Matches fixed text. See [`Stream::accept_literal`].
#[derive(Debug, Clone, Copy)]
pub struct Literal {
    text: &'static str,
}

pub fn literal(text: &'static str) -> Literal {
    Literal { text }
}

impl<'s> Parser<'s> for Literal {
    type Output = &'static str;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, Self::Output> {
        if input.end() {
            return Err(ParseFailure::new(
                input,
                format!("insufficient input, expecting {:?}", self.text),
            ));
        }
        let rest = input.accept_literal(self.text)?;
        Ok((self.text, rest))
    }
}

/// Delegates recognition to a function of `(text, pos)`.
///
/// The recognizer returns the payload and the position just past what it
/// consumed, or a [`Rejection`]. This is how whole sub-languages (such as
/// matcher expressions) are embedded as single tokens.
#[derive(Clone)]
pub struct Custom<F> {
    name: &'static str,
    recognizer: F,
}

pub fn custom<'s, T, F>(name: &'static str, recognizer: F) -> Custom<F>
where
    F: Fn(&'s str, usize) -> Result<(T, usize), Rejection>,
{
    Custom { name, recognizer }
}

impl<'s, T, F> Parser<'s> for Custom<F>
where
    F: Fn(&'s str, usize) -> Result<(T, usize), Rejection>,
{
    type Output = T;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, T> {
        input.accept_with(self.name, &self.recognizer)
    }
}

/// Consumes nothing; yields the current byte offset.
#[derive(Debug, Clone, Copy)]
pub struct Position;

pub fn position() -> Position {
    Position
}

impl<'s> Parser<'s> for Position {
    type Output = usize;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, usize> {
        Ok((input.pos(), input))
    }
}
