//! Parser combinators over a position-tracked [`Stream`].
//!
//! Every parser is a pure function from a stream to a [`PResult`]: either
//! the payload plus the remaining stream, or a [`ParseFailure`] positioned
//! where recognition broke down. Combinators never mutate their input, so
//! backtracking is just reusing the original stream.
//!
//! Building blocks:
//!
//! - [`literal`], [`custom`], [`position`] -- primitives
//! - [`Parser::then`], [`Parser::ignore_then`], [`Parser::then_ignore`] -- sequencing
//! - [`Parser::or`] -- alternation tagged with [`Either`]
//! - [`Parser::many`], [`Parser::many1`], [`Parser::optional`] -- repetition
//! - [`Parser::map`], [`Parser::ignore`] -- payload shaping
//! - [`sep_by`] -- one or more items separated by a delimiter
//! - [`parse_all`] -- run a parser over a whole text

mod compose;
mod primitives;
mod stream;

pub use compose::{sep_by, Alt, Concat, Ignore, Map, Opt, Preceded, Rep, Terminated};
pub use primitives::{custom, literal, position, Custom, Literal, Position};
pub use stream::{ParseFailure, Rejection, Stream};

use crate::error::ParseError;

/// Outcome of applying a parser: payload and remaining input, or failure.
pub type PResult<'s, T> = Result<(T, Stream<'s>), ParseFailure<'s>>;

/// Tag produced by alternation and optional parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<T> Either<T, T> {
    /// Drop the tag when both branches produce the same type.
    pub fn into_inner(self) -> T {
        match self {
            Either::Left(v) | Either::Right(v) => v,
        }
    }
}

impl<L> Either<L, ()> {
    /// Present/absent view of an [`Opt`] payload.
    pub fn present(self) -> Option<L> {
        match self {
            Either::Left(v) => Some(v),
            Either::Right(()) => None,
        }
    }
}

pub trait Parser<'s> {
    type Output;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, Self::Output>;

    /// Sequence: both payloads, as a pair.
    fn then<P>(self, next: P) -> Concat<Self, P>
    where
        Self: Sized,
        P: Parser<'s>,
    {
        Concat::new(self, next)
    }

    /// Sequence, keeping only `next`'s payload.
    fn ignore_then<P>(self, next: P) -> Preceded<Self, P>
    where
        Self: Sized,
        P: Parser<'s>,
    {
        Preceded::new(self, next)
    }

    /// Sequence, keeping only this parser's payload.
    fn then_ignore<P>(self, next: P) -> Terminated<Self, P>
    where
        Self: Sized,
        P: Parser<'s>,
    {
        Terminated::new(self, next)
    }

    fn or<P>(self, other: P) -> Alt<Self, P>
    where
        Self: Sized,
        P: Parser<'s>,
    {
        Alt::new(self, other)
    }

    fn many(self) -> Rep<Self>
    where
        Self: Sized,
    {
        Rep::new(self, 0)
    }

    fn many1(self) -> Rep<Self>
    where
        Self: Sized,
    {
        Rep::new(self, 1)
    }

    fn optional(self) -> Opt<Self>
    where
        Self: Sized,
    {
        Opt::new(self)
    }

    fn map<F, T>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> T,
    {
        Map::new(self, f)
    }

    fn ignore(self) -> Ignore<Self>
    where
        Self: Sized,
    {
        Ignore::new(self)
    }
}

/// Run `parser` over all of `text`. Leftover input is an error.
pub fn parse_all<'s, P>(parser: &P, text: &'s str) -> Result<P::Output, ParseError>
where
    P: Parser<'s>,
{
    let (value, rest) = parser
        .apply(Stream::new(text))
        .map_err(ParseFailure::into_error)?;
    if !rest.end() {
        return Err(rest.error("trailing unparsable input"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_rejects_trailing_input() {
        let p = literal("ab");
        assert_eq!(parse_all(&p, "ab").unwrap(), "ab");

        let err = parse_all(&p, "abc").unwrap_err();
        assert_eq!(err.message, "trailing unparsable input");
        assert_eq!(err.column, 3);
    }

    #[test]
    fn parse_all_reports_failure_position() {
        let p = literal("a").then(literal("b"));
        let err = parse_all(&p, "a c").unwrap_err();
        assert_eq!(err.message, "expecting \"b\"");
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn either_helpers() {
        let l: Either<u8, u8> = Either::Left(1);
        assert_eq!(l.into_inner(), 1);
        let absent: Either<u8, ()> = Either::Right(());
        assert_eq!(absent.present(), None);
    }
}
