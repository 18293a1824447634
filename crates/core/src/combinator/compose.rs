use super::{Either, PResult, Parser, Stream};

/// Sequential composition yielding both payloads.
#[derive(Debug, Clone)]
pub struct Concat<A, B> {
    first: A,
    second: B,
}

impl<A, B> Concat<A, B> {
    pub(super) fn new(first: A, second: B) -> Self {
        Concat { first, second }
    }
}

impl<'s, A: Parser<'s>, B: Parser<'s>> Parser<'s> for Concat<A, B> {
    type Output = (A::Output, B::Output);

    fn apply(&self, input: Stream<'s>) -> PResult<'s, Self::Output> {
        let (a, rest) = self.first.apply(input)?;
        let (b, rest) = self.second.apply(rest)?;
        Ok(((a, b), rest))
    }
}

/// Concatenation whose first payload is ignored.
#[derive(Debug, Clone)]
pub struct Preceded<A, B> {
    ignored: A,
    kept: B,
}

impl<A, B> Preceded<A, B> {
    pub(super) fn new(ignored: A, kept: B) -> Self {
        Preceded { ignored, kept }
    }
}

impl<'s, A: Parser<'s>, B: Parser<'s>> Parser<'s> for Preceded<A, B> {
    type Output = B::Output;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, B::Output> {
        let (_, rest) = self.ignored.apply(input)?;
        self.kept.apply(rest)
    }
}

/// Concatenation whose second payload is ignored.
#[derive(Debug, Clone)]
pub struct Terminated<A, B> {
    kept: A,
    ignored: B,
}

impl<A, B> Terminated<A, B> {
    pub(super) fn new(kept: A, ignored: B) -> Self {
        Terminated { kept, ignored }
    }
}

impl<'s, A: Parser<'s>, B: Parser<'s>> Parser<'s> for Terminated<A, B> {
    type Output = A::Output;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, A::Output> {
        let (a, rest) = self.kept.apply(input)?;
        let (_, rest) = self.ignored.apply(rest)?;
        Ok((a, rest))
    }
}

/// Ordered choice. The right branch sees the original input.
#[derive(Debug, Clone)]
pub struct Alt<A, B> {
    left: A,
    right: B,
}

impl<A, B> Alt<A, B> {
    pub(super) fn new(left: A, right: B) -> Self {
        Alt { left, right }
    }
}

impl<'s, A: Parser<'s>, B: Parser<'s>> Parser<'s> for Alt<A, B> {
    type Output = Either<A::Output, B::Output>;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, Self::Output> {
        let left_failure = match self.left.apply(input) {
            Ok((v, rest)) => return Ok((Either::Left(v), rest)),
            Err(failure) => failure,
        };
        match self.right.apply(input) {
            Ok((v, rest)) => Ok((Either::Right(v), rest)),
            // Report whichever branch understood more of the input.
            Err(right_failure) if left_failure.stream.pos() > right_failure.stream.pos() => {
                Err(left_failure)
            }
            Err(right_failure) => Err(right_failure),
        }
    }
}

/// Greedy repetition with a minimum count.
///
/// An item that fails after getting past its first token is a committed
/// failure: it propagates instead of ending the repetition.
#[derive(Debug, Clone)]
pub struct Rep<P> {
    item: P,
    min: usize,
}

impl<P> Rep<P> {
    pub(super) fn new(item: P, min: usize) -> Self {
        Rep { item, min }
    }
}

impl<'s, P: Parser<'s>> Parser<'s> for Rep<P> {
    type Output = Vec<P::Output>;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, Self::Output> {
        let mut items = Vec::new();
        let mut stream = input;
        loop {
            match self.item.apply(stream) {
                Ok((v, rest)) => {
                    let progressed = rest.pos() > stream.pos();
                    items.push(v);
                    stream = rest;
                    // An item that consumes nothing would match forever.
                    if !progressed {
                        break;
                    }
                }
                Err(failure) if items.len() < self.min => return Err(failure),
                Err(failure) if failure.stream.pos() > stream.skip_whitespace() => {
                    return Err(failure)
                }
                Err(_) => break,
            }
        }
        Ok((items, stream))
    }
}

/// Zero-or-one: `Left(payload)` when present, `Right(())` when absent.
#[derive(Debug, Clone)]
pub struct Opt<P> {
    item: P,
}

impl<P> Opt<P> {
    pub(super) fn new(item: P) -> Self {
        Opt { item }
    }
}

impl<'s, P: Parser<'s>> Parser<'s> for Opt<P> {
    type Output = Either<P::Output, ()>;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, Self::Output> {
        match self.item.apply(input) {
            Ok((v, rest)) => Ok((Either::Left(v), rest)),
            Err(_) => Ok((Either::Right(()), input)),
        }
    }
}

/// Transforms the payload of a successful parse.
#[derive(Clone)]
pub struct Map<P, F> {
    item: P,
    f: F,
}

impl<P, F> Map<P, F> {
    pub(super) fn new(item: P, f: F) -> Self {
        Map { item, f }
    }
}

impl<'s, P, F, T> Parser<'s> for Map<P, F>
where
    P: Parser<'s>,
    F: Fn(P::Output) -> T,
{
    type Output = T;

    fn apply(&self, input: Stream<'s>) -> PResult<'s, T> {
        let (v, rest) = self.item.apply(input)?;
        Ok(((self.f)(v), rest))
    }
}

/// Recognizes like the wrapped parser but yields no payload.
#[derive(Debug, Clone)]
pub struct Ignore<P> {
    item: P,
}

impl<P> Ignore<P> {
    pub(super) fn new(item: P) -> Self {
        Ignore { item }
    }
}

impl<'s, P: Parser<'s>> Parser<'s> for Ignore<P> {
    type Output = ();

    fn apply(&self, input: Stream<'s>) -> PResult<'s, ()> {
        let (_, rest) = self.item.apply(input)?;
        Ok(((), rest))
    }
}

/// One or more `item`s separated by `sep`; separator payloads are dropped.
pub fn sep_by<'s, I, S>(item: I, sep: S) -> impl Parser<'s, Output = Vec<I::Output>> + Clone
where
    I: Parser<'s> + Clone,
    S: Parser<'s> + Clone,
{
    item.clone()
        .then(sep.ignore_then(item).many())
        .map(|(first, rest)| {
            let mut items = Vec::with_capacity(rest.len() + 1);
            items.push(first);
            items.extend(rest);
            items
        })
}
