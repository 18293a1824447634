use crate::error::ParseError;

/// Characters skipped before a literal or recognizer. Newlines are
/// significant in the model grammar and are never skipped.
const WHITESPACE: [u8; 3] = [b' ', b'\t', b'\r'];

/// An immutable cursor over source text.
///
/// Advancing never mutates a stream; it returns a new one further along
/// the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stream<'s> {
    text: &'s str,
    pos: usize,
}

/// Why a custom recognizer declined its input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rejection {
    /// Byte offset of the offending input, if more precise than the
    /// position the recognizer was called at.
    pub pos: Option<usize>,
    pub reason: Option<String>,
}

impl Rejection {
    /// Plain "does not match here".
    pub fn none() -> Self {
        Rejection::default()
    }

    pub fn at(pos: usize, reason: impl Into<String>) -> Self {
        Rejection {
            pos: Some(pos),
            reason: Some(reason.into()),
        }
    }
}

/// A failed parse: where it happened and what was expected there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure<'s> {
    pub stream: Stream<'s>,
    pub message: String,
}

impl<'s> ParseFailure<'s> {
    pub fn new(stream: Stream<'s>, message: impl Into<String>) -> Self {
        ParseFailure {
            stream,
            message: message.into(),
        }
    }

    pub fn into_error(self) -> ParseError {
        self.stream.error(self.message)
    }
}

impl<'s> Stream<'s> {
    pub fn new(text: &'s str) -> Self {
        Stream { text, pos: 0 }
    }

    pub fn text(&self) -> &'s str {
        self.text
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> bool {
        self.pos == self.text.len()
    }

    /// The unconsumed remainder.
    pub fn rest(&self) -> &'s str {
        &self.text[self.pos..]
    }

    fn at(&self, pos: usize) -> Stream<'s> {
        debug_assert!(pos >= self.pos, "streams never move backwards");
        Stream {
            text: self.text,
            pos,
        }
    }

    /// Position of the first non-whitespace byte at or after this one.
    pub fn skip_whitespace(&self) -> usize {
        let bytes = self.text.as_bytes();
        let mut pos = self.pos;
        while pos < bytes.len() && WHITESPACE.contains(&bytes[pos]) {
            pos += 1;
        }
        pos
    }

    /// Match `literal` after skipping whitespace. The literal's own
    /// leading whitespace is ignored, so a literal that is nothing but
    /// whitespace matches the empty string.
    pub fn accept_literal(&self, literal: &str) -> Result<Stream<'s>, ParseFailure<'s>> {
        let pos = self.skip_whitespace();
        let wanted = literal.trim_start_matches([' ', '\t', '\r']);
        if self.text[pos..].starts_with(wanted) {
            Ok(self.at(pos + wanted.len()))
        } else {
            Err(ParseFailure::new(*self, format!("expecting {:?}", literal)))
        }
    }

    /// Hand the text to `recognizer` after skipping whitespace.
    pub fn accept_with<T, F>(
        &self,
        name: &str,
        recognizer: &F,
    ) -> Result<(T, Stream<'s>), ParseFailure<'s>>
    where
        F: Fn(&'s str, usize) -> Result<(T, usize), Rejection>,
    {
        let pos = self.skip_whitespace();
        match recognizer(self.text, pos) {
            Ok((value, next)) if next >= pos && next <= self.text.len() => {
                Ok((value, self.at(next)))
            }
            Ok(_) => Err(ParseFailure::new(
                self.at(pos),
                format!("recognizer for {} moved out of bounds", name),
            )),
            Err(rejection) => {
                let at = rejection.pos.unwrap_or(pos).clamp(pos, self.text.len());
                let message = match rejection.reason {
                    Some(reason) => format!("expecting {}: {}", name, reason),
                    None => format!("expecting {}", name),
                };
                Err(ParseFailure::new(self.at(at), message))
            }
        }
    }

    /// Render an error positioned at this stream.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.text, self.pos, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_skips_spaces_but_not_newlines() {
        let s = Stream::new("  \t= x");
        let next = s.accept_literal("=").unwrap();
        assert_eq!(next.rest(), " x");

        let s = Stream::new("\n=");
        assert!(s.accept_literal("=").is_err());
    }

    #[test]
    fn literal_failure_stays_at_original_position() {
        let s = Stream::new("abc");
        let fail = s.accept_literal("abd").unwrap_err();
        assert_eq!(fail.stream.pos(), 0);
        assert_eq!(fail.message, "expecting \"abd\"");
    }

    #[test]
    fn whitespace_only_literal_matches_empty() {
        let s = Stream::new("  x");
        let next = s.accept_literal("  ").unwrap();
        assert_eq!(next.rest(), "x");
    }

    #[test]
    fn advancing_returns_new_stream() {
        let s = Stream::new("ab");
        let next = s.accept_literal("a").unwrap();
        assert_eq!(s.pos(), 0);
        assert_eq!(next.pos(), 1);
        assert!(!next.end());
        assert!(next.accept_literal("b").unwrap().end());
    }

    #[test]
    fn recognizer_rejection_carries_reason_and_position() {
        let digits = |text: &str, pos: usize| -> Result<(u32, usize), Rejection> {
            let len = text[pos..].chars().take_while(|c| c.is_ascii_digit()).count();
            if len == 0 {
                return Err(Rejection::at(pos, "no digits"));
            }
            let n = text[pos..pos + len]
                .parse()
                .map_err(|_| Rejection::none())?;
            Ok((n, pos + len))
        };
        let (n, rest) = Stream::new(" 42x").accept_with("number", &digits).unwrap();
        assert_eq!(n, 42);
        assert_eq!(rest.rest(), "x");

        let fail = Stream::new("  x").accept_with("number", &digits).unwrap_err();
        assert_eq!(fail.stream.pos(), 2);
        assert_eq!(fail.message, "expecting number: no digits");
    }
}
