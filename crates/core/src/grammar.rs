//! The three-section model grammar, assembled from the combinators.
//!
//! ```text
//! config           := requests_section terms_section matchers_section
//! requests_section := "[requests]" NEWLINE definition*
//! terms_section    := "[terms]" NEWLINE definition*
//! matchers_section := "[matchers]" NEWLINE matcher_def*
//! definition       := identifier "=" identifier ("," identifier)* NEWLINE
//! matcher_def      := identifier "=" expression NEWLINE
//! NEWLINE          := "\n"+
//! ```
//!
//! Sections appear in this fixed order; any of them may be empty.

use crate::ast::{Expr, RawDeclaration, RawMatcher, RawModel};
use crate::combinator::{custom, literal, parse_all, position, sep_by, Parser, Rejection};
use crate::error::ParseError;
use crate::expr::parse_fragment;
use crate::limits::Limits;
use crate::preprocess::preprocess;

/// Preprocess and parse model text. Error positions and declaration line
/// numbers refer to the preprocessed text.
pub fn parse_model(source: &str, limits: &Limits) -> Result<RawModel, ParseError> {
    let text = preprocess(source);
    let ((requests, terms), matchers) = parse_all(&config(limits.max_expression_depth), &text)?;

    let lines = LineIndex::new(&text);
    let declaration = |(pos, name, fields): (usize, String, Vec<String>)| RawDeclaration {
        name,
        fields,
        line: lines.line_of(pos),
    };
    Ok(RawModel {
        requests: requests.into_iter().map(declaration).collect(),
        terms: terms.into_iter().map(declaration).collect(),
        matchers: matchers
            .into_iter()
            .map(|(pos, request_type, expr)| RawMatcher {
                request_type,
                expr,
                line: lines.line_of(pos),
            })
            .collect(),
    })
}

type Declaration = (usize, String, Vec<String>);

fn config<'s>(
    max_depth: usize,
) -> impl Parser<'s, Output = ((Vec<Declaration>, Vec<Declaration>), Vec<(usize, String, Expr)>)> {
    section("[requests]", definition())
        .then(section("[terms]", definition()))
        .then(section("[matchers]", matcher_def(max_depth)))
}

fn section<'s, P>(header: &'static str, item: P) -> impl Parser<'s, Output = Vec<P::Output>>
where
    P: Parser<'s>,
{
    literal(header).ignore_then(newline()).ignore_then(item.many())
}

fn definition<'s>() -> impl Parser<'s, Output = Declaration> + Clone {
    position()
        .then(custom("identifier", identifier))
        .then_ignore(literal("="))
        .then(sep_by(custom("identifier", identifier), literal(",")))
        .then_ignore(newline())
        .map(|((pos, name), fields)| (pos, name, fields))
}

fn matcher_def<'s>(max_depth: usize) -> impl Parser<'s, Output = (usize, String, Expr)> + Clone {
    position()
        .then(custom("identifier", identifier))
        .then_ignore(literal("="))
        .then(custom("boolean expression", boolean_expression(max_depth)))
        .then_ignore(newline())
        .map(|((pos, name), expr)| (pos, name, expr))
}

fn newline<'s>() -> impl Parser<'s, Output = ()> + Clone {
    literal("\n").many1().ignore()
}

fn identifier(text: &str, pos: usize) -> Result<(String, usize), Rejection> {
    let rest = &text[pos..];
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(Rejection::none()),
    }
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    Ok((rest[..len].to_owned(), pos + len))
}

/// Recognizes the rest of the line as one matcher expression.
fn boolean_expression(
    max_depth: usize,
) -> impl Fn(&str, usize) -> Result<(Expr, usize), Rejection> + Clone {
    move |text: &str, pos: usize| {
        let end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
        let expr = parse_fragment(&text[pos..end], pos, max_depth)
            .map_err(|e| Rejection::at(e.offset, e.message))?;
        Ok((expr, end))
    }
}

/// Byte offset to 1-based line number.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    fn line_of(&self, offset: usize) -> u32 {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        line as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Literal};

    const MODEL: &str = "\
[requests]
launch_task = task_id, participants
access_data = usr, data
[terms]
# relation between tasks and their participants
task_participant = task, usr
data_owner = data, usr

[matchers]
launch_task = participants <= task_participant(task_id, _)
access_data = usr == data_owner(data, _) or \\
    usr in {'root'}
";

    fn parse(src: &str) -> Result<RawModel, ParseError> {
        parse_model(src, &Limits::default())
    }

    #[test]
    fn parses_all_three_sections() {
        let model = parse(MODEL).unwrap();
        let names: Vec<_> = model.requests.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["launch_task", "access_data"]);
        assert_eq!(model.requests[0].fields, ["task_id", "participants"]);
        assert_eq!(model.terms.len(), 2);
        assert_eq!(model.terms[1].arity(), 2);
        assert_eq!(model.matchers.len(), 2);
        assert_eq!(model.matchers[0].request_type, "launch_task");
        assert!(matches!(
            model.matchers[0].expr,
            Expr::Compare { op: CompareOp::Le, .. }
        ));
    }

    #[test]
    fn records_declaration_lines() {
        let model = parse(MODEL).unwrap();
        assert_eq!(model.requests[0].line, 2);
        assert_eq!(model.requests[1].line, 3);
        assert_eq!(model.terms[0].line, 6);
        // The comment line survives as an empty line.
        assert_eq!(model.matchers[1].line, 11);
    }

    #[test]
    fn empty_sections_are_legal() {
        let model = parse("[requests]\n[terms]\n[matchers]\n").unwrap();
        assert_eq!(model, RawModel::default());
    }

    #[test]
    fn sections_must_be_in_order() {
        let err = parse("[terms]\n[requests]\n[matchers]\n").unwrap_err();
        assert_eq!(err.message, "expecting \"[requests]\"");
        assert_eq!(err.line, 1);

        let err = parse("[requests]\n[matchers]\n[terms]\n").unwrap_err();
        assert_eq!(err.message, "expecting \"[terms]\"");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn field_list_needs_a_name() {
        let err = parse("[requests]\nr =\n[terms]\n[matchers]\n").unwrap_err();
        assert_eq!(err.message, "expecting identifier");
        assert_eq!((err.line, err.column), (2, 4));
    }

    #[test]
    fn dangling_comma_is_reported_in_place() {
        let err = parse("[requests]\nr = a,\n[terms]\n[matchers]\n").unwrap_err();
        assert_eq!(err.message, "expecting identifier");
        assert_eq!((err.line, err.column), (2, 7));
    }

    #[test]
    fn matcher_syntax_error_has_exact_column() {
        let src = "[requests]\nr = a\n[terms]\n[matchers]\nr = a == (1, \n";
        let err = parse(src).unwrap_err();
        assert_eq!(err.line, 5);
        assert_eq!(err.column, 13);
        assert!(err.message.starts_with("expecting boolean expression: "));
        assert!(err.snippet.starts_with("r = a == (1,\n"));
    }

    #[test]
    fn empty_matcher_is_rejected() {
        let err = parse("[requests]\nr = a\n[terms]\n[matchers]\nr =\n").unwrap_err();
        assert_eq!(err.line, 5);
        assert!(err.message.contains("end of expression"));
    }

    #[test]
    fn hash_in_string_is_not_a_comment() {
        let src = "[requests]\nr = a\n[terms]\n[matchers]\nr = a == '#1' # note\n";
        let model = parse(src).unwrap();
        assert_eq!(
            model.matchers[0].expr,
            Expr::Compare {
                op: CompareOp::Eq,
                left: Box::new(Expr::Name("a".into())),
                right: Box::new(Expr::Literal(Literal::Str("#1".into()))),
            }
        );
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = parse("[requests]\n[terms]\n[matchers]\n[extra]\n").unwrap_err();
        assert_eq!(err.message, "trailing unparsable input");
        assert_eq!(err.line, 4);
    }

    #[test]
    fn deep_matcher_hits_depth_limit() {
        let limits = Limits {
            max_expression_depth: 3,
            ..Limits::default()
        };
        let src = "[requests]\nr = a\n[terms]\n[matchers]\nr = ((((a))))\n";
        let err = parse_model(src, &limits).unwrap_err();
        assert!(err.message.contains("nested deeper than 3"));
    }

    #[test]
    fn identifiers_allow_digits_and_underscores() {
        let model = parse("[requests]\n_r2 = f_1, g\n[terms]\n[matchers]\n_r2 = f_1\n").unwrap();
        assert_eq!(model.requests[0].name, "_r2");
        assert!(parse("[requests]\n2r = a\n[terms]\n[matchers]\n").is_err());
    }
}
