use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{delimited, eof, opt, preceded, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// How strictly identifiers and operators must match their canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Exact-case license ids and uppercase `AND`/`OR`/`WITH`.
    Strict,
    /// Any case; the parse result renders canonically.
    Lax,
}

impl Mode {
    fn keyword_matches(self, word: &str, keyword: &str) -> bool {
        match self {
            Mode::Strict => word == keyword,
            Mode::Lax => word.eq_ignore_ascii_case(keyword),
        }
    }

    fn strip_prefix<'a>(self, word: &'a str, prefix: &str) -> Option<&'a str> {
        match self {
            Mode::Strict => word.strip_prefix(prefix),
            Mode::Lax => {
                let head = word.get(..prefix.len())?;
                head.eq_ignore_ascii_case(prefix)
                    .then(|| &word[prefix.len()..])
            }
        }
    }
}

/// A parsed SPDX license expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    License {
        id: &'static str,
        or_later: bool,
        exception: Option<&'static str>,
    },
    /// `LicenseRef-...` or `DocumentRef-...:LicenseRef-...`, stored canonically.
    Reference(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::License {
                id,
                or_later,
                exception,
            } => {
                write!(f, "{id}")?;
                if *or_later {
                    write!(f, "+")?;
                }
                if let Some(exception) = exception {
                    write!(f, " WITH {exception}")?;
                }
                Ok(())
            }
            Expr::Reference(reference) => write!(f, "{reference}"),
            Expr::And(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    match term {
                        Expr::Or(_) => write!(f, "({term})")?,
                        _ => write!(f, "{term}")?,
                    }
                }
                Ok(())
            }
            Expr::Or(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

/// Special values that are valid only as the whole expression.
const SPECIAL_VALUES: &[&str] = &["NONE", "NOASSERTION"];

fn license_ids() -> &'static HashMap<String, &'static str> {
    static IDS: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    IDS.get_or_init(|| {
        spdx::identifiers::LICENSES
            .iter()
            .map(|license| (license.0.to_ascii_lowercase(), license.0))
            .collect()
    })
}

fn exception_ids() -> &'static HashMap<String, &'static str> {
    static IDS: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    IDS.get_or_init(|| {
        spdx::identifiers::EXCEPTIONS
            .iter()
            .map(|exception| (exception.0.to_ascii_lowercase(), exception.0))
            .collect()
    })
}

fn lookup(
    table: &'static HashMap<String, &'static str>,
    word: &str,
    mode: Mode,
) -> Option<&'static str> {
    let canonical = *table.get(&word.to_ascii_lowercase())?;
    match mode {
        Mode::Strict => (canonical == word).then_some(canonical),
        Mode::Lax => Some(canonical),
    }
}

fn is_idstring(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
}

fn is_term_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | ':')
}

fn license_ref(word: &str, mode: Mode) -> Option<String> {
    let rest = mode.strip_prefix(word, "LicenseRef-")?;
    is_idstring(rest).then(|| format!("LicenseRef-{rest}"))
}

fn classify_term(word: &str, mode: Mode) -> Option<Expr> {
    if let Some(rest) = mode.strip_prefix(word, "DocumentRef-") {
        let (document, license) = rest.split_once(':')?;
        if !is_idstring(document) {
            return None;
        }
        let license = license_ref(license, mode)?;
        return Some(Expr::Reference(format!("DocumentRef-{document}:{license}")));
    }
    if let Some(reference) = license_ref(word, mode) {
        return Some(Expr::Reference(reference));
    }

    let (base, or_later) = match word.strip_suffix('+') {
        Some(base) => (base, true),
        None => (word, false),
    };
    if !is_idstring(base) {
        return None;
    }
    let id = lookup(license_ids(), base, mode)?;
    Some(Expr::License {
        id,
        or_later,
        exception: None,
    })
}

fn keyword<'i>(kw: &'static str, mode: Mode) -> impl Parser<&'i str, (), ErrMode<ContextError>> {
    preceded(multispace1, take_while(1.., is_term_char))
        .verify(move |word: &str| mode.keyword_matches(word, kw))
        .void()
}

fn primary(input: &mut &str, mode: Mode) -> ModalResult<Expr> {
    multispace0.parse_next(input)?;
    if input.starts_with('(') {
        return delimited('(', |i: &mut &str| or_expr(i, mode), (multispace0, ')'))
            .parse_next(input);
    }
    let term = take_while(1.., is_term_char)
        .verify_map(|word: &str| classify_term(word, mode))
        .parse_next(input)?;

    let exception = opt(preceded(
        keyword("WITH", mode),
        preceded(
            multispace1,
            take_while(1.., is_term_char)
                .verify_map(|word: &str| lookup(exception_ids(), word, mode)),
        ),
    ))
    .parse_next(input)?;

    match (term, exception) {
        (Expr::License { id, or_later, .. }, Some(exception)) => Ok(Expr::License {
            id,
            or_later,
            exception: Some(exception),
        }),
        // WITH only applies to listed licenses.
        (_, Some(_)) => Err(ErrMode::Backtrack(ContextError::new())),
        (term, None) => Ok(term),
    }
}

fn and_expr(input: &mut &str, mode: Mode) -> ModalResult<Expr> {
    let first = primary(input, mode)?;
    let rest: Vec<Expr> = repeat(
        0..,
        preceded(keyword("AND", mode), |i: &mut &str| primary(i, mode)),
    )
    .parse_next(input)?;
    Ok(join(Op::And, first, rest))
}

fn or_expr(input: &mut &str, mode: Mode) -> ModalResult<Expr> {
    let first = and_expr(input, mode)?;
    let rest: Vec<Expr> = repeat(
        0..,
        preceded(keyword("OR", mode), |i: &mut &str| and_expr(i, mode)),
    )
    .parse_next(input)?;
    Ok(join(Op::Or, first, rest))
}

#[derive(Clone, Copy)]
enum Op {
    And,
    Or,
}

/// Build an n-ary node, merging nested nodes of the same operator.
fn join(op: Op, first: Expr, rest: Vec<Expr>) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut terms = Vec::with_capacity(rest.len() + 1);
    for term in std::iter::once(first).chain(rest) {
        match (op, term) {
            (Op::And, Expr::And(inner)) | (Op::Or, Expr::Or(inner)) => terms.extend(inner),
            (_, term) => terms.push(term),
        }
    }
    match op {
        Op::And => Expr::And(terms),
        Op::Or => Expr::Or(terms),
    }
}

/// Parse a complete expression. Special values are not accepted here.
pub(crate) fn parse(input: &str, mode: Mode) -> Option<Expr> {
    let mut rest = input;
    let expr = or_expr(&mut rest, mode).ok()?;
    (multispace0::<_, ErrMode<ContextError>>, eof).parse_next(&mut rest).ok()?;
    Some(expr)
}

/// Match a special value, returning its canonical spelling.
pub(crate) fn special_value(input: &str, mode: Mode) -> Option<&'static str> {
    SPECIAL_VALUES
        .iter()
        .find(|special| mode.keyword_matches(input, special))
        .copied()
}

/// Whether `input` is already a canonical SPDX expression or special value.
pub(crate) fn is_valid(input: &str) -> bool {
    special_value(input, Mode::Strict).is_some() || parse(input, Mode::Strict).is_some()
}

/// Canonical rendering of a case-insensitive parse.
pub(crate) fn canonicalize(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if let Some(special) = special_value(trimmed, Mode::Lax) {
        return Some(special.to_string());
    }
    parse(trimmed, Mode::Lax).map(|expr| expr.to_string())
}
