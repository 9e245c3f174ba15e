//! # Literal Coercion
//!
//! Flattened event exports carry structured columns as text, e.g.
//! `location = "[61.0, 40.1]"` or `tactics = "{'formation': 442, 'lineup': [...]}"`.
//! [`coerce`] turns such strings back into JSON values and leaves everything
//! else alone.
//!
//! The grammar is deliberately narrow: numbers, quoted strings, `None`/`True`/`False`,
//! lists, tuples, sets and dicts. Nothing is evaluated.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit0, digit1, multispace0, one_of};
use nom::combinator::{map, opt, recognize, value as constant};
use nom::error::{ErrorKind, ParseError, VerboseError};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;
use serde_json::{Map, Number, Value};

use crate::error::LiteralError;

pub(crate) type ParserError<'a> = VerboseError<&'a str>;
pub(crate) type ParserResult<'a, Out> = IResult<&'a str, Out, ParserError<'a>>;

const BRACKET_PAIRS: [(char, char); 3] = [('[', ']'), ('{', '}'), ('(', ')')];

/// Containers nested deeper than this fail to parse.
pub const MAX_DEPTH: usize = 100;

/// Best-effort conversion of a literal-looking string into a structured value.
///
/// Non-text values and text that does not parse come back unchanged. A literal
/// that evaluates to text (`"('[1]')"`) is coerced again, so the result is
/// never a string that would itself parse.
pub fn coerce(value: Value) -> Value {
    match value {
        Value::String(text) => match parse_literal(&text) {
            Ok(parsed) => coerce(parsed),
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

/// In-place variant of [`coerce`].
pub fn coerce_in_place(value: &mut Value) {
    if let Value::String(text) = value {
        if let Ok(parsed) = parse_literal(text) {
            *value = coerce(parsed);
        }
    }
}

/// Whether the trimmed text opens with `[`, `{` or `(` and ends with the
/// matching closer.
pub fn looks_bracketed(text: &str) -> bool {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) => BRACKET_PAIRS
            .iter()
            .any(|&(o, c)| o == open && c == close),
        _ => false,
    }
}

/// Parse a bracketed literal. Offsets in errors are byte offsets into `text`.
pub fn parse_literal(text: &str) -> Result<Value, LiteralError> {
    if !looks_bracketed(text) {
        return Err(LiteralError::NotBracketed);
    }

    let trimmed = text.trim();
    let leading = text.len() - text.trim_start().len();

    match literal(0, trimmed) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((rest, _)) => Err(LiteralError::TrailingInput {
            offset: leading + trimmed.len() - rest.len(),
        }),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            let consumed = err
                .errors
                .first()
                .map(|(rest, _)| trimmed.len() - rest.len())
                .unwrap_or(0);
            Err(LiteralError::Syntax {
                offset: leading + consumed,
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(LiteralError::Syntax {
            offset: leading + trimmed.len(),
        }),
    }
}

fn reject<T>(input: &str, kind: ErrorKind) -> ParserResult<T> {
    Err(nom::Err::Error(ParserError::from_error_kind(input, kind)))
}

/// Depth of the container just opened, or a hard failure past [`MAX_DEPTH`].
fn nested(depth: usize, input: &str) -> Result<usize, nom::Err<ParserError>> {
    if depth >= MAX_DEPTH {
        Err(nom::Err::Failure(ParserError::from_error_kind(
            input,
            ErrorKind::TooLarge,
        )))
    } else {
        Ok(depth + 1)
    }
}

fn literal(depth: usize, input: &str) -> ParserResult<Value> {
    delimited(
        multispace0,
        alt((
            move |i| list(depth, i),
            move |i| parenthesized(depth, i),
            move |i| braced(depth, i),
            map(quoted, Value::String),
            keyword,
            number,
        )),
        multispace0,
    )(input)
}

fn keyword(input: &str) -> ParserResult<Value> {
    alt((
        constant(Value::Null, tag("None")),
        constant(Value::Bool(true), tag("True")),
        constant(Value::Bool(false), tag("False")),
    ))(input)
}

fn number(input: &str) -> ParserResult<Value> {
    let (rest, text) = recognize::<_, _, ParserError, _>(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    match number_value(text) {
        Some(parsed) => Ok((rest, parsed)),
        None => reject(input, ErrorKind::Float),
    }
}

fn number_value(text: &str) -> Option<Value> {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(int) = unsigned.parse::<i64>() {
            return Some(Value::from(int));
        }
    }
    // Integers too wide for i64 degrade to floats; inf/nan have no JSON form.
    unsigned
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn quoted(input: &str) -> ParserResult<String> {
    let quote = match input.chars().next() {
        Some(c @ ('\'' | '"')) => c,
        _ => return reject(input, ErrorKind::Char),
    };

    let mut text = String::new();
    let mut chars = input.char_indices().skip(1).peekable();
    while let Some((idx, c)) = chars.next() {
        if c == quote {
            return Ok((&input[idx + c.len_utf8()..], text));
        }
        match c {
            '\n' => break,
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    'a' => text.push('\u{07}'),
                    'b' => text.push('\u{08}'),
                    'f' => text.push('\u{0c}'),
                    'v' => text.push('\u{0b}'),
                    // line continuation
                    '\n' => {}
                    '\\' | '\'' | '"' => text.push(escaped),
                    '0'..='7' => {
                        let mut code = escaped.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match chars.peek().and_then(|&(_, d)| d.to_digit(8)) {
                                Some(digit) => {
                                    code = code * 8 + digit;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        match char::from_u32(code) {
                            Some(decoded) => text.push(decoded),
                            None => return reject(&input[idx..], ErrorKind::Escaped),
                        }
                    }
                    'x' | 'u' | 'U' => {
                        let width = match escaped {
                            'x' => 2,
                            'u' => 4,
                            _ => 8,
                        };
                        let digits: String =
                            chars.by_ref().take(width).map(|(_, d)| d).collect();
                        let decoded = if digits.len() == width
                            && digits.chars().all(|d| d.is_ascii_hexdigit())
                        {
                            u32::from_str_radix(&digits, 16)
                                .ok()
                                .and_then(char::from_u32)
                        } else {
                            None
                        };
                        match decoded {
                            Some(decoded) => text.push(decoded),
                            None => return reject(&input[idx..], ErrorKind::Escaped),
                        }
                    }
                    // unknown escapes, `\N{...}` included, are kept verbatim
                    other => {
                        text.push('\\');
                        text.push(other);
                    }
                }
            }
            other => text.push(other),
        }
    }

    reject(input, ErrorKind::Char)
}

/// Comma separated literals up to (not including) the closing bracket.
/// A single trailing comma is accepted after at least one element.
fn elements(depth: usize, input: &str) -> ParserResult<Vec<Value>> {
    let (input, first) = opt(|i| literal(depth, i))(input)?;
    let Some(first) = first else {
        return Ok((input, Vec::new()));
    };
    let (input, rest) = many0(preceded(char(','), |i| literal(depth, i)))(input)?;
    let (input, _) = opt(|i| symbol(',', i))(input)?;

    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push(first);
    items.extend(rest);
    Ok((input, items))
}

fn symbol(c: char, input: &str) -> ParserResult<char> {
    char(c)(input)
}

fn closing(bracket: char, input: &str) -> ParserResult<char> {
    preceded(multispace0, char(bracket))(input)
}

fn list(depth: usize, input: &str) -> ParserResult<Value> {
    let (input, _) = symbol('[', input)?;
    let depth = nested(depth, input)?;
    let (input, items) = elements(depth, input)?;
    let (input, _) = closing(']', input)?;
    Ok((input, Value::Array(items)))
}

/// `()` and `(a, ...)` are tuples; `(a)` is just `a`.
fn parenthesized(depth: usize, input: &str) -> ParserResult<Value> {
    let (input, _) = symbol('(', input)?;
    let depth = nested(depth, input)?;
    let (input, first) = opt(|i| literal(depth, i))(input)?;
    let Some(first) = first else {
        let (input, _) = closing(')', input)?;
        return Ok((input, Value::Array(Vec::new())));
    };

    if let Ok((input, _)) = closing(')', input) {
        return Ok((input, first));
    }
    let (input, _) = symbol(',', input)?;
    let (input, mut items) = elements(depth, input)?;
    let (input, _) = closing(')', input)?;
    items.insert(0, first);
    Ok((input, Value::Array(items)))
}

fn braced(depth: usize, input: &str) -> ParserResult<Value> {
    let (input, _) = symbol('{', input)?;
    let depth = nested(depth, input)?;
    let (input, first) = opt(|i| literal(depth, i))(input)?;
    let Some(first) = first else {
        let (input, _) = closing('}', input)?;
        return Ok((input, Value::Object(Map::new())));
    };

    match symbol(':', input) {
        Ok((input, _)) => dict_body(depth, input, first),
        Err(_) => set_body(depth, input, first),
    }
}

fn dict_body(depth: usize, input: &str, first_key: Value) -> ParserResult<Value> {
    let mut entries = Map::new();
    let (mut input, first_value) = literal(depth, input)?;
    entries.insert(key_text(input, first_key)?, first_value);

    loop {
        let Ok((after_comma, _)) = symbol(',', input) else {
            break;
        };
        let (after_key, key) = match literal(depth, after_comma) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(_)) => {
                // trailing comma
                input = after_comma;
                break;
            }
            Err(err) => return Err(err),
        };
        let (after_colon, _) = symbol(':', after_key)?;
        let (after_value, value) = literal(depth, after_colon)?;
        entries.insert(key_text(after_key, key)?, value);
        input = after_value;
    }

    let (input, _) = closing('}', input)?;
    Ok((input, Value::Object(entries)))
}

fn set_body(depth: usize, input: &str, first: Value) -> ParserResult<Value> {
    let (input, rest) = many0(preceded(char(','), |i| literal(depth, i)))(input)?;
    let (input, _) = opt(|i| symbol(',', i))(input)?;
    let (input, _) = closing('}', input)?;

    let mut members: Vec<Value> = Vec::with_capacity(rest.len() + 1);
    for item in std::iter::once(first).chain(rest) {
        if item.is_array() || item.is_object() {
            return reject(input, ErrorKind::Verify);
        }
        if !members.contains(&item) {
            members.push(item);
        }
    }
    Ok((input, Value::Array(members)))
}

/// JSON object keys are text; scalar literal keys keep their literal spelling.
fn key_text<'a>(input: &'a str, key: Value) -> Result<String, nom::Err<ParserError<'a>>> {
    match key {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Null => Ok("None".to_string()),
        Value::Array(_) | Value::Object(_) => Err(nom::Err::Error(
            ParserError::from_error_kind(input, ErrorKind::Verify),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn test_location_list_is_parsed() {
        assert_eq!(coerce(text("[10.5, 20.0]")), json!([10.5, 20.0]));
    }

    #[test]
    fn test_plain_text_is_left_alone() {
        assert_eq!(coerce(text("not-a-list")), text("not-a-list"));
        assert_eq!(coerce(text("")), text(""));
        assert_eq!(coerce(text("[")), text("["));
    }

    #[test]
    fn test_non_text_passes_through() {
        assert_eq!(coerce(json!(42)), json!(42));
        assert_eq!(coerce(json!([1, 2])), json!([1, 2]));
        assert_eq!(coerce(Value::Null), Value::Null);
    }

    #[test]
    fn test_python_style_literals() {
        assert_eq!(coerce(text("['a', \"b\"]")), json!(["a", "b"]));
        assert_eq!(coerce(text("[None, True, False]")), json!([null, true, false]));
        assert_eq!(
            coerce(text("{'formation': 433, 'lineup': [{'player': {'id': 1}}]}")),
            json!({"formation": 433, "lineup": [{"player": {"id": 1}}]})
        );
        assert_eq!(coerce(text("[-1, +2, .5, 5., 1e3]")), json!([-1, 2, 0.5, 5.0, 1000.0]));
    }

    #[test]
    fn test_tuples() {
        assert_eq!(coerce(text("(1, 2)")), json!([1, 2]));
        assert_eq!(coerce(text("(1,)")), json!([1]));
        assert_eq!(coerce(text("()")), json!([]));
    }

    #[test]
    fn test_grouping_parentheses_yield_the_inner_value() {
        assert_eq!(coerce(text("(1)")), json!(1));
        assert_eq!(coerce(text("((1, 2))")), json!([1, 2]));
        assert_eq!(coerce(text("[(1)]")), json!([1]));
        assert_eq!(coerce(text("( 'a' )")), json!("a"));
        assert_eq!(coerce(text("({'k': (None)})")), json!({"k": null}));
    }

    #[test]
    fn test_text_results_are_coerced_until_settled() {
        assert_eq!(coerce(text("('[1, 2]')")), json!([1, 2]));
        assert_eq!(coerce(text("('(3)')")), json!(3));
        assert_eq!(coerce(text("('[oops')")), json!("[oops"));

        let once = coerce(text("('(\\'[5]\\')')"));
        assert_eq!(once, json!([5]));
        assert_eq!(coerce(once.clone()), once);
    }

    #[test]
    fn test_nesting_depth_limit() {
        let at_limit = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&at_limit).is_ok());

        let over_limit = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse_literal(&over_limit),
            Err(LiteralError::Syntax { .. })
        ));

        for (open, close) in [("[", "]"), ("(", ")"), ("{", "}")] {
            let deep = format!("{}{}", open.repeat(10_000), close.repeat(10_000));
            assert_eq!(coerce(text(&deep)), text(&deep));
        }

        let mixed = format!("{}1{}", "[{'a': (".repeat(5_000), ",)}]".repeat(5_000));
        assert_eq!(coerce(text(&mixed)), text(&mixed));
    }

    #[test]
    fn test_sets_and_scalar_keys() {
        assert_eq!(coerce(text("{1, 2, 2}")), json!([1, 2]));
        assert_eq!(coerce(text("{}")), json!({}));
        assert_eq!(
            coerce(text("{1: 'a', 2.5: 'b', None: 'c', True: 'd'}")),
            json!({"1": "a", "2.5": "b", "None": "c", "True": "d"})
        );
    }

    #[test]
    fn test_whitespace_and_trailing_commas() {
        assert_eq!(coerce(text("  [ 1 , 2 , ]  ")), json!([1, 2]));
        assert_eq!(coerce(text("{ 'a' : 1, }")), json!({"a": 1}));
        assert_eq!(coerce(text("[ ]")), json!([]));
    }

    #[test]
    fn test_malformed_literals_are_kept_as_text() {
        for raw in ["[1,,2]", "[1, 2", "{'a': }", "[1] + [2]", "[foo]", "{[1]: 2}", "(,)", "[1e400]"] {
            assert_eq!(coerce(text(raw)), text(raw), "{raw} should stay text");
        }
    }

    #[test]
    fn test_returned_text_keeps_original_whitespace() {
        assert_eq!(coerce(text("  [oops]  ")), text("  [oops]  "));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            coerce(text(r#"['it\'s', "tab\there", '\x41é', 'back\\slash']"#)),
            json!(["it's", "tab\there", "Aé", "back\\slash"])
        );
        assert_eq!(coerce(text("['unterminated]")), text("['unterminated]"));
    }

    #[test]
    fn test_control_and_octal_escapes() {
        assert_eq!(
            coerce(text(r"['\a\b\f\v', '\0', '\012', '\101x', '\08']")),
            json!(["\u{07}\u{08}\u{0c}\u{0b}", "\0", "\n", "Ax", "\08"])
        );
        assert_eq!(coerce(text(r"['\U0001F600', '\N{BULLET}']")), json!(["😀", "\\N{BULLET}"]));
        assert_eq!(coerce(text(r"['\U0011FFFF']")), text(r"['\U0011FFFF']"));
    }

    #[test]
    fn test_parse_error_offsets() {
        assert_eq!(parse_literal("not bracketed"), Err(LiteralError::NotBracketed));
        assert_eq!(
            parse_literal("[1] [2]"),
            Err(LiteralError::TrailingInput { offset: 4 })
        );
        let err = parse_literal(" [1, }]").unwrap_err();
        assert!(matches!(err, LiteralError::Syntax { .. }));
        assert!(err.offset().is_some());
    }

    #[test]
    fn test_large_integers_degrade_to_float() {
        assert_eq!(
            coerce(text("[92233720368547758070]")),
            json!([92233720368547758070.0_f64])
        );
    }

    #[test]
    fn test_coerce_in_place() {
        let mut value = text("(3, 4)");
        coerce_in_place(&mut value);
        assert_eq!(value, json!([3, 4]));

        let mut value = text("plain");
        coerce_in_place(&mut value);
        assert_eq!(value, text("plain"));
    }
}
