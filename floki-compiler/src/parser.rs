// floki-compiler/src/parser.rs
// Line parser for Floki behavior sources

use crate::ast::*;
use crate::error::CompileError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, value},
    multi::separated_list1,
    number::complete::recognize_float,
    sequence::{delimited, preceded},
    IResult, Parser,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unrecognized declaration, expected `state`, `gait` or `event`")]
    Unrecognized,
    #[error("malformed {keyword} declaration near {near}, expected `{usage}`")]
    Malformed {
        keyword: &'static str,
        usage: &'static str,
        near: String,
    },
    #[error("unexpected trailing text `{0}`")]
    Trailing(String),
    #[error("event needs at least two tokens joined by `->`")]
    ShortChain,
    #[error("{0} is empty")]
    Empty(&'static str),
    #[error("{0} contains a NUL byte")]
    Nul(&'static str),
}

impl ParseError {
    /// Attach the offending source line.
    pub fn at(self, line: usize, content: &str) -> CompileError {
        CompileError::Syntax {
            line,
            content: content.to_string(),
            message: self.to_string(),
        }
    }
}

const STATE_USAGE: &str = "state <name>(<params>)";
const GAIT_USAGE: &str = "gait <name>";
const EVENT_USAGE: &str = "event <token> -> <token> [-> <token> ...]";

/// Parses a single source line. Blank and comment-only lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Declaration>, ParseError> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return Ok(None);
    }

    let keyword = line.split_whitespace().next().unwrap_or_default();
    let declaration = match keyword {
        "state" => Declaration::State(finish(run("state", STATE_USAGE, parse_state_decl, line)?)?),
        "gait" => Declaration::Gait(finish(run("gait", GAIT_USAGE, parse_gait_decl, line)?)?),
        "event" => {
            let (event, rest) = run("event", EVENT_USAGE, parse_event_decl, line)?;
            if event.chain.len() < 2 {
                return Err(ParseError::ShortChain);
            }
            Declaration::Event(finish((event, rest))?)
        }
        _ => return Err(ParseError::Unrecognized),
    };

    validate(&declaration)?;
    Ok(Some(declaration))
}

/// Parses a whole source up front. Used for AST dumps; compilation itself
/// parses line by line as it goes.
pub fn parse_source(source: &str) -> Result<Vec<Spanned<Declaration>>, CompileError> {
    let mut declarations = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        if let Some(node) = parse_line(text).map_err(|e| e.at(line, text.trim()))? {
            declarations.push(Spanned { line, node });
        }
    }
    Ok(declarations)
}

/// Cuts a `#` or `//` comment that starts outside a quoted name.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut chars = line.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..at],
            '/' if !in_quotes && matches!(chars.peek(), Some((_, '/'))) => return &line[..at],
            _ => {}
        }
    }
    line
}

fn run<'a, T>(
    keyword: &'static str,
    usage: &'static str,
    parser: fn(&'a str) -> IResult<&'a str, T>,
    line: &'a str,
) -> Result<(T, &'a str), ParseError> {
    match parser(line) {
        Ok((rest, node)) => Ok((node, rest)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::Malformed {
            keyword,
            usage,
            near: describe(e.input),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::Malformed {
            keyword,
            usage,
            near: "end of line".to_string(),
        }),
    }
}

fn finish<T>((node, rest): (T, &str)) -> Result<T, ParseError> {
    if rest.is_empty() {
        Ok(node)
    } else {
        Err(ParseError::Trailing(rest.to_string()))
    }
}

fn describe(rest: &str) -> String {
    if rest.trim().is_empty() {
        "end of line".to_string()
    } else {
        format!("`{}`", rest.trim())
    }
}

fn validate(declaration: &Declaration) -> Result<(), ParseError> {
    fn check(text: &str, what: &'static str) -> Result<(), ParseError> {
        if text.contains('\0') {
            return Err(ParseError::Nul(what));
        }
        Ok(())
    }
    fn check_name(name: &str, what: &'static str) -> Result<(), ParseError> {
        if name.is_empty() {
            return Err(ParseError::Empty(what));
        }
        check(name, what)
    }

    match declaration {
        Declaration::State(state) => {
            check_name(&state.name, "state name")?;
            check(&state.params, "state params")
        }
        Declaration::Gait(gait) => check_name(&gait.name, "gait name"),
        Declaration::Event(event) => event
            .chain
            .iter()
            .try_for_each(|token| check_name(&token.name, "event token")),
    }
}

// state = "state" name [ "(" params ")" ]
fn parse_state_decl(input: &str) -> IResult<&str, StateDecl> {
    let (input, _) = tag("state")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = parse_name(input)?;
    let (input, _) = multispace0(input)?;
    let (input, params) = opt(parse_params).parse(input)?;
    let (input, _) = multispace0(input)?;

    Ok((
        input,
        StateDecl {
            name,
            params: params.unwrap_or_default(),
        },
    ))
}

// params = everything up to the last ")" on the line
fn parse_params(input: &str) -> IResult<&str, String> {
    let (input, _) = char('(')(input)?;
    match input.rfind(')') {
        Some(end) => Ok((&input[end + 1..], input[..end].trim().to_string())),
        None => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        ))),
    }
}

// gait = "gait" name
fn parse_gait_decl(input: &str) -> IResult<&str, GaitDecl> {
    let (input, _) = tag("gait")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = parse_name(input)?;
    let (input, _) = multispace0(input)?;

    Ok((input, GaitDecl { name }))
}

// event = "event" token { "->" token }
fn parse_event_decl(input: &str) -> IResult<&str, EventDecl> {
    let (input, _) = tag("event")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, chain) = separated_list1(
        delimited(multispace0, tag("->"), multispace0),
        parse_event_token,
    )
    .parse(input)?;
    let (input, _) = multispace0(input)?;

    Ok((input, EventDecl { chain }))
}

// token = name [ comparison operand ]
fn parse_event_token(input: &str) -> IResult<&str, EventToken> {
    let (input, name) = parse_name(input)?;
    let (input, guard) = opt(preceded(multispace0, parse_guard)).parse(input)?;

    Ok((input, EventToken { name, guard }))
}

fn parse_guard(input: &str) -> IResult<&str, Guard> {
    let (input, op) = parse_comparison(input)?;
    let (input, _) = multispace0(input)?;
    let (input, operand) = alt((recognize_float, parse_bare)).parse(input)?;

    Ok((
        input,
        Guard {
            op,
            operand: operand.to_string(),
        },
    ))
}

fn parse_comparison(input: &str) -> IResult<&str, Comparison> {
    alt((
        value(Comparison::Ge, tag(">=")),
        value(Comparison::Le, tag("<=")),
        value(Comparison::Eq, tag("==")),
        value(Comparison::Ne, tag("!=")),
        value(Comparison::Gt, tag(">")),
        value(Comparison::Lt, tag("<")),
    ))
    .parse(input)
}

// name = quoted | bare, quotes stripped and contents trimmed
fn parse_name(input: &str) -> IResult<&str, String> {
    alt((
        map(parse_quoted, |s: &str| s.trim().to_string()),
        map(parse_bare, |s: &str| s.to_string()),
    ))
    .parse(input)
}

fn parse_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"')).parse(input)
}

fn parse_bare(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str, params: &str) -> Declaration {
        Declaration::State(StateDecl {
            name: name.to_string(),
            params: params.to_string(),
        })
    }

    #[test]
    fn test_state_with_and_without_params() {
        assert_eq!(
            parse_line(r#"state "stand_up"(strength=1.0)"#).unwrap(),
            Some(state("stand_up", "strength=1.0"))
        );
        assert_eq!(
            parse_line(r#"state "lie_down""#).unwrap(),
            Some(state("lie_down", ""))
        );
        assert_eq!(
            parse_line("  state crouch ( depth=0.3, speed=f(2) )  ").unwrap(),
            Some(state("crouch", "depth=0.3, speed=f(2)"))
        );
    }

    #[test]
    fn test_gait_strips_quotes() {
        assert_eq!(
            parse_line(r#"gait "walk""#).unwrap(),
            Some(Declaration::Gait(GaitDecl {
                name: "walk".to_string()
            }))
        );
        assert_eq!(
            parse_line("gait trot fast"),
            Err(ParseError::Trailing("fast".to_string()))
        );
    }

    #[test]
    fn test_event_chain_with_guard() {
        let decl = parse_line(r#"event imu_pitch > 20 -> "stand_up" -> "walk""#)
            .unwrap()
            .unwrap();
        let Declaration::Event(event) = decl else {
            panic!("expected event");
        };
        let names: Vec<_> = event.chain.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["imu_pitch", "stand_up", "walk"]);
        assert_eq!(
            event.chain[0].guard,
            Some(Guard {
                op: Comparison::Gt,
                operand: "20".to_string()
            })
        );
        assert!(event.chain[1].guard.is_none());
    }

    #[test]
    fn test_event_without_spaces_and_two_char_operators() {
        let Some(Declaration::Event(event)) = parse_line("event touch>=-1.5->sit").unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.chain.len(), 2);
        assert_eq!(event.chain[0].name, "touch");
        assert_eq!(event.chain[0].guard.as_ref().unwrap().op, Comparison::Ge);
        assert_eq!(event.chain[0].guard.as_ref().unwrap().operand, "-1.5");
        assert_eq!(event.chain[1].name, "sit");
    }

    #[test]
    fn test_short_event_chains_fail() {
        assert_eq!(parse_line("event imu_pitch"), Err(ParseError::ShortChain));
        assert_eq!(parse_line("event imu_pitch ->"), Err(ParseError::ShortChain));
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t").unwrap(), None);
        assert_eq!(parse_line("# robot behaviors").unwrap(), None);
        assert_eq!(parse_line("// params optional").unwrap(), None);
        assert_eq!(
            parse_line(r#"gait "w#lk" # comment"#).unwrap(),
            Some(Declaration::Gait(GaitDecl {
                name: "w#lk".to_string()
            }))
        );
    }

    #[test]
    fn test_unrecognized_and_malformed_lines() {
        assert_eq!(parse_line("stat idle"), Err(ParseError::Unrecognized));
        assert_eq!(parse_line("states idle"), Err(ParseError::Unrecognized));
        assert!(matches!(
            parse_line("state idle(strength=1"),
            Err(ParseError::Malformed { keyword: "state", .. })
        ));
        assert_eq!(parse_line(r#"gait """#), Err(ParseError::Empty("gait name")));
        assert!(matches!(
            parse_line("state"),
            Err(ParseError::Unrecognized) | Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn test_bare_names_are_ascii_only() {
        assert!(matches!(
            parse_line("state é"),
            Err(ParseError::Malformed { keyword: "state", .. })
        ));
        assert_eq!(
            parse_line("gait café"),
            Err(ParseError::Trailing("é".to_string()))
        );
        assert!(parse_line("event imu -> sté").is_err());
        // quoting still admits any characters
        assert_eq!(
            parse_line(r#"state "é""#).unwrap(),
            Some(state("é", ""))
        );
    }

    #[test]
    fn test_parse_source_reports_line_numbers() {
        let source = "state a\n\ngait b\nbogus line\n";
        let err = parse_source(source).unwrap_err();
        assert_eq!(err.line(), Some(4));

        let ok = parse_source("state a\n\ngait b\n").unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[1].line, 3);
    }
}
