//! Formula grammar
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-'* power
//! power   := primary ('**' unary)?
//! primary := number | ident '(' expr (',' expr)* ')' | ident | '(' expr ')'
//! ```
//!
//! Each rule returns the tokens it consumed, so a successful parse yields the
//! full token stream of a well-formed formula.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

use crate::expr::token::{BinaryOp, Token};

/// Deepest allowed nesting of groups, call arguments and exponents
pub const MAX_DEPTH: usize = 64;

type Tokens = Vec<Token>;

/// Tokenize a whole formula, failing on any trailing input
pub fn tokenize(input: &str) -> Result<Tokens, String> {
    match all_consuming(ws(|i| expression(i, 0)))(input) {
        Ok((_, tokens)) => Ok(tokens),
        Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => Err(format!(
            "expression nested too deeply (limit {})",
            MAX_DEPTH
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let rest = e.input.trim();
            if rest.is_empty() {
                Err("unexpected end of expression".to_string())
            } else {
                Err(format!("unexpected input at '{}'", rest))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err("unexpected end of expression".to_string()),
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Enter one more nesting level, failing hard past [`MAX_DEPTH`]
fn descend(input: &str, depth: usize) -> Result<usize, nom::Err<Error<&str>>> {
    if depth >= MAX_DEPTH {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
    }
    Ok(depth + 1)
}

fn expression(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, mut tokens) = term(input, depth)?;
    let (input, rest) = many0(pair(ws(additive_op), |i| term(i, depth)))(input)?;

    for (op, operand) in rest {
        tokens.push(Token::Operator(op));
        tokens.extend(operand);
    }
    Ok((input, tokens))
}

fn term(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, mut tokens) = unary(input, depth)?;
    let (input, rest) = many0(pair(ws(multiplicative_op), |i| unary(i, depth)))(input)?;

    for (op, operand) in rest {
        tokens.push(Token::Operator(op));
        tokens.extend(operand);
    }
    Ok((input, tokens))
}

fn unary(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, negations) = many0(ws(char('-')))(input)?;
    let (input, operand) = power(input, depth)?;

    let mut tokens: Tokens = negations.iter().map(|_| Token::Negate).collect();
    tokens.extend(operand);
    Ok((input, tokens))
}

fn power(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, mut tokens) = primary(input, depth)?;
    let (input, pow) = opt(ws(tag("**")))(input)?;
    if pow.is_none() {
        return Ok((input, tokens));
    }

    let depth = descend(input, depth)?;
    let (input, exponent) = unary(input, depth)?;
    tokens.push(Token::Operator(BinaryOp::Pow));
    tokens.extend(exponent);
    Ok((input, tokens))
}

fn primary(input: &str, depth: usize) -> IResult<&str, Tokens> {
    ws(alt((
        map(number, |n: &str| vec![Token::Number(n.to_string())]),
        |i| call_or_variable(i, depth),
        |i| group(i, depth),
    )))(input)
}

fn group(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, _) = char('(')(input)?;
    let depth = descend(input, depth)?;
    let (input, inner) = ws(|i| expression(i, depth))(input)?;
    let (input, _) = char(')')(input)?;

    let mut tokens = vec![Token::LeftParen];
    tokens.extend(inner);
    tokens.push(Token::RightParen);
    Ok((input, tokens))
}

fn call_or_variable(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, name) = identifier(input)?;
    let (after_ws, _) = multispace0(input)?;
    let (input, args) = opt(|i| arguments(i, depth))(after_ws)?;

    let tokens = match args {
        Some(args) => {
            let mut tokens = vec![Token::Function(name.to_string()), Token::LeftParen];
            tokens.extend(args);
            tokens.push(Token::RightParen);
            tokens
        }
        None => vec![Token::Variable(name.to_string())],
    };
    Ok((input, tokens))
}

fn arguments(input: &str, depth: usize) -> IResult<&str, Tokens> {
    let (input, _) = char('(')(input)?;
    let depth = descend(input, depth)?;
    let (input, args) = separated_list1(char(','), ws(|i| expression(i, depth)))(input)?;
    let (input, _) = char(')')(input)?;

    let mut tokens = Tokens::new();
    for (idx, arg) in args.into_iter().enumerate() {
        if idx > 0 {
            tokens.push(Token::Comma);
        }
        tokens.extend(arg);
    }
    Ok((input, tokens))
}

fn additive_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Add, char('+')),
        value(BinaryOp::Sub, char('-')),
    ))(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Mul, terminated(char('*'), not(char('*')))),
        value(BinaryOp::Div, char('/')),
        value(BinaryOp::Mod, char('%')),
    ))(input)
}

/// Identifier (query name or function name)
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Integer, decimal or exponent literal
fn number(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((digit1, opt(pair(char('.'), digit0)), opt(exponent)))),
        recognize(tuple((char('.'), digit1, opt(exponent)))),
    ))(input)
}

fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}
