//! Formula Expressions
//!
//! Parser front end for the arithmetic formulas that combine named metric
//! queries. Nothing is evaluated here: a formula is parsed into a token
//! stream so the query builder can find the queries it references and
//! rewrite them into column references.
//!
//! # Syntax
//!
//! ```text
//! A
//! A / B * 100
//! (A + B) / 2
//! -A ** 2
//! log10(A) - sqrt(B, 2)
//! ```

mod parser;
mod token;

pub use token::{reconstruct, BinaryOp, Token};

use crate::query::{BuildError, BuildResult};

/// Math functions the store can evaluate inside a formula projection
pub const SUPPORTED_FUNCTIONS: &[&str] = &[
    "exp", "log", "ln", "exp2", "log2", "exp10", "log10", "sqrt", "cbrt", "erf", "erfc", "lgamma",
    "tgamma", "sin", "cos", "tan", "asin", "acos", "atan", "degrees", "radians",
];

/// A parsed formula
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    tokens: Vec<Token>,
    variables: Vec<String>,
}

impl Expression {
    /// Original formula text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Token stream in source order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Distinct variable names in order of first appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The variable name when the whole formula is a bare reference
    pub fn as_single_variable(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [token] => token.as_variable(),
            _ => None,
        }
    }

    /// Token stream with every variable replaced by `f(name)`
    pub fn map_variables<F>(&self, f: F) -> Vec<Token>
    where
        F: Fn(&str) -> String,
    {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Variable(name) => Token::Variable(f(name)),
                other => other.clone(),
            })
            .collect()
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", reconstruct(&self.tokens))
    }
}

/// Parse formula text
pub fn parse(formula: &str) -> BuildResult<Expression> {
    if formula.trim().is_empty() {
        return Err(BuildError::parse(formula, "empty expression"));
    }

    let tokens = parser::tokenize(formula).map_err(|reason| BuildError::parse(formula, reason))?;

    if let Some(name) = tokens.iter().find_map(|token| match token {
        Token::Function(name) if !SUPPORTED_FUNCTIONS.contains(&name.as_str()) => Some(name),
        _ => None,
    }) {
        return Err(BuildError::parse(
            formula,
            format!("unsupported function '{}'", name),
        ));
    }

    let mut variables: Vec<String> = Vec::new();
    for name in tokens.iter().filter_map(Token::as_variable) {
        if !variables.iter().any(|seen| seen == name) {
            variables.push(name.to_string());
        }
    }

    Ok(Expression {
        source: formula.to_string(),
        tokens,
        variables,
    })
}
