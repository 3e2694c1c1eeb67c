//! Formula tokens

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A lexical element of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Reference to a named metric query
    Variable(String),
    /// Numeric literal, kept in its source spelling
    Number(String),
    /// Math function name (always followed by `LeftParen`)
    Function(String),
    /// Unary minus
    Negate,
    Operator(BinaryOp),
    LeftParen,
    RightParen,
    Comma,
}

impl Token {
    /// Variable name, if this token references one
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variable(name) | Self::Number(name) | Self::Function(name) => {
                write!(f, "{}", name)
            }
            Self::Negate => write!(f, "-"),
            Self::Operator(op) => write!(f, " {} ", op),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::Comma => write!(f, ", "),
        }
    }
}

/// Render a token stream back to formula text
///
/// Binary operators get one space on each side, arguments are separated by
/// `", "`, everything else is written tight.
pub fn reconstruct(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_string).collect()
}
