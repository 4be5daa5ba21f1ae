//! Operator keys carried by expressions and assignments.

use serde::{Deserialize, Serialize};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    /// DSL spelling, for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    // Bitwise
    ShiftL,
    ShiftR,
    Amp,
    /// Bitwise and-not.
    AmpHat,
    Pipe,
    Hat,
    // Comparison
    NotEq,
    Less,
    LessEq,
    EqEq,
    GreaterEq,
    Greater,
    // Logical
    And,
    Or,
    /// Type conversion; the right operand names a type.
    As,
}

impl BinaryOp {
    /// DSL spelling, for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::Slash => "/",
            BinaryOp::ShiftL => "<<",
            BinaryOp::ShiftR => ">>",
            BinaryOp::Amp => "&",
            BinaryOp::AmpHat => "&^",
            BinaryOp::Pipe => "|",
            BinaryOp::Hat => "^",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::EqEq => "==",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Greater => ">",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::As => "as",
        }
    }
}

/// Associative operators, applied to two or more operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssocOp {
    Plus,
    Star,
    Amp,
    Pipe,
    Hat,
    And,
    Or,
}

impl AssocOp {
    /// DSL spelling, for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssocOp::Plus => "+",
            AssocOp::Star => "*",
            AssocOp::Amp => "&",
            AssocOp::Pipe => "|",
            AssocOp::Hat => "^",
            AssocOp::And => "and",
            AssocOp::Or => "or",
        }
    }
}

/// Simple and compound assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    ShiftLEq,
    ShiftREq,
    AmpEq,
    AmpHatEq,
    PipeEq,
    HatEq,
}

impl AssignOp {
    /// DSL spelling, for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Eq => "=",
            AssignOp::PlusEq => "+=",
            AssignOp::MinusEq => "-=",
            AssignOp::StarEq => "*=",
            AssignOp::SlashEq => "/=",
            AssignOp::ShiftLEq => "<<=",
            AssignOp::ShiftREq => ">>=",
            AssignOp::AmpEq => "&=",
            AssignOp::AmpHatEq => "&^=",
            AssignOp::PipeEq => "|=",
            AssignOp::HatEq => "^=",
        }
    }
}
