//! Formula Abstract Syntax Tree types

use carburant_core::{CellAddress, CellRange};

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    Number(f64),
    String(String),
    Boolean(bool),

    /// Single cell reference
    CellRef(CellReference),
    /// Range reference
    RangeRef(RangeReference),

    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    /// Function call; the name is upper-cased by the parser
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

/// Range reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    Concat,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}
