//! # carburant-formula
//!
//! Formula parser and evaluator used when a workbook stores a formula
//! without its last computed value.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Evaluation against a single [`carburant_core::SheetData`]
//! - A small set of aggregate and math functions (`SUM`, `AVERAGE`, `MIN`,
//!   `MAX`, `COUNT`, `ROUND`, `ABS`, `IF`)
//!
//! ## Example
//!
//! ```rust
//! use carburant_core::{CellValue, SheetData};
//! use carburant_formula::SheetEvaluator;
//! use carburant_core::FormulaResolver;
//!
//! let mut sheet = SheetData::new("Feuil1");
//! sheet.set_value(0, 0, 120.0);
//! sheet.set_value(1, 0, 30.0);
//!
//! let value = SheetEvaluator::new().resolve(&sheet, 2, 0, "=SUM(A1:A2)").unwrap();
//! assert_eq!(value, CellValue::Number(150.0));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, EvaluationContext, FormulaValue, SheetEvaluator};
pub use parser::parse_formula;
