//! Formula evaluator
//!
//! Evaluates formula ASTs against a single sheet. Spreadsheet error results
//! (`#DIV/0!`, `#VALUE!`, ...) surface as [`FormulaError::Evaluation`]
//! carrying the error literal.

use std::cell::RefCell;
use std::cmp::Ordering;

use carburant_core::{CellValue, FormulaResolver, RawCell, SheetData};

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::parser::parse_formula;

/// Nested formula evaluations allowed before giving up
const MAX_DEPTH: usize = 64;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    /// Values of a range, row by row
    Array(Vec<FormulaValue>),
    Empty,
}

impl FormulaValue {
    /// Force conversion to number for arithmetic
    pub fn to_number(&self) -> FormulaResult<f64> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Empty => Ok(0.0),
            FormulaValue::String(s) => s.trim().parse().map_err(|_| value_error()),
            FormulaValue::Array(_) => Err(value_error()),
        }
    }

    /// Convert to boolean
    pub fn to_bool(&self) -> FormulaResult<bool> {
        match self {
            FormulaValue::Boolean(b) => Ok(*b),
            FormulaValue::Number(n) => Ok(*n != 0.0),
            FormulaValue::Empty => Ok(false),
            FormulaValue::String(s) => match s.to_uppercase().as_str() {
                "TRUE" | "VRAI" => Ok(true),
                "FALSE" | "FAUX" => Ok(false),
                _ => Err(value_error()),
            },
            FormulaValue::Array(_) => Err(value_error()),
        }
    }

    /// Convert to text for concatenation
    pub fn to_text(&self) -> FormulaResult<String> {
        match self {
            FormulaValue::Number(n) => Ok(CellValue::Number(*n).render()),
            FormulaValue::String(s) => Ok(s.clone()),
            FormulaValue::Boolean(b) => Ok(CellValue::Boolean(*b).render()),
            FormulaValue::Empty => Ok(String::new()),
            FormulaValue::Array(_) => Err(value_error()),
        }
    }

    fn into_cell_value(self) -> FormulaResult<CellValue> {
        match self {
            FormulaValue::Number(n) if !n.is_finite() => Err(num_error()),
            FormulaValue::Number(n) => Ok(CellValue::Number(n)),
            FormulaValue::String(s) => Ok(CellValue::Text(s)),
            FormulaValue::Boolean(b) => Ok(CellValue::Boolean(b)),
            // a formula pointing at a blank cell shows 0
            FormulaValue::Empty => Ok(CellValue::Number(0.0)),
            FormulaValue::Array(_) => Err(value_error()),
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::Date { serial, .. } => FormulaValue::Number(serial),
            CellValue::Text(s) => FormulaValue::String(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
        }
    }
}

fn value_error() -> FormulaError {
    FormulaError::Evaluation("#VALUE!".into())
}

fn num_error() -> FormulaError {
    FormulaError::Evaluation("#NUM!".into())
}

fn div0_error() -> FormulaError {
    FormulaError::Evaluation("#DIV/0!".into())
}

/// Context for formula evaluation: the sheet plus the formula cells
/// currently being evaluated, for cycle detection
pub struct EvaluationContext<'a> {
    sheet: &'a SheetData,
    in_progress: RefCell<Vec<(u32, u16)>>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(sheet: &'a SheetData) -> Self {
        Self {
            sheet,
            in_progress: RefCell::new(Vec::new()),
        }
    }

    fn check_sheet(&self, sheet: Option<&str>) -> FormulaResult<()> {
        match sheet {
            Some(name) if !name.eq_ignore_ascii_case(self.sheet.name()) => Err(
                FormulaError::InvalidReference(format!("cross-sheet reference to '{}'", name)),
            ),
            _ => Ok(()),
        }
    }

    /// Value of a cell, evaluating uncached formulas on demand
    fn cell_value(&self, row: u32, col: u16) -> FormulaResult<FormulaValue> {
        match self.sheet.get(row, col) {
            None => Ok(FormulaValue::Empty),
            Some(RawCell::Value {
                value: CellValue::Empty,
                display: Some(error),
            }) => Err(FormulaError::Evaluation(error.clone())),
            Some(RawCell::Value { value, .. }) => Ok(value.clone().into()),
            Some(RawCell::Formula {
                cached: Some(value),
                ..
            }) => Ok(value.clone().into()),
            Some(RawCell::Formula { source, .. }) => self.evaluate_cell(row, col, source),
        }
    }

    fn evaluate_cell(&self, row: u32, col: u16, source: &str) -> FormulaResult<FormulaValue> {
        {
            let mut in_progress = self.in_progress.borrow_mut();
            if in_progress.contains(&(row, col)) {
                return Err(FormulaError::CircularReference);
            }
            if in_progress.len() >= MAX_DEPTH {
                return Err(FormulaError::Evaluation(
                    "formula nesting too deep".into(),
                ));
            }
            in_progress.push((row, col));
        }

        let result = parse_formula(source).and_then(|expr| evaluate(&expr, self));
        self.in_progress.borrow_mut().pop();
        result
    }
}

/// Evaluate a formula AST
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),

        FormulaExpr::CellRef(reference) => {
            ctx.check_sheet(reference.sheet.as_deref())?;
            ctx.cell_value(reference.address.row, reference.address.col)
        }

        FormulaExpr::RangeRef(reference) => {
            ctx.check_sheet(reference.sheet.as_deref())?;
            let values = reference
                .range
                .cells()
                .map(|addr| ctx.cell_value(addr.row, addr.col))
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(FormulaValue::Array(values))
        }

        FormulaExpr::UnaryOp { op, operand } => {
            let n = evaluate(operand, ctx)?.to_number()?;
            Ok(FormulaValue::Number(match op {
                UnaryOperator::Negate => -n,
                UnaryOperator::Percent => n / 100.0,
            }))
        }

        FormulaExpr::BinaryOp { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            binary_op(*op, &left, &right)
        }

        FormulaExpr::Function { name, args } => call_function(name, args, ctx),
    }
}

fn binary_op(
    op: BinaryOperator,
    left: &FormulaValue,
    right: &FormulaValue,
) -> FormulaResult<FormulaValue> {
    use BinaryOperator::*;

    let arithmetic = |f: fn(f64, f64) -> f64| -> FormulaResult<FormulaValue> {
        let result = f(left.to_number()?, right.to_number()?);
        if result.is_finite() {
            Ok(FormulaValue::Number(result))
        } else {
            Err(num_error())
        }
    };

    match op {
        Add => arithmetic(|a, b| a + b),
        Subtract => arithmetic(|a, b| a - b),
        Multiply => arithmetic(|a, b| a * b),
        Divide => {
            let divisor = right.to_number()?;
            if divisor == 0.0 {
                return Err(div0_error());
            }
            Ok(FormulaValue::Number(left.to_number()? / divisor))
        }
        Power => arithmetic(f64::powf),
        Concat => Ok(FormulaValue::String(left.to_text()? + &right.to_text()?)),
        Equal | NotEqual | LessThan | LessEqual | GreaterThan | GreaterEqual => {
            let ordering = compare(left, right)?;
            let result = match op {
                Equal => ordering.is_eq(),
                NotEqual => ordering.is_ne(),
                LessThan => ordering.is_lt(),
                LessEqual => ordering.is_le(),
                GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(FormulaValue::Boolean(result))
        }
    }
}

/// Spreadsheet comparison: numbers < text < booleans, text compared
/// case-insensitively, blanks taking the other side's zero value
fn compare(left: &FormulaValue, right: &FormulaValue) -> FormulaResult<Ordering> {
    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Array(_) => 3,
        }
    }

    let ordering = match (left, right) {
        (FormulaValue::Array(_), _) | (_, FormulaValue::Array(_)) => return Err(value_error()),
        (FormulaValue::String(a), FormulaValue::String(b)) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (FormulaValue::String(a), FormulaValue::Empty) => {
            if a.is_empty() {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (FormulaValue::Empty, FormulaValue::String(b)) => {
            if b.is_empty() {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        (FormulaValue::Boolean(a), FormulaValue::Boolean(b)) => a.cmp(b),
        (FormulaValue::Boolean(a), FormulaValue::Empty) => a.cmp(&false),
        (FormulaValue::Empty, FormulaValue::Boolean(b)) => false.cmp(b),
        (a, b) if rank(a) == 0 && rank(b) == 0 => {
            let (a, b) = (a.to_number()?, b.to_number()?);
            a.partial_cmp(&b).ok_or_else(num_error)?
        }
        (a, b) => rank(a).cmp(&rank(b)),
    };
    Ok(ordering)
}

fn call_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    match name {
        "SUM" | "SOMME" => Ok(FormulaValue::Number(numeric_args(args, ctx)?.iter().sum())),
        "AVERAGE" | "MOYENNE" => {
            let values = numeric_args(args, ctx)?;
            if values.is_empty() {
                return Err(div0_error());
            }
            Ok(FormulaValue::Number(values.iter().sum::<f64>() / values.len() as f64))
        }
        "MIN" => {
            let values = numeric_args(args, ctx)?;
            Ok(FormulaValue::Number(
                values.into_iter().reduce(f64::min).unwrap_or(0.0),
            ))
        }
        "MAX" => {
            let values = numeric_args(args, ctx)?;
            Ok(FormulaValue::Number(
                values.into_iter().reduce(f64::max).unwrap_or(0.0),
            ))
        }
        "COUNT" | "NB" => {
            let mut count = 0usize;
            for arg in args {
                match evaluate(arg, ctx) {
                    Ok(FormulaValue::Array(values)) => {
                        count += values
                            .iter()
                            .filter(|v| matches!(v, FormulaValue::Number(_)))
                            .count();
                    }
                    Ok(value) if value.to_number().is_ok() && !matches!(value, FormulaValue::Empty) => {
                        count += 1
                    }
                    // COUNT skips errors and non-numeric arguments
                    _ => {}
                }
            }
            Ok(FormulaValue::Number(count as f64))
        }
        "ROUND" | "ARRONDI" => {
            expect_args(name, args, 2, 2, "2")?;
            let n = evaluate(&args[0], ctx)?.to_number()?;
            let digits = evaluate(&args[1], ctx)?.to_number()?.trunc() as i32;
            // f64::round rounds half away from zero
            let rounded = if digits >= 0 {
                let factor = 10f64.powi(digits);
                (n * factor).round() / factor
            } else {
                let factor = 10f64.powi(-digits);
                (n / factor).round() * factor
            };
            Ok(FormulaValue::Number(rounded))
        }
        "ABS" => {
            expect_args(name, args, 1, 1, "1")?;
            Ok(FormulaValue::Number(evaluate(&args[0], ctx)?.to_number()?.abs()))
        }
        "IF" | "SI" => {
            expect_args(name, args, 2, 3, "2 or 3")?;
            if evaluate(&args[0], ctx)?.to_bool()? {
                evaluate(&args[1], ctx)
            } else if let Some(otherwise) = args.get(2) {
                evaluate(otherwise, ctx)
            } else {
                Ok(FormulaValue::Boolean(false))
            }
        }
        _ => Err(FormulaError::UnknownFunction(name.to_string())),
    }
}

fn expect_args(
    function: &str,
    args: &[FormulaExpr],
    min: usize,
    max: usize,
    expected: &'static str,
) -> FormulaResult<()> {
    if args.len() < min || args.len() > max {
        return Err(FormulaError::ArgumentCount {
            function: function.to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

/// Numbers from the arguments of an aggregate. Inside ranges only numbers
/// count; direct arguments are coerced.
fn numeric_args(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        match evaluate(arg, ctx)? {
            FormulaValue::Array(values) => numbers.extend(values.iter().filter_map(|v| match v {
                FormulaValue::Number(n) => Some(*n),
                _ => None,
            })),
            FormulaValue::Empty => {}
            value => numbers.push(value.to_number()?),
        }
    }
    Ok(numbers)
}

/// [`FormulaResolver`] that parses and evaluates a formula against its own
/// sheet
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetEvaluator;

impl SheetEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl FormulaResolver for SheetEvaluator {
    fn resolve(
        &self,
        sheet: &SheetData,
        row: u32,
        col: u16,
        source: &str,
    ) -> carburant_core::Result<CellValue> {
        let ctx = EvaluationContext::new(sheet);
        let value = ctx.evaluate_cell(row, col, source)?;
        log::trace!("Evaluated '{}' at ({}, {}): {:?}", source, row, col, value);
        Ok(value.into_cell_value()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet() -> SheetData {
        let mut sheet = SheetData::new("Camions");
        sheet.set_value(0, 0, 500.0); // A1
        sheet.set_value(1, 0, 1200.0); // A2
        sheet.set_value(2, 0, "n/a"); // A3
        sheet.set_value(0, 1, 8000.0); // B1
        sheet.set_value(1, 1, "35"); // B2
        sheet.set(2, 1, RawCell::error("#DIV/0!")); // B3
        sheet
    }

    fn eval(source: &str) -> FormulaResult<CellValue> {
        SheetEvaluator
            .resolve(&sheet(), 10, 10, source)
            .map_err(|e| FormulaError::Evaluation(e.to_string()))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("=1+2*3").unwrap(), CellValue::Number(7.0));
        assert_eq!(eval("=A1/(B1/100)").unwrap(), CellValue::Number(6.25));
        assert_eq!(eval("=50%").unwrap(), CellValue::Number(0.5));
        assert_eq!(eval("=-A1+B2").unwrap(), CellValue::Number(-465.0));
        assert_eq!(eval("=2^10").unwrap(), CellValue::Number(1024.0));
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval("=A1/0").unwrap_err();
        assert!(err.to_string().contains("#DIV/0!"));
        assert!(eval("=A1/Z99").is_err());
    }

    #[test]
    fn test_comparisons_and_concat() {
        assert_eq!(eval("=A1<A2").unwrap(), CellValue::Boolean(true));
        assert_eq!(eval("=\"abc\"=\"ABC\"").unwrap(), CellValue::Boolean(true));
        assert_eq!(eval("=A1<>500").unwrap(), CellValue::Boolean(false));
        assert_eq!(eval("=1<\"a\"").unwrap(), CellValue::Boolean(true));
        assert_eq!(
            eval("=\"Total: \"&A1").unwrap(),
            CellValue::text("Total: 500")
        );
    }

    #[test]
    fn test_aggregates_skip_text_in_ranges() {
        assert_eq!(eval("=SUM(A1:A3)").unwrap(), CellValue::Number(1700.0));
        assert_eq!(eval("=AVERAGE(A1:A3)").unwrap(), CellValue::Number(850.0));
        assert_eq!(eval("=MIN(A1:A2;10)").unwrap(), CellValue::Number(10.0));
        assert_eq!(eval("=MAX(A1:A2)").unwrap(), CellValue::Number(1200.0));
        assert_eq!(eval("=COUNT(A1:A3;\"4\";\"x\")").unwrap(), CellValue::Number(3.0));
        assert!(eval("=AVERAGE(A3)").is_err());
        assert!(eval("=SUM(B1:B3)").is_err());
    }

    #[test]
    fn test_round_abs_if() {
        assert_eq!(eval("=ROUND(2.375;2)").unwrap(), CellValue::Number(2.38));
        assert_eq!(eval("=ROUND(-2.5;0)").unwrap(), CellValue::Number(-3.0));
        assert_eq!(eval("=ROUND(1234;-2)").unwrap(), CellValue::Number(1200.0));
        assert_eq!(eval("=ABS(-4)").unwrap(), CellValue::Number(4.0));
        assert_eq!(eval("=IF(A1>100;\"haut\";\"bas\")").unwrap(), CellValue::text("haut"));
        assert_eq!(eval("=IF(FALSE;1)").unwrap(), CellValue::Boolean(false));
        // the untaken branch is never evaluated
        assert_eq!(eval("=IF(TRUE;1;1/0)").unwrap(), CellValue::Number(1.0));
    }

    #[test]
    fn test_argument_errors() {
        assert!(eval("=ABS(1;2)").is_err());
        assert!(eval("=ROUND(1)").is_err());
        assert!(eval("=VLOOKUP(1;A1:B2;2)").is_err());
    }

    #[test]
    fn test_uncached_formula_chain() {
        let mut sheet = sheet();
        sheet.set(3, 0, RawCell::formula("=A1+A2", None)); // A4
        sheet.set(4, 0, RawCell::formula("=A4*2", None)); // A5

        let value = SheetEvaluator.resolve(&sheet, 4, 0, "=A4*2").unwrap();
        assert_eq!(value, CellValue::Number(3400.0));
    }

    #[test]
    fn test_circular_reference() {
        let mut sheet = SheetData::new("Feuil1");
        sheet.set(0, 0, RawCell::formula("=B1+1", None));
        sheet.set(0, 1, RawCell::formula("=A1+1", None));

        assert!(SheetEvaluator.resolve(&sheet, 0, 0, "=B1+1").is_err());
    }

    #[test]
    fn test_sheet_qualified_reference() {
        assert_eq!(eval("=Camions!A1").unwrap(), CellValue::Number(500.0));
        assert!(eval("=Bus!A1").is_err());
    }

    #[test]
    fn test_blank_reference_is_zero() {
        assert_eq!(eval("=Z99").unwrap(), CellValue::Number(0.0));
    }
}
