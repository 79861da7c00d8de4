//! Formula parser
//!
//! The source is split into tokens up front, then a recursive descent
//! parser builds the AST with spreadsheet operator precedence.
//!
//! Both `,` and `;` separate function arguments, so formulas written with
//! a French locale (`=SOMME` aside) parse the same as English ones.

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use carburant_core::{CellAddress, CellRange};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use carburant_formula::parse_formula;
///
/// let ast = parse_formula("=B2/(C2/100)").unwrap();
/// let ast = parse_formula("=SUM(D2:D13)").unwrap();
/// let ast = parse_formula("=IF(E2>0;E2;0)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let body = formula
        .trim()
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let tokens = tokenize(body)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;

    if parser.peek() != &Token::Eof {
        return Err(FormulaError::Parse(format!(
            "Unexpected token after expression: {:?}",
            parser.peek()
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Boolean(bool),
    /// Function name
    Ident(String),
    /// A1-style reference, `$` included
    Reference(String),
    /// Sheet prefix, without the trailing `!`
    Sheet(String),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Colon,
    /// `,` or `;`
    Separator,
    LeftParen,
    RightParen,

    Eof,
}

fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let simple = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            '=' => Some(Token::Equal),
            ':' => Some(Token::Colon),
            ',' | ';' => Some(Token::Separator),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = simple {
            tokens.push(token);
            i += 1;
            continue;
        }

        match c {
            '<' => {
                let (token, len) = match chars.get(i + 1) {
                    Some('=') => (Token::LessEqual, 2),
                    Some('>') => (Token::NotEqual, 2),
                    _ => (Token::Less, 1),
                };
                tokens.push(token);
                i += len;
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::GreaterEqual);
                    i += 2;
                } else {
                    tokens.push(Token::Greater);
                    i += 1;
                }
            }
            '"' => {
                let (text, next) = scan_quoted(&chars, i, '"')?;
                tokens.push(Token::Str(text));
                i = next;
            }
            '\'' => {
                let (sheet, next) = scan_quoted(&chars, i, '\'')?;
                if chars.get(next) != Some(&'!') {
                    return Err(FormulaError::Parse(format!(
                        "Expected '!' after sheet name '{}'",
                        sheet
                    )));
                }
                tokens.push(Token::Sheet(sheet));
                i = next + 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::Parse(format!("Invalid number '{}'", text)))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '$' | '.'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(classify_word(word, chars.get(i).copied()));
                if matches!(tokens.last(), Some(Token::Sheet(_))) {
                    i += 1;
                }
            }
            other => {
                return Err(FormulaError::Parse(format!(
                    "Unexpected character '{}'",
                    other
                )))
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Scan a quoted run starting at `start`; a doubled quote is an escaped one
fn scan_quoted(chars: &[char], start: usize, quote: char) -> FormulaResult<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(FormulaError::Parse("Unterminated quoted text".into())),
            Some(&c) if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    text.push(quote);
                    i += 2;
                } else {
                    return Ok((text, i + 1));
                }
            }
            Some(&c) => {
                text.push(c);
                i += 1;
            }
        }
    }
}

fn classify_word(word: String, next: Option<char>) -> Token {
    if next == Some('!') {
        return Token::Sheet(word);
    }
    if next == Some('(') {
        return Token::Ident(word);
    }
    match word.to_ascii_uppercase().as_str() {
        "TRUE" | "VRAI" => return Token::Boolean(true),
        "FALSE" | "FAUX" => return Token::Boolean(false),
        _ => {}
    }
    if is_reference(&word) {
        Token::Reference(word)
    } else {
        Token::Ident(word)
    }
}

/// `[$]letters[$]digits`
fn is_reference(word: &str) -> bool {
    let rest = word.strip_prefix('$').unwrap_or(word);
    let letters = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 {
        return false;
    }
    let rest = &rest[letters..];
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> FormulaResult<()> {
        let token = self.next();
        if token == expected {
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected, token
            )))
        }
    }

    // Precedence, lowest first: comparison, `&`, `+ -`, `* /`, `^`,
    // unary `- +` and postfix `%`, range `:`, primary.

    fn expression(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.concatenation()?;
        loop {
            let op = match self.peek() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::Less => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::Greater => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => return Ok(left),
            };
            self.next();
            let right = self.concatenation()?;
            left = binary(op, left, right);
        }
    }

    fn concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.additive()?;
        while self.peek() == &Token::Ampersand {
            self.next();
            let right = self.additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.next();
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.exponent()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => return Ok(left),
            };
            self.next();
            let right = self.exponent()?;
            left = binary(op, left, right);
        }
    }

    fn exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.unary()?;
        if self.peek() == &Token::Caret {
            self.next();
            // right associative
            let right = self.exponent()?;
            return Ok(binary(BinaryOperator::Power, left, right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.peek() {
            Token::Minus => {
                self.next();
                let operand = self.unary()?;
                Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            Token::Plus => {
                self.next();
                self.unary()
            }
            _ => {
                let mut expr = self.range()?;
                while self.peek() == &Token::Percent {
                    self.next();
                    expr = FormulaExpr::UnaryOp {
                        op: UnaryOperator::Percent,
                        operand: Box::new(expr),
                    };
                }
                Ok(expr)
            }
        }
    }

    fn range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.primary()?;
        if self.peek() != &Token::Colon {
            return Ok(left);
        }
        self.next();
        let right = self.primary()?;

        match (left, right) {
            (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) => {
                if end.sheet.is_some() && end.sheet != start.sheet {
                    return Err(FormulaError::Parse(
                        "Range references must be on the same sheet".into(),
                    ));
                }
                Ok(FormulaExpr::RangeRef(RangeReference {
                    sheet: start.sheet,
                    range: CellRange::new(start.address, end.address),
                }))
            }
            _ => Err(FormulaError::Parse(
                "Range operator requires two cell references".into(),
            )),
        }
    }

    fn primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.next() {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::Str(s) => Ok(FormulaExpr::String(s)),
            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Token::LeftParen => {
                let expr = self.expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::Reference(text) => reference(None, &text),
            Token::Sheet(sheet) => match self.next() {
                Token::Reference(text) => reference(Some(sheet), &text),
                other => Err(FormulaError::Parse(format!(
                    "Expected cell reference after sheet '{}', got {:?}",
                    sheet, other
                ))),
            },
            Token::Ident(name) => {
                if self.peek() != &Token::LeftParen {
                    return Err(FormulaError::Parse(format!(
                        "Named references are not supported: '{}'",
                        name
                    )));
                }
                self.function_call(name)
            }
            other => Err(FormulaError::Parse(format!("Unexpected token: {:?}", other))),
        }
    }

    fn function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(Token::LeftParen)?;
        let mut args = Vec::new();
        if self.peek() != &Token::RightParen {
            args.push(self.expression()?);
            while self.peek() == &Token::Separator {
                self.next();
                args.push(self.expression()?);
            }
        }
        self.expect(Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn reference(sheet: Option<String>, text: &str) -> FormulaResult<FormulaExpr> {
    let address = CellAddress::parse(text)
        .map_err(|e| FormulaError::Parse(format!("Invalid cell reference '{}': {}", text, e)))?;
    Ok(FormulaExpr::CellRef(CellReference { sheet, address }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(row: u32, col: u16) -> FormulaExpr {
        FormulaExpr::CellRef(CellReference {
            sheet: None,
            address: CellAddress::new(row, col),
        })
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("=1.5e3").unwrap(), FormulaExpr::Number(1500.0));
        assert_eq!(
            parse_formula("=\"say \"\"hi\"\"\"").unwrap(),
            FormulaExpr::String("say \"hi\"".into())
        );
        assert_eq!(parse_formula("=TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("=faux").unwrap(), FormulaExpr::Boolean(false));
    }

    #[test]
    fn test_precedence() {
        // 1+2*3 => 1+(2*3)
        let ast = parse_formula("=1+2*3").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Add,
                FormulaExpr::Number(1.0),
                binary(
                    BinaryOperator::Multiply,
                    FormulaExpr::Number(2.0),
                    FormulaExpr::Number(3.0)
                )
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let ast = parse_formula("=2^3^2").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Power,
                FormulaExpr::Number(2.0),
                binary(
                    BinaryOperator::Power,
                    FormulaExpr::Number(3.0),
                    FormulaExpr::Number(2.0)
                )
            )
        );
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(parse_formula("=$B$2").unwrap(), cell(1, 1));

        let ast = parse_formula("=A1:B3").unwrap();
        assert_eq!(
            ast,
            FormulaExpr::RangeRef(RangeReference {
                sheet: None,
                range: CellRange::from_indices(0, 0, 2, 1),
            })
        );

        let ast = parse_formula("='Parc auto'!C4").unwrap();
        assert_eq!(
            ast,
            FormulaExpr::CellRef(CellReference {
                sheet: Some("Parc auto".into()),
                address: CellAddress::new(3, 2),
            })
        );
    }

    #[test]
    fn test_parse_function_with_either_separator() {
        let comma = parse_formula("=ROUND(A1, 2)").unwrap();
        let semicolon = parse_formula("=round(A1;2)").unwrap();
        assert_eq!(comma, semicolon);
        match comma {
            FormulaExpr::Function { name, args } => {
                assert_eq!(name, "ROUND");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_function_name_like_reference() {
        // LOG10 looks like a reference but is followed by '('
        let ast = parse_formula("=LOG10(100)").unwrap();
        assert!(matches!(ast, FormulaExpr::Function { .. }));
    }

    #[test]
    fn test_unary_and_percent() {
        assert_eq!(
            parse_formula("=-5%").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Percent,
                    operand: Box::new(FormulaExpr::Number(5.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_formula("1+2").is_err());
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=\"open").is_err());
        assert!(parse_formula("=Total").is_err());
        assert!(parse_formula("=1 2").is_err());
        assert!(parse_formula("=#REF!").is_err());
    }
}
