use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use crate::sheet::aggregator::error::{Result, ToolError};
use crate::sheet::aggregator::model::{Record, Table, Value};
use crate::sheet::aggregator::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    fn eval(self, lhs: f64, rhs: f64) -> Option<f64> {
        let result = match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div if rhs == 0.0 => return None,
            BinaryOp::Div => lhs / rhs,
        };
        result.is_finite().then_some(result)
    }
}

/// Arithmetic expression over the numeric columns of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(f64),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluates the expression. Missing or non-numeric inputs, division by
    /// zero, and non-finite results all yield [`Value::Missing`].
    pub fn evaluate(&self, record: &Record) -> Value {
        self.eval_f64(record)
            .map(Value::Number)
            .unwrap_or(Value::Missing)
    }

    fn eval_f64(&self, record: &Record) -> Option<f64> {
        match self {
            Expr::Column(name) => record.get(name).as_f64(),
            Expr::Literal(value) => Some(*value),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval_f64(record)?;
                let rhs = rhs.eval_f64(record)?;
                op.eval(lhs, rhs)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "`{name}`"),
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

impl FromStr for Expr {
    type Err = ToolError;

    /// Parses `+ - * /` expressions with the usual precedence, parentheses,
    /// numeric literals, and column names. Names that are not plain
    /// identifiers are written between backticks.
    fn from_str(source: &str) -> Result<Self> {
        let mut parser = ExprParser {
            source,
            chars: source.char_indices().peekable(),
        };
        let expr = parser.expression()?;
        parser.skip_whitespace();
        match parser.chars.peek().copied() {
            None => Ok(expr),
            Some((_, ch)) => Err(parser.error(format!("unexpected '{ch}'"))),
        }
    }
}

struct ExprParser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl ExprParser<'_> {
    fn error(&self, reason: impl Into<String>) -> ToolError {
        ToolError::invalid_step(self.source, reason)
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: &[char]) -> Option<char> {
        self.skip_whitespace();
        self.chars
            .next_if(|(_, ch)| expected.contains(ch))
            .map(|(_, ch)| ch)
    }

    fn expression(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;
        while let Some(symbol) = self.eat(&['+', '-']) {
            let op = if symbol == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            expr = Expr::binary(op, expr, self.term()?);
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;
        while let Some(symbol) = self.eat(&['*', '/']) {
            let op = if symbol == '*' { BinaryOp::Mul } else { BinaryOp::Div };
            expr = Expr::binary(op, expr, self.factor()?);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        let Some((start, ch)) = self.chars.peek().copied() else {
            return Err(self.error("unexpected end of expression"));
        };

        match ch {
            '(' => {
                self.chars.next();
                let expr = self.expression()?;
                self.eat(&[')'])
                    .ok_or_else(|| self.error("missing closing parenthesis"))?;
                Ok(expr)
            }
            '-' => {
                self.chars.next();
                Ok(Expr::binary(BinaryOp::Mul, Expr::Literal(-1.0), self.factor()?))
            }
            '`' => {
                self.chars.next();
                let mut name = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '`')) => break,
                        Some((_, ch)) => name.push(ch),
                        None => return Err(self.error("unterminated column name")),
                    }
                }
                Ok(Expr::Column(name))
            }
            ch if ch.is_ascii_digit() || ch == '.' => {
                let end = self.take_while(|ch| ch.is_ascii_digit() || ch == '.');
                let literal = &self.source[start..end];
                literal
                    .parse()
                    .map(Expr::Literal)
                    .map_err(|_| self.error(format!("invalid number '{literal}'")))
            }
            ch if ch.is_alphabetic() || ch == '_' => {
                let end = self.take_while(|ch| ch.is_alphanumeric() || ch == '_');
                Ok(Expr::Column(self.source[start..end].to_string()))
            }
            other => Err(self.error(format!("unexpected '{other}'"))),
        }
    }

    /// Consumes characters while `accept` holds and returns the end offset.
    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> usize {
        let mut end = self.source.len();
        while let Some(&(offset, ch)) = self.chars.peek() {
            if !accept(ch) {
                end = offset;
                break;
            }
            self.chars.next();
        }
        end
    }
}

/// Adds (or overwrites) a column computed from each record.
pub struct Derive {
    column: String,
    label: String,
    compute: Box<dyn Fn(&Record) -> Value>,
}

impl Derive {
    pub fn new(
        column: impl Into<String>,
        label: impl Into<String>,
        compute: impl Fn(&Record) -> Value + 'static,
    ) -> Self {
        Self {
            column: column.into(),
            label: label.into(),
            compute: Box::new(compute),
        }
    }

    pub fn expr(column: impl Into<String>, expr: Expr) -> Self {
        let label = expr.to_string();
        Self::new(column, label, move |record| expr.evaluate(record))
    }
}

impl fmt::Debug for Derive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derive")
            .field("column", &self.column)
            .field("label", &self.label)
            .finish()
    }
}

impl Transform for Derive {
    fn name(&self) -> String {
        format!("derive {} = {}", self.column, self.label)
    }

    fn apply(&self, table: Table) -> Table {
        let (mut columns, records) = table.into_parts();
        if !columns.iter().any(|column| column == &self.column) {
            columns.push(self.column.clone());
        }
        let records = records
            .into_iter()
            .map(|mut record| {
                let value = (self.compute)(&record);
                record.insert(self.column.clone(), value);
                record
            })
            .collect();
        Table::from_parts(columns, records)
    }
}
