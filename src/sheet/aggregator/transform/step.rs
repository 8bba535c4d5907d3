use crate::sheet::aggregator::error::{Result, ToolError};
use crate::sheet::aggregator::model::Value;
use crate::sheet::aggregator::transform::{
    CompareOp, Condition, Derive, DropColumn, Expr, Filter, NormalizeColumns, Transform,
};

/// Operators in match priority: two-character symbols first so that `>=`
/// is not read as `>`.
const OPERATORS: &[(&str, CompareOp)] = &[
    ("==", CompareOp::Eq),
    ("!=", CompareOp::Ne),
    (">=", CompareOp::Ge),
    ("<=", CompareOp::Le),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
];

/// Parses one pipeline step:
///
/// - `normalize`
/// - `drop:<column>`
/// - `filter:<column> <op> <value>` with `op` one of `== != > >= < <=`
/// - `derive:<column>=<expression>`
pub fn parse_step(step: &str) -> Result<Box<dyn Transform>> {
    let trimmed = step.trim();
    let (kind, argument) = match trimmed.split_once(':') {
        Some((kind, argument)) => (kind.trim(), argument.trim()),
        None => (trimmed, ""),
    };

    match kind {
        "normalize" if argument.is_empty() => Ok(Box::new(NormalizeColumns)),
        "normalize" => Err(ToolError::invalid_step(step, "normalize takes no argument")),
        "drop" => {
            let column = unquote_column(argument);
            if column.is_empty() {
                return Err(ToolError::invalid_step(step, "missing column name"));
            }
            Ok(Box::new(DropColumn::new(column)))
        }
        "filter" => Ok(Box::new(Filter::condition(parse_condition(step, argument)?))),
        "derive" => {
            let (column, expression) = argument
                .split_once('=')
                .ok_or_else(|| ToolError::invalid_step(step, "expected <column>=<expression>"))?;
            let column = unquote_column(column.trim());
            if column.is_empty() {
                return Err(ToolError::invalid_step(step, "missing column name"));
            }
            let expr: Expr = expression.parse().map_err(|error| match error {
                ToolError::InvalidStep { reason, .. } => ToolError::invalid_step(step, reason),
                other => other,
            })?;
            Ok(Box::new(Derive::expr(column, expr)))
        }
        other => Err(ToolError::invalid_step(
            step,
            format!("unknown step kind '{other}'"),
        )),
    }
}

fn parse_condition(step: &str, argument: &str) -> Result<Condition> {
    let (position, symbol, op) = OPERATORS
        .iter()
        .filter_map(|(symbol, op)| argument.find(symbol).map(|position| (position, *symbol, *op)))
        .min_by_key(|(position, symbol, _)| (*position, std::cmp::Reverse(symbol.len())))
        .ok_or_else(|| ToolError::invalid_step(step, "missing comparison operator"))?;

    let column = unquote_column(argument[..position].trim());
    if column.is_empty() {
        return Err(ToolError::invalid_step(step, "missing column name"));
    }
    let operand = argument[position + symbol.len()..].trim();
    if operand.is_empty() {
        return Err(ToolError::invalid_step(step, "missing comparison value"));
    }

    Ok(Condition::new(column, op, parse_operand(operand)))
}

/// Quoted operands are strings; otherwise numbers and booleans are
/// recognised before falling back to text.
fn parse_operand(operand: &str) -> Value {
    for quote in ['\'', '"'] {
        if let Some(inner) = operand
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Value::from(inner);
        }
    }
    if let Ok(number) = operand.parse::<f64>() {
        return Value::Number(number);
    }
    match operand {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        other => Value::from(other),
    }
}

fn unquote_column(column: &str) -> &str {
    column
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .unwrap_or(column)
}
