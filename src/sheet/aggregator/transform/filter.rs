use std::cmp::Ordering;
use std::fmt;

use crate::sheet::aggregator::model::{Record, Table, Value};
use crate::sheet::aggregator::transform::Transform;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            CompareOp::Eq => ordering == Some(Ordering::Equal),
            CompareOp::Ne => ordering != Some(Ordering::Equal),
            CompareOp::Gt => ordering == Some(Ordering::Greater),
            CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            CompareOp::Lt => ordering == Some(Ordering::Less),
            CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// `column <op> operand`, evaluated per record.
///
/// Values of different kinds are never equal nor ordered, and a missing
/// value only satisfies `!=`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub operand: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: CompareOp, operand: Value) -> Self {
        Self {
            column: column.into(),
            op,
            operand,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.op.holds(compare(record.get(&self.column), &self.operand))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op.symbol(), self.operand)
    }
}

fn compare(value: &Value, operand: &Value) -> Option<Ordering> {
    match (value, operand) {
        (Value::Number(lhs), Value::Number(rhs)) => lhs.partial_cmp(rhs),
        (Value::String(lhs), Value::String(rhs)) => Some(lhs.cmp(rhs)),
        (Value::Boolean(lhs), Value::Boolean(rhs)) => Some(lhs.cmp(rhs)),
        (Value::DateTime(lhs), Value::DateTime(rhs)) => Some(lhs.cmp(rhs)),
        _ => None,
    }
}

/// Keeps the records for which a predicate holds, preserving their order.
pub struct Filter {
    label: String,
    predicate: Box<dyn Fn(&Record) -> bool>,
}

impl Filter {
    pub fn new(label: impl Into<String>, predicate: impl Fn(&Record) -> bool + 'static) -> Self {
        Self {
            label: label.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn condition(condition: Condition) -> Self {
        let label = condition.to_string();
        Self::new(label, move |record| condition.matches(record))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("label", &self.label).finish()
    }
}

impl Transform for Filter {
    fn name(&self) -> String {
        format!("filter {}", self.label)
    }

    fn apply(&self, table: Table) -> Table {
        let (columns, records) = table.into_parts();
        let records = records
            .into_iter()
            .filter(|record| (self.predicate)(record))
            .collect();
        Table::from_parts(columns, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat_table() -> Table {
        // 88 records, every second one of the first 80 has cat == "b".
        let records = (0..88)
            .map(|index| {
                let cat = if index < 80 && index % 2 == 0 { "b" } else { "a" };
                [
                    ("id", Value::from(index as f64)),
                    ("cat", Value::from(cat)),
                ]
                .into_iter()
                .collect::<Record>()
            })
            .collect();
        Table::from_records(vec!["id".into(), "cat".into()], records)
    }

    #[test]
    fn not_equal_filter_keeps_remaining_rows_in_order() {
        let table = cat_table();
        assert_eq!(
            table.column_values("cat").filter(|v| *v == &Value::from("b")).count(),
            40
        );

        let filtered =
            Filter::condition(Condition::new("cat", CompareOp::Ne, Value::from("b"))).apply(table);

        assert_eq!(filtered.len(), 48);
        let ids: Vec<f64> = filtered
            .column_values("id")
            .filter_map(Value::as_f64)
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(filtered.column_values("cat").all(|v| v == &Value::from("a")));
    }

    #[test]
    fn numeric_threshold() {
        let filtered =
            Filter::condition(Condition::new("id", CompareOp::Gt, Value::from(84.0))).apply(cat_table());
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn missing_values_only_satisfy_not_equal() {
        let record = Record::new();
        let missing = |op| Condition::new("absent", op, Value::from(1.0)).matches(&record);

        assert!(missing(CompareOp::Ne));
        for op in [CompareOp::Eq, CompareOp::Gt, CompareOp::Ge, CompareOp::Lt, CompareOp::Le] {
            assert!(!missing(op), "{op:?} should not match a missing value");
        }
    }

    #[test]
    fn mismatched_kinds_are_unordered() {
        let record: Record = [("n", Value::from("10"))].into_iter().collect();
        assert!(!Condition::new("n", CompareOp::Gt, Value::from(5.0)).matches(&record));
        assert!(Condition::new("n", CompareOp::Ne, Value::from(10.0)).matches(&record));
    }

    #[test]
    fn closure_predicates_are_supported() {
        let filter = Filter::new("even id", |record: &Record| {
            record.get("id").as_f64().is_some_and(|id| id % 2.0 == 0.0)
        });
        assert_eq!(filter.apply(cat_table()).len(), 44);
    }
}
