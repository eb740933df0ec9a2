use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Lte => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Gte => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
        })
    }
}

fn cmp_f64(da: f64, db: f64) -> Ordering {
    if (da - db).abs() < f64::EPSILON {
        Ordering::Equal
    } else if da < db {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Case-sensitive comparison. Numeric strings compare numerically against numbers;
/// anything else falls back to comparing the JSON text.
pub fn cmp_values(a: &Value, b: &Value, op: CmpOp) -> bool {
    let ord = match (a, b) {
        (Value::String(sa), Value::String(sb)) => sa.cmp(sb),
        (Value::Number(na), Value::Number(nb)) => match (na.as_f64(), nb.as_f64()) {
            (Some(da), Some(db)) => cmp_f64(da, db),
            _ => return op.holds(Ordering::Equal) && na == nb,
        },
        (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
        (Value::Number(na), Value::String(sb)) => match (na.as_f64(), sb.trim().parse::<f64>()) {
            (Some(da), Ok(db)) => cmp_f64(da, db),
            _ => a.to_string().cmp(&b.to_string()),
        },
        (Value::String(sa), Value::Number(nb)) => match (sa.trim().parse::<f64>(), nb.as_f64()) {
            (Ok(da), Some(db)) => cmp_f64(da, db),
            _ => a.to_string().cmp(&b.to_string()),
        },
        _ => a.to_string().cmp(&b.to_string()),
    };
    op.holds(ord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_compare_lexically() {
        assert!(cmp_values(&json!("linux"), &json!("linux"), CmpOp::Eq));
        assert!(cmp_values(&json!("darwin"), &json!("linux"), CmpOp::Lt));
        assert!(!cmp_values(&json!("Linux"), &json!("linux"), CmpOp::Eq));
    }

    #[test]
    fn numeric_strings_compare_with_numbers() {
        assert!(cmp_values(&json!("10"), &json!(9), CmpOp::Gt));
        assert!(cmp_values(&json!(2), &json!("2.0"), CmpOp::Eq));
        assert!(cmp_values(&json!(1.5), &json!(1.5), CmpOp::Gte));
    }

    #[test]
    fn mixed_types_are_not_equal() {
        assert!(!cmp_values(&json!(true), &json!("true"), CmpOp::Eq));
        assert!(cmp_values(&json!(null), &json!("x"), CmpOp::Ne));
    }
}
