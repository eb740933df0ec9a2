use serde_json::Value;

use crate::context::EvalContext;
use crate::errors::FilterError;
use crate::tree;

pub const DATASOURCES_KEY: &str = "datasources";
pub const CONSTRAINTS_KEY: &str = "constraints";

/// Drops datasources whose constraints do not all hold and returns how many were removed.
///
/// Datasources without `constraints` are kept. A tree with no `datasources` list is left
/// alone. When nothing is removed the tree is not touched at all; otherwise the list is
/// replaced in one step with the survivors in their original order. An error anywhere
/// during the scan leaves the tree unmodified.
pub fn filter_datasources(root: &mut Value, ctx: &EvalContext) -> Result<usize, FilterError> {
    let Some(list) = tree::lookup(root, DATASOURCES_KEY).and_then(tree::as_list) else {
        return Ok(0);
    };

    let keep = list
        .iter()
        .map(|ds| datasource_matches(ds, ctx))
        .collect::<Result<Vec<bool>, _>>()?;
    if keep.iter().all(|k| *k) {
        return Ok(0);
    }

    let survivors: Vec<Value> = list
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(ds, _)| ds.clone())
        .collect();
    let removed = list.len() - survivors.len();

    tree::replace_list(root, DATASOURCES_KEY, survivors)?;
    Ok(removed)
}

/// Constraints are ANDed and evaluated in order; the first false or failing one stops the scan.
fn datasource_matches(ds: &Value, ctx: &EvalContext) -> Result<bool, FilterError> {
    let Some(constraints) = tree::find(ds, CONSTRAINTS_KEY) else {
        return Ok(true);
    };
    let Some(constraints) = tree::as_list(constraints) else {
        return Err(FilterError::ConstraintsNotList {
            datasource: datasource_identifier(ds),
        });
    };

    for c in constraints {
        let Value::String(constraint) = c else {
            return Err(FilterError::ConstraintNotString {
                datasource: datasource_identifier(ds),
            });
        };
        match ctx.evaluate(constraint) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(
                    constraint = %constraint,
                    datasource = %datasource_identifier(ds),
                    "constraint not matching for datasource"
                );
                return Ok(false);
            }
            Err(source) => {
                return Err(FilterError::Constraint {
                    constraint: constraint.clone(),
                    datasource: datasource_identifier(ds),
                    source,
                })
            }
        }
    }
    Ok(true)
}

/// `namespace:<namespace>, output:<use_output>, id:<id>` for diagnostics.
pub fn datasource_identifier(ds: &Value) -> String {
    let field = |name: &str, default: &str| {
        tree::find(ds, name)
            .and_then(tree::as_scalar_string)
            .unwrap_or_else(|| default.to_string())
    };
    format!(
        "namespace:{}, output:{}, id:{}",
        field("namespace", "default"),
        field("use_output", "default"),
        field("id", "unknown")
    )
}
