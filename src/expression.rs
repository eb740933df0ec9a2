// src/expression.rs
use serde_json::Value;

use crate::comparison::{cmp_values, CmpOp};
use crate::errors::{EvalError, Result};
use crate::functions::Registry;
use crate::parser::{ParseError, Parser};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Call { name: String, args: Vec<Expr> },
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// Variable lookup used while evaluating. Unknown names must return `None`.
pub trait Variables {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<F> Variables for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

pub fn parse_expr(input: &str) -> Result<Expr> {
    let mut p = EParser::new(input);
    let node = p.parse_or()?;
    p.parser.skip_ws();
    if !p.parser.eof() {
        return Err(p.parser.error("trailing input").into());
    }
    Ok(node)
}

/// Parses and evaluates `text`; the result must be a boolean.
pub fn eval(text: &str, registry: &Registry, vars: &dyn Variables) -> Result<bool> {
    let ast = parse_expr(text)?;
    match eval_ast(&ast, registry, vars)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::Type(format!(
            "expression evaluates to {other}, not a boolean"
        ))),
    }
}

/// Nesting limit for parentheses, `not` chains and call arguments.
const MAX_DEPTH: usize = 256;

struct EParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
            depth: 0,
        }
    }

    fn parse_or(&mut self) -> std::result::Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            self.parser.skip_ws();
            if self.parser.consume_str("||") || self.parser.consume_keyword("or") {
                let right = self.parse_and()?;
                left = Expr::Or(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> std::result::Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        loop {
            self.parser.skip_ws();
            if self.parser.consume_str("&&") || self.parser.consume_keyword("and") {
                let right = self.parse_not()?;
                left = Expr::And(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    // Every nested sub-expression passes through here.
    fn parse_not(&mut self) -> std::result::Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.parser.error("expression nested too deeply"));
        }
        self.depth += 1;
        let node = self.parse_unary();
        self.depth -= 1;
        node
    }

    fn parse_unary(&mut self) -> std::result::Result<Expr, ParseError> {
        self.parser.skip_ws();
        let bang = self.parser.peek_char() == Some('!') && !self.parser.peek_str("!=");
        if bang {
            self.parser.consume_char('!');
        }
        if bang || self.parser.consume_keyword("not") {
            let inner = self.parse_not()?;
            Ok(Expr::Not(Box::new(inner)))
        } else {
            self.parse_compare()
        }
    }

    fn parse_compare(&mut self) -> std::result::Result<Expr, ParseError> {
        let left = self.parse_operand()?;
        self.parser.skip_ws();
        let op = if self.parser.consume_str("==") {
            Some(CmpOp::Eq)
        } else if self.parser.consume_str("!=") {
            Some(CmpOp::Ne)
        } else if self.parser.consume_str("<=") {
            Some(CmpOp::Lte)
        } else if self.parser.consume_str(">=") {
            Some(CmpOp::Gte)
        } else if self.parser.consume_char('<') {
            Some(CmpOp::Lt)
        } else if self.parser.consume_char('>') {
            Some(CmpOp::Gt)
        } else {
            None
        };
        match op {
            Some(op) => {
                let right = self.parse_operand()?;
                Ok(Expr::Cmp(op, Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn parse_operand(&mut self) -> std::result::Result<Expr, ParseError> {
        self.parser.skip_ws();
        if self.parser.consume_char('(') {
            let inner = self.parse_or()?;
            self.parser.skip_ws();
            self.parser.expect(')')?;
            return Ok(inner);
        }
        if self.parser.peek_char() == Some('"') || self.parser.peek_char() == Some('\'') {
            return Ok(Expr::Literal(Value::String(self.parser.parse_quoted_string()?)));
        }
        if self
            .parser
            .peek_char()
            .is_some_and(|c| c == '-' || c.is_ascii_digit())
        {
            return Ok(Expr::Literal(self.parser.parse_number_literal()?));
        }
        // %{[os.family]}
        if self.parser.consume_str("%{[") {
            self.parser.skip_ws();
            let name = self.parser.parse_dotted_identifier()?;
            self.parser.skip_ws();
            self.parser.expect(']')?;
            self.parser.expect('}')?;
            return Ok(Expr::Var(name));
        }
        if self
            .parser
            .peek_char()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        {
            let name = self.parser.parse_dotted_identifier()?;
            if !name.contains('.') {
                match name.to_ascii_lowercase().as_str() {
                    "true" => return Ok(Expr::Literal(Value::Bool(true))),
                    "false" => return Ok(Expr::Literal(Value::Bool(false))),
                    "null" => return Ok(Expr::Literal(Value::Null)),
                    _ => {}
                }
                self.parser.skip_ws();
                if self.parser.consume_char('(') {
                    let args = self.parse_args()?;
                    self.parser.expect(')')?;
                    return Ok(Expr::Call { name, args });
                }
            }
            return Ok(Expr::Var(name));
        }
        Err(self.parser.error("invalid operand"))
    }

    fn parse_args(&mut self) -> std::result::Result<Vec<Expr>, ParseError> {
        let mut out = Vec::new();
        self.parser.skip_ws();
        if self.parser.peek_char() == Some(')') {
            return Ok(out);
        }
        loop {
            out.push(self.parse_or()?);
            self.parser.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            break;
        }
        Ok(out)
    }
}

fn eval_operand_bool(
    node: &Expr,
    what: &str,
    registry: &Registry,
    vars: &dyn Variables,
) -> Result<bool> {
    match eval_ast(node, registry, vars)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::Type(format!(
            "operand of '{what}' is not a boolean: {other}"
        ))),
    }
}

/// Evaluate AST node → Value. `and`/`or` short-circuit.
pub fn eval_ast(node: &Expr, registry: &Registry, vars: &dyn Variables) -> Result<Value> {
    match node {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => vars
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownVariable(name.clone())),
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|a| eval_ast(a, registry, vars))
                .collect::<Result<Vec<_>>>()?;
            registry.call(name, &args)
        }
        Expr::Cmp(op, l, r) => {
            let a = eval_ast(l, registry, vars)?;
            let b = eval_ast(r, registry, vars)?;
            Ok(Value::Bool(cmp_values(&a, &b, *op)))
        }
        Expr::And(l, r) => Ok(Value::Bool(
            eval_operand_bool(l, "and", registry, vars)?
                && eval_operand_bool(r, "and", registry, vars)?,
        )),
        Expr::Or(l, r) => Ok(Value::Bool(
            eval_operand_bool(l, "or", registry, vars)?
                || eval_operand_bool(r, "or", registry, vars)?,
        )),
        Expr::Not(inner) => Ok(Value::Bool(!eval_operand_bool(inner, "not", registry, vars)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn vars(name: &str) -> Option<Value> {
        match name {
            "os.family" => Some(json!("linux")),
            "agent.version" => Some(json!("7.6.0")),
            "host.architecture" => Some(json!("x86_64")),
            _ => None,
        }
    }

    fn run(text: &str) -> Result<bool> {
        let reg = Registry::with_builtins().unwrap();
        eval(text, &reg, &vars)
    }

    #[test]
    fn parses_precedence() {
        let ast = parse_expr("a == 'x' or b == 'y' and not c").unwrap();
        let Expr::Or(_, right) = ast else {
            panic!("expected or at the top");
        };
        assert!(matches!(*right, Expr::And(_, _)));
    }

    #[test]
    fn parses_variable_forms() {
        assert_eq!(parse_expr("os.family").unwrap(), Expr::Var("os.family".into()));
        assert_eq!(parse_expr("%{[ os.family ]}").unwrap(), Expr::Var("os.family".into()));
    }

    #[test]
    fn parses_calls() {
        let ast = parse_expr("validate_version(agent.version, '>=7.0.0')").unwrap();
        assert_eq!(
            ast,
            Expr::Call {
                name: "validate_version".into(),
                args: vec![
                    Expr::Var("agent.version".into()),
                    Expr::Literal(json!(">=7.0.0")),
                ],
            }
        );
    }

    #[test]
    fn comparisons_and_logic() {
        assert!(run("os.family == 'linux'").unwrap());
        assert!(!run("os.family != \"linux\"").unwrap());
        assert!(run("os.family == 'windows' || host.architecture == 'x86_64'").unwrap());
        assert!(run("os.family == 'linux' AND NOT (host.architecture == 'arm')").unwrap());
        assert!(run("!(os.family == 'darwin')").unwrap());
        assert!(run("true").unwrap());
        assert!(run("10 > 9.5").unwrap());
    }

    #[test]
    fn calls_registered_function() {
        assert!(run("validate_version(agent.version, '>=7.0.0')").unwrap());
        assert!(!run("validate_version(%{[agent.version]}, '<7.0.0')").unwrap());
    }

    #[test]
    fn unknown_names_are_errors() {
        let err = run("unknown_var == '1'").unwrap_err();
        assert_eq!(err.to_string(), "unknown variable 'unknown_var'");
        let err = run("nope(os.family)").unwrap_err();
        assert_eq!(err.to_string(), "unknown function 'nope'");
    }

    #[test]
    fn non_boolean_results_are_errors() {
        assert!(matches!(run("os.family"), Err(EvalError::Type(_))));
        assert!(matches!(run("os.family and true"), Err(EvalError::Type(_))));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(run("os.family =="), Err(EvalError::Parse(_))));
        assert!(matches!(run("(true"), Err(EvalError::Parse(_))));
        assert!(matches!(run("true true"), Err(EvalError::Parse(_))));
        assert!(matches!(run(""), Err(EvalError::Parse(_))));
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let deep = format!("{}true{}", "(".repeat(50_000), ")".repeat(50_000));
        assert!(matches!(run(&deep), Err(EvalError::Parse(_))));
        let negations = format!("{}true", "not ".repeat(50_000));
        assert!(matches!(run(&negations), Err(EvalError::Parse(_))));

        let moderate = format!("{}true{}", "(".repeat(40), ")".repeat(40));
        assert!(run(&moderate).unwrap());
    }

    #[test]
    fn and_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut reg = Registry::new();
        reg.register_fn("tick", 0..=0, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bool(true))
        })
        .unwrap();
        assert!(!eval("false and tick()", &reg, &vars).unwrap());
        assert!(eval("true or tick()", &reg, &vars).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(eval("true and tick()", &reg, &vars).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
