//! The predicate optimization pre-pass.
//!
//! Walks an expression deciding whether its result is independent of the
//! context node. Steps anchored by `/` or `//` start from the document
//! root, so a path whose steps all carry a path spec never reads the
//! context; a relative step poisons the whole expression. Function calls
//! poison it when the function reads the context (`lang`, `last`,
//! `position`) or defaults to the context node because its argument was
//! omitted. A context-independent predicate is evaluated once per document
//! — unless its type is Number, since numbers compare against the context
//! position, which changes per candidate.

use crate::ast::{Expr, ExprNode, PathSpec, RetType};
use crate::functions;

/// `Some(type)` when the expression never reads the context, `None` when
/// it does.
pub(crate) fn classify(node: &ExprNode) -> Option<RetType> {
    match &node.expr {
        Expr::Number(_) => Some(RetType::Number),
        Expr::Literal(_) => Some(RetType::String),
        Expr::Unary { operand, .. } => {
            classify(operand)?;
            Some(RetType::Number)
        }
        Expr::Binary { op, left, right } => {
            classify(left)?;
            classify(right)?;
            Some(if op.is_relational() || op.is_logic() {
                RetType::Boolean
            } else if op.is_arithmetic() {
                RetType::Number
            } else {
                RetType::NodeSet
            })
        }
        Expr::Path(path) => {
            for step in &path.steps {
                if step.path_spec == PathSpec::None {
                    return None;
                }
                for pred in &step.predicates {
                    classify(&pred.expr)?;
                }
            }
            Some(RetType::NodeSet)
        }
        Expr::FunctionCall(call) => {
            if functions::reads_context(call.index) {
                return None;
            }
            if call.args.is_empty() && functions::defaults_to_context(call.index) {
                return None;
            }
            for arg in &call.args {
                classify(arg)?;
            }
            Some(call.ret)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn absolute_paths_are_context_independent() {
        assert_eq!(classify(&parse("//foo//bar").unwrap()), Some(RetType::NodeSet));
        assert_eq!(classify(&parse("/a/b").unwrap()), Some(RetType::NodeSet));
    }

    #[test]
    fn relative_steps_poison() {
        assert_eq!(classify(&parse("foo").unwrap()), None);
        assert_eq!(classify(&parse(".").unwrap()), None);
        assert_eq!(classify(&parse("//a + .//b").unwrap()), None);
    }

    #[test]
    fn context_functions_poison() {
        assert_eq!(classify(&parse("last()").unwrap()), None);
        assert_eq!(classify(&parse("position()").unwrap()), None);
        // string() with no argument defaults to the context node
        assert_eq!(classify(&parse("string()").unwrap()), None);
        // but not with an explicit independent argument
        assert_eq!(
            classify(&parse("string(//a)").unwrap()),
            Some(RetType::String)
        );
    }

    #[test]
    fn operators_compute_their_result_type() {
        assert_eq!(classify(&parse("1 + 2").unwrap()), Some(RetType::Number));
        assert_eq!(classify(&parse("'a' = 'b'").unwrap()), Some(RetType::Boolean));
        assert_eq!(
            classify(&parse("//a | //b").unwrap()),
            Some(RetType::NodeSet)
        );
        assert_eq!(classify(&parse("-3").unwrap()), Some(RetType::Number));
    }
}
