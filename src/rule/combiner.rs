//! Combine several rules into one conjunctive rule

use crate::error::CombineError;
use crate::rule::ast::{LogicalOp, Node};
use std::sync::Arc;
use tracing::trace;

/// Left fold with AND: `[A, B, C]` becomes `AND(AND(A, B), C)`
///
/// Inputs are shared as subtrees, not copied. A single input is returned
/// unchanged.
pub fn combine(asts: &[Arc<Node>]) -> Result<Arc<Node>, CombineError> {
    let (first, rest) = asts.split_first().ok_or(CombineError::NoValidRules)?;

    let combined = rest.iter().fold(Arc::clone(first), |acc, ast| {
        Arc::new(Node::operator(LogicalOp::And, acc, Arc::clone(ast)))
    });

    trace!(rules = asts.len(), nodes = combined.size(), "combined rules");
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::rule::evaluator::evaluate;
    use crate::rule::parser::parse;

    fn rule(text: &str) -> Arc<Node> {
        Arc::new(parse(text).unwrap())
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(combine(&[]).unwrap_err(), CombineError::NoValidRules);
    }

    #[test]
    fn test_single_input_is_returned() {
        let a = rule("age > 30");
        let combined = combine(&[Arc::clone(&a)]).unwrap();
        assert!(Arc::ptr_eq(&combined, &a));
    }

    #[test]
    fn test_left_deep_fold() {
        let a = rule("age > 30 AND department = 'Sales'");
        let b = rule("experience > 5 OR salary > 50000");
        let c = rule("city = 'Paris'");

        let combined = combine(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let expected = Node::and(Node::and(a.clone(), b.clone()), c.clone());
        assert_eq!(*combined, expected);

        // Inputs are shared, not copied
        let (left, right) = combined.children().unwrap();
        assert!(Arc::ptr_eq(right, &c));
        let (ll, lr) = left.children().unwrap();
        assert!(Arc::ptr_eq(ll, &a));
        assert!(Arc::ptr_eq(lr, &b));
    }

    #[test]
    fn test_combined_verdict_is_conjunction() {
        let rules = [
            rule("age > 30 AND department = 'Sales'"),
            rule("experience > 5 OR salary > 50000"),
        ];
        let combined = combine(&rules).unwrap();

        let records = [
            Record::new().with("age", 35).with("department", "Sales").with("salary", 60000),
            Record::new().with("age", 35).with("department", "Sales").with("experience", 2),
            Record::new().with("age", 20).with("department", "Sales").with("experience", 9),
        ];
        for record in &records {
            let expected = rules.iter().all(|r| evaluate(r, record));
            assert_eq!(evaluate(&combined, record), expected);
        }
    }
}
