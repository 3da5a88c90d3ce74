/// Conditional node: first matching condition selects its branch
///
/// Operands are rendered templates. When both sides parse as numbers the
/// comparison is numeric, otherwise it compares the trimmed strings.

use super::{Execute, NodeContext, NodeOutput, Propagation};
use crate::error::NodeError;
use crate::runtime::services::Services;
use crate::workflow::types::{CompareOp, ConditionalConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cmp::Ordering;

#[async_trait]
impl Execute for ConditionalConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        let mut matched = None;
        for (index, condition) in self.conditions.iter().enumerate() {
            let left = ctx.render(&condition.field)?;
            let right = ctx.render(&condition.value)?;
            if compare(&left, condition.operator, &right) {
                matched = Some(index);
                break;
            }
        }

        tracing::debug!(
            "🔀 Conditional selected branch {}",
            matched.map(|i| i.to_string()).unwrap_or_else(|| "else".to_string())
        );

        let data = json!({
            "branch": matched.map(Value::from).unwrap_or_else(|| json!("else")),
            "conditionIndex": matched,
            "input": ctx.primary_input(),
        });

        Ok(NodeOutput::new(data).with_propagation(Propagation::Branch {
            index: matched,
            conditions: self.conditions.len(),
        }))
    }
}

/// Evaluate one comparison
pub fn compare(left: &str, op: CompareOp, right: &str) -> bool {
    let (left, right) = (left.trim(), right.trim());
    let ordering = match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r),
        _ => Some(left.cmp(right)),
    };

    match op {
        CompareOp::Eq => ordering == Some(Ordering::Equal),
        CompareOp::Ne => ordering != Some(Ordering::Equal),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Contains => left.contains(right),
    }
}
