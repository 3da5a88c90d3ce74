/// Test node: assertions against other nodes' results
///
/// Each assertion reads the source node's output from the current run, or
/// the result stored on the node by an earlier run. Every assertion is
/// evaluated and reported individually; the node fails when any of them
/// fails, and a failing `stopOnFailure` assertion halts the run.

use super::{Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::expression::template::stringify;
use crate::expression::PathExpr;
use crate::runtime::services::Services;
use crate::workflow::types::{Assertion, AssertionKind, AssertionOp, TestConfig};
use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
impl Execute for TestConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, _services: &Services) -> Result<NodeOutput, NodeError> {
        let mut results = Vec::with_capacity(self.assertions.len());
        let mut failed = 0;
        let mut halt = false;

        for assertion in &self.assertions {
            let source = ctx
                .scope
                .data
                .get(&assertion.source_node_id)
                .or_else(|| ctx.previous_results.get(&assertion.source_node_id));

            let (actual, outcome) = match source {
                Some(source) => {
                    let actual = extract(assertion, source)?;
                    let outcome = check(assertion.operator, actual.as_ref(), &assertion.expected);
                    (actual, outcome)
                }
                None => (None, Err(format!("node '{}' has no result", assertion.source_node_id))),
            };

            let passed = outcome.is_ok();
            if !passed {
                failed += 1;
                halt |= assertion.stop_on_failure;
            }

            results.push(json!({
                "sourceNodeId": assertion.source_node_id,
                "type": assertion.kind,
                "path": assertion.path,
                "operator": assertion.operator,
                "expected": assertion.expected,
                "actual": actual,
                "passed": passed,
                "message": outcome.err(),
            }));
        }

        let total = self.assertions.len();
        let data = json!({
            "passed": failed == 0,
            "total": total,
            "passedCount": total - failed,
            "failedCount": failed,
            "results": results,
        });

        if failed == 0 {
            tracing::info!("✅ All {} assertions passed", total);
            return Ok(NodeOutput::new(data));
        }

        tracing::warn!("❌ {}/{} assertions failed", failed, total);
        let mut output = NodeOutput::failed(
            data,
            NodeError::Assertion(format!("{} of {} assertions failed", failed, total)),
        );
        output.halt = halt;
        Ok(output)
    }
}

/// Pick the value an assertion looks at
fn extract(assertion: &Assertion, source: &Value) -> Result<Option<Value>, NodeError> {
    let response = source.get("response");
    match assertion.kind {
        AssertionKind::Status => Ok(response
            .and_then(|r| r.get("status"))
            .or_else(|| source.get("status"))
            .or_else(|| source.get("exitCode"))
            .cloned()),
        AssertionKind::Headers => {
            let name = assertion.path.as_deref().unwrap_or_default().trim().to_lowercase();
            let headers = response.and_then(|r| r.get("headers")).or_else(|| source.get("headers"));
            Ok(headers
                .and_then(Value::as_object)
                .and_then(|h| h.iter().find(|(k, _)| k.to_lowercase() == name))
                .map(|(_, v)| v.clone()))
        }
        AssertionKind::Body => {
            let body = response.and_then(|r| r.get("data")).unwrap_or(source);
            match assertion.path.as_deref().map(str::trim) {
                Some(path) if !path.is_empty() => Ok(PathExpr::parse(path)?.evaluate(body)),
                _ => Ok(Some(body.clone())),
            }
        }
    }
}

/// Compare an actual value against the expectation
fn check(op: AssertionOp, actual: Option<&Value>, expected: &Value) -> Result<(), String> {
    let Some(actual) = actual.filter(|v| !v.is_null()) else {
        return match op {
            AssertionOp::NotEquals if !expected.is_null() => Ok(()),
            _ => Err("no value found".to_string()),
        };
    };

    let holds = match op {
        AssertionOp::Exists => true,
        AssertionOp::Equals => loosely_equal(actual, expected),
        AssertionOp::NotEquals => !loosely_equal(actual, expected),
        AssertionOp::Contains => match actual {
            Value::Array(items) => items.iter().any(|item| loosely_equal(item, expected)),
            other => stringify(other).contains(&stringify(expected)),
        },
        AssertionOp::GreaterThan => matches!((number(actual), number(expected)), (Some(a), Some(e)) if a > e),
        AssertionOp::LessThan => matches!((number(actual), number(expected)), (Some(a), Some(e)) if a < e),
    };

    if holds {
        Ok(())
    } else {
        Err(format!(
            "{:?} check failed: actual {}, expected {}",
            op,
            stringify(actual),
            stringify(expected)
        ))
    }
}

/// Equality that treats `200` and `"200"` as the same value
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (number(actual), number(expected)) {
        (Some(a), Some(e)) => a == e,
        _ => match (actual, expected) {
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
            _ => stringify(actual) == stringify(expected),
        },
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{services, Fixture, MockHttp};
    use super::*;
    use std::sync::Arc;

    fn assertion(kind: AssertionKind, path: Option<&str>, operator: AssertionOp, expected: Value) -> Assertion {
        Assertion {
            source_node_id: "SRC".to_string(),
            kind,
            path: path.map(str::to_string),
            operator,
            expected,
            stop_on_failure: false,
        }
    }

    fn response() -> Value {
        json!({"response": {
            "status": 200,
            "headers": {"content-type": "application/json"},
            "data": {"id": 7, "tags": ["a", "b"]}
        }})
    }

    async fn run(config: TestConfig, fixture: &Fixture) -> NodeOutput {
        config
            .execute(&fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn evaluates_status_headers_and_body() {
        let fixture = Fixture::from_source(response());
        let config = TestConfig {
            assertions: vec![
                assertion(AssertionKind::Status, None, AssertionOp::Equals, json!(200)),
                assertion(AssertionKind::Headers, Some("Content-Type"), AssertionOp::Contains, json!("json")),
                assertion(AssertionKind::Body, Some("id"), AssertionOp::Equals, json!("7")),
                assertion(AssertionKind::Body, Some("tags"), AssertionOp::Contains, json!("b")),
                assertion(AssertionKind::Body, Some("id"), AssertionOp::GreaterThan, json!(5)),
            ],
        };
        let out = run(config, &fixture).await;
        assert_eq!(out.data["passed"], true);
        assert_eq!(out.data["passedCount"], 5);
        assert!(out.failure.is_none());
    }

    #[tokio::test]
    async fn failures_are_recorded_per_assertion() {
        let fixture = Fixture::from_source(response());
        let mut stopping = assertion(AssertionKind::Status, None, AssertionOp::Equals, json!(404));
        stopping.stop_on_failure = true;
        let config = TestConfig {
            assertions: vec![
                stopping,
                assertion(AssertionKind::Body, Some("missing"), AssertionOp::Exists, Value::Null),
                assertion(AssertionKind::Status, None, AssertionOp::LessThan, json!(300)),
            ],
        };
        let out = run(config, &fixture).await;
        assert_eq!(out.data["failedCount"], 2);
        assert_eq!(out.data["results"][2]["passed"], true);
        assert!(matches!(out.failure, Some(NodeError::Assertion(_))));
        assert!(out.halt);
    }

    #[tokio::test]
    async fn falls_back_to_previous_results() {
        let mut fixture = Fixture::from_source(json!({}));
        fixture.previous.insert("OLD".to_string(), json!({"exitCode": 0}));
        let mut check = assertion(AssertionKind::Status, None, AssertionOp::Equals, json!(0));
        check.source_node_id = "OLD".to_string();
        let out = run(TestConfig { assertions: vec![check] }, &fixture).await;
        assert_eq!(out.data["passed"], true);
        assert!(!out.halt);
    }
}
