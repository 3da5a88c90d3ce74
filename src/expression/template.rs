/// Mustache-style template rendering for URL, body, header, prompt and command fields
///
/// `{{path}}` resolves a path expression against the scope data (node outputs
/// keyed by node id), `{{$NAME}}` reads an environment variable. Missing
/// values render as the empty string so half-configured nodes still work.

use crate::error::QueryError;
use crate::expression::path::PathExpr;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Everything a template may reference
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Outputs produced so far in the run, keyed by node id
    pub data: &'a Value,
    /// Active environment variables
    pub env: &'a HashMap<String, String>,
}

impl<'a> Scope<'a> {
    pub fn new(data: &'a Value, env: &'a HashMap<String, String>) -> Self {
        Self { data, env }
    }
}

fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("static template regex"))
}

/// Resolve a single token body (without braces)
pub fn resolve_token(token: &str, scope: &Scope<'_>) -> Result<Option<Value>, QueryError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }
    if let Some(name) = token.strip_prefix('$') {
        return Ok(scope.env.get(name.trim()).map(|v| Value::String(v.clone())));
    }
    Ok(PathExpr::parse(token)?.evaluate(scope.data))
}

/// Render a template to a string
pub fn render(template: &str, scope: &Scope<'_>) -> Result<String, QueryError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for captures in token_pattern().captures_iter(template) {
        let (Some(whole), Some(token)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        rendered.push_str(&template[last..whole.start()]);
        if let Some(value) = resolve_token(token.as_str(), scope)? {
            rendered.push_str(&stringify(&value));
        }
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Render a template, keeping the typed value when the template is exactly one token
///
/// `"{{HTTP_01.response.data}}"` yields the object itself instead of its JSON text.
pub fn render_value(template: &str, scope: &Scope<'_>) -> Result<Value, QueryError> {
    let trimmed = template.trim();
    if let Some(captures) = token_pattern().captures(trimmed) {
        if let (Some(whole), Some(token)) = (captures.get(0), captures.get(1)) {
            if whole.start() == 0 && whole.end() == trimmed.len() {
                return Ok(resolve_token(token.as_str(), scope)?.unwrap_or(Value::Null));
            }
        }
    }
    Ok(Value::String(render(template, scope)?))
}

/// Convert a value to its template text form
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> HashMap<String, String> {
        HashMap::from([("API_HOST".to_string(), "api.example.com".to_string())])
    }

    #[test]
    fn substitutes_upstream_values() {
        let data = json!({"HTTP_01": {"response": {"status": 200}}});
        let env = env();
        let scope = Scope::new(&data, &env);
        assert_eq!(render("{{HTTP_01.response.status}}", &scope).unwrap(), "200");
        assert_eq!(render("code={{ HTTP_01.response.status }}!", &scope).unwrap(), "code=200!");
    }

    #[test]
    fn missing_paths_render_empty() {
        let data = json!({"HTTP_01": {}});
        let env = env();
        let scope = Scope::new(&data, &env);
        assert_eq!(render("{{HTTP_01.response.status}}", &scope).unwrap(), "");
        assert_eq!(render("[{{$NOPE}}]", &scope).unwrap(), "[]");
    }

    #[test]
    fn environment_variables_use_dollar_sigil() {
        let data = json!({});
        let env = env();
        let scope = Scope::new(&data, &env);
        assert_eq!(
            render("https://{{$API_HOST}}/users", &scope).unwrap(),
            "https://api.example.com/users"
        );
    }

    #[test]
    fn structured_values_are_json_encoded() {
        let data = json!({"P": {"list": [1, 2], "obj": {"k": "v"}}});
        let env = env();
        let scope = Scope::new(&data, &env);
        assert_eq!(render("{{P.list}}", &scope).unwrap(), "[1,2]");
        assert_eq!(render("{{P.obj}}", &scope).unwrap(), r#"{"k":"v"}"#);
        assert_eq!(render_value("{{P.obj}}", &scope).unwrap(), json!({"k": "v"}));
        assert_eq!(render_value("id-{{P.list[0]}}", &scope).unwrap(), json!("id-1"));
    }

    #[test]
    fn invalid_token_is_an_error() {
        let data = json!({});
        let env = env();
        let scope = Scope::new(&data, &env);
        let err = render("{{a..b}}", &scope).unwrap_err();
        assert_eq!(err.path, "a..b");
    }

    #[test]
    fn text_without_tokens_is_untouched() {
        let data = json!({});
        let env = env();
        let scope = Scope::new(&data, &env);
        assert_eq!(render("plain { text }", &scope).unwrap(), "plain { text }");
    }
}
