/// Expression & Template Evaluator
///
/// Two small sub-languages shared by every node type:
/// - path expressions (`a.b[2]`, `a.b[].c`) for selecting data
/// - `{{path}}` / `{{$VAR}}` templates for config fields
///
/// XML payloads are converted into the same nested shape so both are
/// addressed uniformly.

// Path-expression parser and evaluator (jsonpath_lib backed)
pub mod path;

// Mustache-style template rendering
pub mod template;

// XML to nested value conversion
pub mod xml;

pub use path::{query, PathExpr, Segment};
pub use template::{render, render_value, Scope};
