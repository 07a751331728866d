//! A minimal jq-style filter interpreter, serialized behind a process-wide
//! mutex because the underlying `jaq` compiler/VM is not re-entrant across
//! threads (see module docs in `lib.rs`).
use crate::Error;
use jaq_core::{load::{Arena, File, Loader}, Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use parking_lot::Mutex;
use serde_json::Value;

/// Global lock around query compilation and evaluation. `jaq`'s loader and
/// compiler hold non-`Sync` state internally; rather than depend on that
/// being safe to call concurrently, every `Run` goes through this lock, the
/// same workaround the query engine this crate is modeled on documents.
static ENGINE_LOCK: Mutex<()> = Mutex::new(());

fn native_funs() -> impl Iterator<Item = Native<Val>> {
    jaq_std::funs().chain(jaq_json::funs())
}

/// Evaluate `expr` against `input`, returning every value the filter emits.
fn run_raw(expr: &str, input: &Value) -> Result<Vec<Value>, Error> {
    let _guard = ENGINE_LOCK.lock();

    let program = File { code: expr, path: () };
    let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = Arena::default();
    let modules = loader.load(&arena, program).map_err(|errs| Error::Parse {
        expr: expr.to_string(),
        detail: format!("{errs:?}"),
    })?;

    let filter = Compiler::<_, Native<_>>::default()
        .with_funs(native_funs())
        .compile(modules)
        .map_err(|errs| Error::Parse {
            expr: expr.to_string(),
            detail: format!("{errs:?}"),
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let ctx = Ctx::new([], &inputs);
    let mut out = Vec::new();
    for result in filter.run((ctx, Val::from(input.clone()))) {
        match result {
            Ok(val) => out.push(Value::from(val)),
            Err(err) => {
                return Err(Error::Eval {
                    expr: expr.to_string(),
                    detail: err.to_string(),
                })
            }
        }
    }
    Ok(out)
}

fn first_result(expr: &str, input: &Value) -> Result<Value, Error> {
    run_raw(expr, input)?.into_iter().next().ok_or(Error::NoResult)
}

/// Evaluate `expr` against `input`, returning the raw first result
/// (including `null`) without coercing to any particular shape.
pub fn parse_value(expr: &str, input: &Value) -> Result<Value, Error> {
    first_result(expr, input)
}

/// Evaluate `expr` against `input`; the result must be a JSON string.
pub fn parse_string(expr: &str, input: &Value) -> Result<String, Error> {
    let v = first_result(expr, input)?;
    v.as_str().map(str::to_owned).ok_or(Error::NotAString(v))
}

/// Evaluate `expr` against `input`; the result must be a JSON bool. An empty
/// expression is treated as `true`, matching how an unset custom check means
/// "no additional condition".
pub fn parse_bool(expr: &str, input: &Value) -> Result<bool, Error> {
    if expr.trim().is_empty() {
        return Ok(true);
    }
    let v = first_result(expr, input)?;
    v.as_bool().ok_or(Error::NotABool(v))
}

/// Evaluate `expr` against `input`; the result must be a JSON object.
pub fn parse_map_interface(expr: &str, input: &Value) -> Result<serde_json::Map<String, Value>, Error> {
    let v = first_result(expr, input)?;
    match v {
        Value::Object(map) => Ok(map),
        other => Err(Error::NotAMap(other)),
    }
}

/// Evaluate a map of header-name to list-of-expressions, where each
/// expression is itself evaluated as a string against `input`. Preserves key
/// order and per-key element order.
pub fn parse_map_of_string_lists(
    exprs: &std::collections::BTreeMap<String, Vec<String>>,
    input: &Value,
) -> Result<std::collections::BTreeMap<String, Vec<String>>, Error> {
    let mut out = std::collections::BTreeMap::new();
    for (key, values) in exprs {
        let mut resolved = Vec::with_capacity(values.len());
        for expr in values {
            resolved.push(parse_string(expr, input)?);
        }
        out.insert(key.clone(), resolved);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_access_concatenation() {
        let ctx = json!({"payload": {"baseUrl": "https://x/u"}, "response": {"body": {"id": "1"}}});
        let got = parse_string(r#".payload.baseUrl + "/" + .response.body.id"#, &ctx).unwrap();
        assert_eq!(got, "https://x/u/1");
    }

    #[test]
    fn object_construction() {
        let ctx = json!({"payload": {"body": {"username": "u"}}});
        let got = parse_map_interface("{ username: .payload.body.username }", &ctx).unwrap();
        assert_eq!(got.get("username").unwrap(), "u");
    }

    #[test]
    fn empty_bool_is_true() {
        let ctx = json!({});
        assert!(parse_bool("", &ctx).unwrap());
    }

    #[test]
    fn non_string_result_errors() {
        let ctx = json!({"a": 1});
        let err = parse_string(".a", &ctx).unwrap_err();
        assert!(matches!(err, Error::NotAString(_)));
    }

    #[test]
    fn parse_value_preserves_null() {
        let ctx = json!({"a": null});
        assert_eq!(parse_value(".a", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn bad_expression_errors() {
        let ctx = json!({});
        let err = parse_string(".[", &ctx).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
