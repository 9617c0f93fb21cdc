//! `{{dotted.path}}` substitution against a JSON context.
//!
//! Unresolvable placeholders are left exactly as written so a partially
//! configured template stays readable. Substituted values are never
//! rescanned.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_.]+)\}\}").unwrap())
}

/// Resolve every `{{a.b.c}}` placeholder in `template` against `context`.
///
/// - missing keys (at any depth) leave the placeholder untouched
/// - strings are inserted raw
/// - objects and arrays are inserted as pretty-printed JSON
/// - `null`, numbers and booleans use their JSON form; integral floats drop `.0`
pub fn interpolate(template: &str, context: &Value) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            let path = &caps[1];
            match lookup(context, path) {
                Some(value) => render(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_nested_paths() {
        let ctx = json!({"name": "pets", "selections": {"Cloud": "AWS"}});
        assert_eq!(
            interpolate("{{name}} on {{selections.Cloud}}", &ctx),
            "pets on AWS"
        );
    }

    #[test]
    fn missing_key_leaves_placeholder() {
        assert_eq!(interpolate("Hello {{x.y}}", &json!({})), "Hello {{x.y}}");
    }

    #[test]
    fn missing_intermediate_on_scalar_leaves_placeholder() {
        let ctx = json!({"x": "flat"});
        assert_eq!(interpolate("{{x.y}}", &ctx), "{{x.y}}");
    }

    #[test]
    fn null_value_renders_as_null() {
        assert_eq!(interpolate("v={{a}}", &json!({"a": null})), "v=null");
    }

    #[test]
    fn integral_float_drops_fraction() {
        let ctx = json!({"x": 2.0, "y": -3.0, "z": 2.5});
        assert_eq!(interpolate("{{x}} {{y}} {{z}}", &ctx), "2 -3 2.5");
    }

    #[test]
    fn objects_render_as_pretty_json() {
        let out = interpolate("{{a}}", &json!({"a": {"k": 1}}));
        assert_eq!(out, "{\n  \"k\": 1\n}");
    }

    #[test]
    fn arrays_render_as_pretty_json() {
        let out = interpolate("{{agents}}", &json!({"agents": ["qa"]}));
        assert_eq!(out, "[\n  \"qa\"\n]");
    }

    #[test]
    fn scalars_use_display_form() {
        let ctx = json!({"n": 3, "b": false, "f": 1.5});
        assert_eq!(interpolate("{{n}} {{b}} {{f}}", &ctx), "3 false 1.5");
    }

    #[test]
    fn no_recursive_expansion() {
        let ctx = json!({"a": "{{b}}", "b": "boom"});
        assert_eq!(interpolate("{{a}}", &ctx), "{{b}}");
    }

    #[test]
    fn resolved_text_is_a_fixed_point() {
        let ctx = json!({"name": "pets", "context": {"db": "postgres"}});
        let once = interpolate("# {{name}} uses {{context.db}}", &ctx);
        assert_eq!(interpolate(&once, &ctx), once);
    }

    #[test]
    fn ignores_non_path_braces() {
        let ctx = json!({"a": "x"});
        assert_eq!(interpolate("{{ a }} {{a-b}} {a}", &ctx), "{{ a }} {{a-b}} {a}");
    }

    #[test]
    fn array_index_lookup() {
        let ctx = json!({"agents": ["pm", "qa"]});
        assert_eq!(interpolate("{{agents.1}}", &ctx), "qa");
    }
}
