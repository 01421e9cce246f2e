use std::sync::OnceLock;

use regex::{Captures, Regex};

/// `{{ scope.NAME }}` with an optional `| default("...")` filter
const PLACEHOLDER: &str = r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\)\s*)?\}\}"#;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLACEHOLDER).expect("valid placeholder regex"))
}

/// Resolve one `{{ scope.NAME }}` capture against the process environment
fn resolve(captures: &Captures<'_>) -> Result<String, String> {
    let key = &captures[1];
    let fallback = captures.get(2).map(|m| m.as_str());

    let Some(var) = key.strip_prefix("env.").filter(|name| !name.is_empty() && !name.contains('.')) else {
        return Err(format!("unsupported placeholder `{key}`, expected `env.NAME`"));
    };

    match (std::env::var(var), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(format!("environment variable `{var}` is not set")),
    }
}

/// Substitute `{{ env.VAR }}` and `{{ env.VAR | default("x") }}` in raw config text
///
/// Comment lines are copied through verbatim.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut cursor = 0;
        for captures in placeholder().captures_iter(line) {
            let Some(whole) = captures.get(0) else { continue };
            output.push_str(&line[cursor..whole.start()]);
            output.push_str(&resolve(&captures)?);
            cursor = whole.end();
        }
        output.push_str(&line[cursor..]);
    }

    Ok(output)
}
