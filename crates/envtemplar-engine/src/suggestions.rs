//! Fuzzy matching and context-aware suggestions for template errors
//!
//! Mistyped function, filter and environment variable names are matched
//! against the known ones by Levenshtein distance.

use envtemplar_core::RenderContext;

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Built-in filters of the Jinja2-style dialect
pub const JINJA_FILTERS: &[&str] = &[
    "default",
    "upper",
    "lower",
    "title",
    "capitalize",
    "replace",
    "trim",
    "join",
    "split",
    "first",
    "last",
    "length",
    "reverse",
    "sort",
    "unique",
    "map",
    "select",
    "reject",
    "selectattr",
    "rejectattr",
    "batch",
    "slice",
    "dictsort",
    "items",
    "attr",
    "int",
    "float",
    "abs",
    "round",
    "string",
    "list",
    "bool",
    "safe",
    "escape",
    "e",
    "indent",
    "tojson",
    "urlencode",
];

/// Built-in global functions of the Jinja2-style dialect
pub const JINJA_FUNCTIONS: &[&str] = &["range", "lipsum", "cycler", "joiner", "namespace", "dict"];

/// Candidates within [`MAX_SUGGESTION_DISTANCE`] edits of `input`, best first
///
/// Exact matches are skipped; ties keep the order of `candidates`.
pub fn closest<'c>(input: &str, candidates: &[&'c str], limit: usize) -> Vec<&'c str> {
    let mut scored: Vec<(usize, &'c str)> = candidates
        .iter()
        .map(|&candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|&(distance, _)| distance > 0 && distance <= MAX_SUGGESTION_DISTANCE)
        .collect();
    scored.sort_by_key(|&(distance, _)| distance);
    scored.into_iter().take(limit).map(|(_, name)| name).collect()
}

fn backquoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// "Did you mean" for a function name that is not in `available`
pub fn suggest_unknown_function(func_name: &str, available: &[&str]) -> Option<String> {
    let matches = closest(func_name, available, 3);
    (!matches.is_empty()).then(|| format!("Did you mean {}?", backquoted(&matches)))
}

/// Hint for a filter the Jinja2-style dialect does not know
pub fn suggest_unknown_filter(filter_name: &str) -> Option<String> {
    let matches = closest(filter_name, JINJA_FILTERS, 3);
    Some(if matches.is_empty() {
        format!(
            "Unknown filter `{}`. Common filters: default, upper, lower, replace, trim, join, indent",
            filter_name
        )
    } else {
        format!("Did you mean {}?", backquoted(&matches))
    })
}

/// Explain how to read environment variables after a failed field lookup
///
/// Field access never reads the environment; only `env` does. When the
/// field name is (or closely resembles) a variable in `context`, the hint
/// names it.
pub fn suggest_env_access(
    field: &str,
    context: &RenderContext,
    left_delim: &str,
    right_delim: &str,
) -> String {
    let usage = |name: &str| format!("{} env \"{}\" {}", left_delim, name, right_delim);

    if context.contains(field) {
        return format!(
            "`{}` is an environment variable; fields are never bound, read it with `{}`",
            field,
            usage(field)
        );
    }

    let names: Vec<&str> = context.names().collect();
    match closest(field, &names, 1).first() {
        Some(best) => format!(
            "Fields are never bound. Did you mean the environment variable `{}`? Use `{}`",
            best,
            usage(best)
        ),
        None => format!(
            "Fields are never bound; read environment variables with `{}`",
            usage(field)
        ),
    }
}

/// First name quoted with backticks, single or double quotes in `msg`
pub fn extract_quoted_name(msg: &str) -> Option<String> {
    let (open, quote) = msg.char_indices().find(|(_, c)| matches!(c, '`' | '\'' | '"'))?;
    let rest = &msg[open + quote.len_utf8()..];
    rest.find(quote).map(|close| rest[..close].to_string())
}
