//! Key normalization for the in-memory provider.

use nvisy_storage::{Error, Result};

/// Key separator.
pub(crate) const SEPARATOR: char = '/';

/// Normalizes a key into its canonical `a/b/c` form.
///
/// Leading and trailing separators are dropped, so `my/dir/` and `my/dir`
/// name the same entry. Empty keys, empty segments and `.`/`..` segments are
/// rejected.
pub(crate) fn normalize(key: &str) -> Result<String> {
    let trimmed = key.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Err(Error::invalid_key().with_message("key is empty"));
    }

    let valid = trimmed
        .split(SEPARATOR)
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if !valid {
        return Err(Error::invalid_key().with_message(format!("malformed key '{key}'")));
    }

    Ok(trimmed.to_owned())
}

/// Normalizes a listing parent, where `None`, `""` and `/` all name the root.
pub(crate) fn normalize_parent(key: Option<&str>) -> Result<Option<String>> {
    match key {
        Some(key) if !key.trim_matches(SEPARATOR).is_empty() => normalize(key).map(Some),
        _ => Ok(None),
    }
}

/// Returns every proper ancestor of a normalized key, outermost first.
pub(crate) fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    key.match_indices(SEPARATOR).map(|(index, _)| &key[..index])
}

/// Returns the name of the immediate child of `parent` on the way to `path`.
///
/// `parent` is `None` for the root.
pub(crate) fn child_name<'a>(parent: Option<&str>, path: &'a str) -> Option<&'a str> {
    let rest = match parent {
        None => path,
        Some(parent) => path.strip_prefix(parent)?.strip_prefix(SEPARATOR)?,
    };

    rest.split(SEPARATOR).next().filter(|name| !name.is_empty())
}

/// Returns `true` if `path` lies strictly below the directory `parent`.
pub(crate) fn is_descendant(parent: &str, path: &str) -> bool {
    child_name(Some(parent), path).is_some()
}
