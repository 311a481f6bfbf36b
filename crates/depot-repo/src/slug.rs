//! Name to slug conversion.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{RepoError, Result};

/// Regex for valid slugs.
/// Lower-case alphanumerics separated by single hyphens, no leading or
/// trailing hyphen.
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("Invalid regex"));

/// Longest slug a repository may have.
pub const MAX_SLUG_LENGTH: usize = 100;

/// Converts a repository name into its URL-safe slug.
///
/// The name is lower-cased; whitespace and underscores become hyphens; any
/// other character outside `[a-z0-9-]` is dropped; hyphen runs collapse and
/// leading or trailing hyphens are trimmed. The result may be empty.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = if c.is_whitespace() || c == '_' { '-' } else { c };
        match c {
            'a'..='z' | '0'..='9' => slug.push(c),
            '-' if !slug.is_empty() && !slug.ends_with('-') => slug.push('-'),
            _ => {}
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Checks a slug against the slug grammar.
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LENGTH && SLUG_REGEX.is_match(slug)
}

/// Derives and validates the slug for `name`.
///
/// # Errors
///
/// Returns [`RepoError::InvalidName`] if the derived slug is empty, too
/// long or otherwise fails the grammar.
pub fn derive_slug(name: &str) -> Result<String> {
    let slug = slugify(name);
    if !is_valid_slug(&slug) {
        return Err(RepoError::InvalidName(format!(
            "'{}' does not produce a valid slug",
            name
        )));
    }
    Ok(slug)
}
