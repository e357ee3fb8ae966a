//! Version specifier matching.
//!
//! A specifier is an exact tag, a `~X.Y.Z` range (same major and minor) or a
//! `^X.Y.Z` range (same major). There is no ordering: among several
//! compatible tags the caller takes the first one the registry listed.

/// How a specifier constrains candidate tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// Byte-identical tag match.
    Exact,
    /// `~X.Y.Z`: major and minor must agree.
    Tilde,
    /// `^X.Y.Z`: major must agree.
    Caret,
}

impl SpecifierKind {
    pub fn of(specifier: &str) -> Self {
        match specifier.chars().next() {
            Some('~') => SpecifierKind::Tilde,
            Some('^') => SpecifierKind::Caret,
            _ => SpecifierKind::Exact,
        }
    }
}

/// Check `tag` against `specifier`, returning the tag on a match.
///
/// Never fails: a tag that does not parse as three numeric components is
/// simply incompatible with a range specifier.
pub fn is_compatible<'t>(specifier: &str, tag: &'t str) -> Option<&'t str> {
    let matched = match SpecifierKind::of(specifier) {
        SpecifierKind::Exact => specifier == tag,
        kind => {
            let wanted = parse_triple(&specifier[1..]);
            let candidate = parse_triple(tag.strip_prefix('v').unwrap_or(tag));
            match (wanted, candidate) {
                (Some(w), Some(c)) if kind == SpecifierKind::Tilde => w[0] == c[0] && w[1] == c[1],
                (Some(w), Some(c)) => w[0] == c[0],
                _ => false,
            }
        }
    };

    matched.then_some(tag)
}

/// First tag in `tags` compatible with `specifier`, in the given order.
pub fn first_compatible<'t, I>(specifier: &str, tags: I) -> Option<&'t str>
where
    I: IntoIterator<Item = &'t str>,
{
    tags.into_iter().find_map(|tag| is_compatible(specifier, tag))
}

fn parse_triple(s: &str) -> Option<[u64; 3]> {
    let mut parts = s.split('.');
    let mut triple = [0u64; 3];
    for slot in triple.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(triple)
}
