//! Slug derivation and legacy-URL alias mapping.
//!
//! Slugs come from the trailing segment of the old Blogger permalink when one
//! exists, otherwise from the post title, otherwise from the tail of the Atom
//! id. Collisions across one run are resolved by [`SlugRegistry`], a single
//! explicit value owned by the orchestrator.

use regex::Regex;
use std::collections::HashSet;

use crate::archive::PostRecord;

/// Routing for one post: the new Hugo path plus the legacy paths that must
/// redirect to it.
#[derive(Debug, Clone)]
pub struct SlugMapping {
    pub slug: String,
    /// `/posts/<slug>/`
    pub new_path: String,
    /// Legacy paths, in the order they were discovered.
    pub aliases: Vec<String>,
}

/// Outcome of deriving a mapping, including what the orchestrator needs to
/// report: whether a collision suffix was applied and whether a legacy path
/// failed the `/yyyy/mm/slug.html` shape check.
#[derive(Debug, Clone)]
pub struct Derived {
    pub mapping: SlugMapping,
    /// Set when the bare slug was taken and a `-2`, `-3`, … suffix was used.
    pub collided_from: Option<String>,
    /// Set when the legacy path was kept as a best-effort alias despite not
    /// matching the recognized shape.
    pub irregular_alias: Option<String>,
}

/// Slugs claimed so far in this run. First claim keeps the bare slug, later
/// claims of the same name get a numeric suffix in encounter order.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> SlugRegistry {
        SlugRegistry::default()
    }

    /// Claims `base`, suffixing with `-2`, `-3`, … until a free name is
    /// found. Returns the claimed slug and whether a suffix was needed.
    pub fn claim(&mut self, base: &str) -> (String, bool) {
        if self.taken.insert(base.to_string()) {
            return (base.to_string(), false);
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return (candidate, true);
            }
            n += 1;
        }
    }
}

/// Cleans a name into URL-safe form: lowercase, whitespace and underscores
/// become dashes, anything outside `[a-z0-9.-]` becomes a dash, dash runs
/// collapse, leading/trailing dashes are trimmed.
pub fn sanitize(name: &str) -> String {
    let lowered = name
        .to_lowercase()
        .replace("%20", "-")
        .replace([' ', '\t', '\n', '_'], "-");
    let unsafe_chars = Regex::new(r"[^a-z0-9.-]+").unwrap();
    let dash_runs = Regex::new(r"-{2,}").unwrap();
    let cleaned = unsafe_chars.replace_all(&lowered, "-");
    let collapsed = dash_runs.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

fn legacy_stem(legacy_url: &str) -> String {
    let stem = legacy_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    sanitize(stem.trim_end_matches(".html"))
}

fn id_tail(id: &str) -> String {
    sanitize(id.rsplit('-').next().unwrap_or(id))
}

/// Derives the slug, new path and aliases for one post, claiming the slug in
/// `registry`.
pub fn derive(post: &PostRecord, registry: &mut SlugRegistry) -> Derived {
    let base = post
        .legacy_url
        .as_deref()
        .map(legacy_stem)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(sanitize(&post.title)).filter(|s| !s.is_empty()))
        .or_else(|| Some(id_tail(&post.id)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "post".to_string());

    let (slug, collided) = registry.claim(&base);
    let new_path = format!("/posts/{slug}/");

    let mut aliases = Vec::new();
    let mut irregular_alias = None;
    if let Some(legacy) = post.legacy_url.as_deref() {
        let recognized = Regex::new(r"^/\d{4}/\d{2}/[^/]+\.html$").unwrap();
        if !recognized.is_match(legacy) {
            // Best effort: the old path still becomes an alias, it just gets
            // reported as not matching the expected Blogger permalink shape.
            irregular_alias = Some(legacy.to_string());
        }
        aliases.push(legacy.to_string());
    }

    Derived {
        mapping: SlugMapping {
            slug,
            new_path,
            aliases,
        },
        collided_from: collided.then(|| base),
        irregular_alias,
    }
}
