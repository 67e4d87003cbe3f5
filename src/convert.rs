//! Coordinating module for the parse → map → convert → resolve → emit
//! pipeline, one post at a time.

use std::fmt;
use std::fs;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveError, Entries, EntryError, PostRecord};
use crate::config::ConvertConfig;
use crate::emit;
use crate::images::{self, HttpImageFetcher, ImageFetcher};
use crate::markdown;
use crate::slug::{self, SlugRegistry};

/// Failures that abort the whole run. Everything below archive level is
/// degraded into the report instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to construct image fetcher: {0}")]
    Fetcher(String),
}

/// A post that could not be converted; the run continues without it.
#[derive(Debug, Serialize)]
pub struct SkippedPost {
    pub entry: usize,
    pub reason: String,
}

/// An image that could not be fetched; its post keeps the remote URL.
#[derive(Debug, Serialize)]
pub struct ImageFailure {
    pub slug: String,
    pub url: String,
    pub reason: String,
}

/// Informational findings, all resolved automatically.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// Two posts cleaned to the same slug; the later one was suffixed.
    SlugCollision { base: String, resolved: String },
    /// A legacy path that does not look like `/yyyy/mm/slug.html` was kept
    /// as a best-effort alias.
    IrregularAlias { slug: String, alias: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::SlugCollision { base, resolved } => {
                write!(f, "slug collision on `{base}`, resolved as `{resolved}`")
            }
            RunWarning::IrregularAlias { slug, alias } => {
                write!(
                    f,
                    "post `{slug}`: legacy path `{alias}` does not match /yyyy/mm/slug.html, kept as-is"
                )
            }
        }
    }
}

/// Final accounting of one run.
#[derive(Debug, Default, Serialize)]
pub struct ConvertReport {
    pub posts_published: usize,
    pub posts_draft: usize,
    pub posts_skipped: Vec<SkippedPost>,
    pub image_failures: Vec<ImageFailure>,
    pub warnings: Vec<RunWarning>,
}

impl fmt::Display for ConvertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Converted {} published post(s) and {} draft post(s).",
            self.posts_published, self.posts_draft
        )?;
        if !self.posts_skipped.is_empty() {
            writeln!(f, "Skipped {} post(s):", self.posts_skipped.len())?;
            for skipped in &self.posts_skipped {
                writeln!(f, "  - entry {}: {}", skipped.entry, skipped.reason)?;
            }
        }
        if !self.image_failures.is_empty() {
            writeln!(
                f,
                "{} image(s) could not be fetched (remote URL kept):",
                self.image_failures.len()
            )?;
            for failure in &self.image_failures {
                writeln!(f, "  - {}: {}: {}", failure.slug, failure.url, failure.reason)?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f, "{} warning(s):", self.warnings.len())?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }
        Ok(())
    }
}

/// Entrypoint: convert the archive named by `config` with the production
/// HTTP fetcher.
pub async fn convert(config: &ConvertConfig) -> Result<ConvertReport, ConvertError> {
    let fetcher = HttpImageFetcher::new().map_err(|e| ConvertError::Fetcher(e.to_string()))?;
    convert_with_fetcher(config, &fetcher).await
}

/// Same pipeline with the transport injected, for tests and embedding.
pub async fn convert_with_fetcher(
    config: &ConvertConfig,
    fetcher: &dyn ImageFetcher,
) -> Result<ConvertReport, ConvertError> {
    info!(
        archive = %config.archive_path.display(),
        output_dir = %config.output_dir.display(),
        "Starting conversion run"
    );

    let content = fs::read_to_string(&config.archive_path).map_err(ArchiveError::Io)?;
    let entries = Entries::new(&content)?;

    let mut registry = SlugRegistry::new();
    let mut report = ConvertReport::default();

    for (entry_index, item) in entries.enumerate() {
        let post = match item {
            Ok(post) => post,
            Err(EntryError::Archive(e)) => {
                // The document itself broke mid-stream: nothing after this
                // point can be trusted, so the whole run fails.
                error!(error = %e, "Archive became unreadable mid-run");
                return Err(e.into());
            }
            Err(EntryError::MissingField { index, field }) => {
                warn!(entry = index, field, "Skipping entry missing a required field");
                report.posts_skipped.push(SkippedPost {
                    entry: index,
                    reason: format!("missing required field `{field}`"),
                });
                continue;
            }
        };

        match process_post(config, fetcher, &post, &mut registry, &mut report).await {
            Ok(()) => {
                if post.is_draft() {
                    report.posts_draft += 1;
                } else {
                    report.posts_published += 1;
                }
            }
            Err(e) => {
                error!(title = %post.title, error = %e, "Skipping post that failed to emit");
                report.posts_skipped.push(SkippedPost {
                    entry: entry_index,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        published = report.posts_published,
        drafts = report.posts_draft,
        skipped = report.posts_skipped.len(),
        image_failures = report.image_failures.len(),
        "Conversion run finished"
    );
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(report = %json, "Run report"),
        Err(e) => error!(error = %e, "Failed to serialize run report"),
    }

    Ok(report)
}

async fn process_post(
    config: &ConvertConfig,
    fetcher: &dyn ImageFetcher,
    post: &PostRecord,
    registry: &mut SlugRegistry,
    report: &mut ConvertReport,
) -> Result<(), emit::EmitError> {
    let derived = slug::derive(post, registry);
    if let Some(base) = &derived.collided_from {
        let warning = RunWarning::SlugCollision {
            base: base.clone(),
            resolved: derived.mapping.slug.clone(),
        };
        warn!(base = %base, resolved = %derived.mapping.slug, "Slug collision");
        report.warnings.push(warning);
    }
    if let Some(alias) = &derived.irregular_alias {
        report.warnings.push(RunWarning::IrregularAlias {
            slug: derived.mapping.slug.clone(),
            alias: alias.clone(),
        });
    }

    let doc = Html::parse_fragment(&post.body_html);
    let sources = images::discover(&doc);
    let image_set = images::resolve(&sources, fetcher).await;
    for (url, error) in image_set.failures() {
        report.image_failures.push(ImageFailure {
            slug: derived.mapping.slug.clone(),
            url: url.clone(),
            reason: error.to_string(),
        });
    }

    let body = markdown::convert_body(&doc, &image_set);
    emit::emit(
        &config.output_dir,
        post,
        &derived.mapping,
        &body,
        &image_set,
    )?;
    Ok(())
}
