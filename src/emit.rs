//! Content-bundle emission: one directory per post with `index.md` and its
//! downloaded images.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::archive::PostRecord;
use crate::images::ImageSet;
use crate::slug::SlugMapping;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> EmitError + '_ {
    move |source| EmitError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths written for one post.
#[derive(Debug)]
pub struct EmittedPost {
    pub content_path: PathBuf,
    pub image_paths: Vec<PathBuf>,
}

fn yaml_escape(title: &str) -> String {
    title.replace('"', "\\\"")
}

/// Front matter for one post: title, dates, draft flag, legacy aliases and
/// categories, in the key order Hugo documentation uses.
fn front_matter(post: &PostRecord, mapping: &SlugMapping) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("title: \"{}\"\n", yaml_escape(&post.title)));
    if !post.published.is_empty() {
        fm.push_str(&format!("date: {}\n", post.published));
    }
    if !post.updated.is_empty() {
        fm.push_str(&format!("lastmod: {}\n", post.updated));
    }
    fm.push_str(&format!("draft: {}\n", post.is_draft()));
    if !mapping.aliases.is_empty() {
        fm.push_str("aliases:\n");
        for alias in &mapping.aliases {
            fm.push_str(&format!("  - {alias}\n"));
        }
    }
    if !post.categories.is_empty() {
        fm.push_str("categories:\n");
        for category in &post.categories {
            fm.push_str(&format!("  - \"{}\"\n", yaml_escape(category)));
        }
    }
    fm.push_str("---\n\n");
    fm
}

/// Writes the post bundle under `<root>/posts/<slug>/`: front matter plus
/// body into `index.md`, fetched image payloads into `images/`. Re-emitting
/// the same slug overwrites the previous content.
pub fn emit(
    root: &Path,
    post: &PostRecord,
    mapping: &SlugMapping,
    body: &str,
    images: &ImageSet,
) -> Result<EmittedPost, EmitError> {
    let post_dir = root.join("posts").join(&mapping.slug);
    let image_dir = post_dir.join("images");
    // The images directory exists even for image-less posts, keeping the
    // bundle layout uniform.
    fs::create_dir_all(&image_dir).map_err(io_err(&image_dir))?;

    let content_path = post_dir.join("index.md");
    let document = format!("{}{}\n", front_matter(post, mapping), body);
    fs::write(&content_path, document).map_err(io_err(&content_path))?;
    debug!(path = %content_path.display(), "Wrote post content");

    let mut image_paths = Vec::new();
    for image in images.fetched() {
        let image_path = image_dir.join(&image.local_name);
        if let Some(bytes) = &image.bytes {
            fs::write(&image_path, bytes).map_err(io_err(&image_path))?;
            debug!(path = %image_path.display(), size = bytes.len(), "Wrote image");
            image_paths.push(image_path);
        }
    }

    info!(
        slug = %mapping.slug,
        draft = post.is_draft(),
        images = image_paths.len(),
        "Emitted post bundle"
    );

    Ok(EmittedPost {
        content_path,
        image_paths,
    })
}
