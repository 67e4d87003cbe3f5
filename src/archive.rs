//! Streaming parser for Blogger Atom export archives.
//!
//! A Blogger export is one large Atom feed whose `<entry>` elements carry the
//! posts, pages and settings of the blog. Posts are marked with
//! `<blogger:type>POST</blogger:type>`; their draft state and original
//! permalink live in `<blogger:status>` and `<blogger:filename>`.
//!
//! [`Entries`] pulls one entry at a time off a [`quick_xml`] reader, so the
//! archive is traversed lazily in a single pass. Entry-level defects (a post
//! missing a required field) are yielded as recoverable items; only a
//! document that is not well-formed Atom at all is fatal.

use thiserror::Error;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Fatal archive-level failures. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed archive XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("not a Blogger Atom export: {0}")]
    NotAtom(String),
}

/// Per-entry failures. The orchestrator records these and keeps going.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("entry {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// Publication state of a post, derived from `<blogger:status>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Published,
    Draft,
}

/// One normalized Atom entry of kind POST. Immutable once yielded.
#[derive(Debug, Clone)]
pub struct PostRecord {
    /// Opaque legacy identifier from `<id>`.
    pub id: String,
    pub title: String,
    /// RFC 3339 timestamps, passed through verbatim (empty when absent).
    pub published: String,
    pub updated: String,
    pub status: PostStatus,
    /// Original Blogger permalink path, e.g. `/2015/03/hello-world.html`.
    /// Usually absent for drafts.
    pub legacy_url: Option<String>,
    /// Raw post body HTML from `<content>`.
    pub body_html: String,
    /// Category terms in document order, de-duplicated.
    pub categories: Vec<String>,
}

impl PostRecord {
    pub fn is_draft(&self) -> bool {
        self.status == PostStatus::Draft
    }
}

/// Child elements of `<entry>` we capture. Everything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Published,
    Updated,
    Content,
    BloggerType,
    BloggerStatus,
    BloggerFilename,
}

impl Field {
    fn recognize(name: &[u8]) -> Option<Field> {
        match name {
            b"id" => Some(Field::Id),
            b"title" => Some(Field::Title),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            b"content" => Some(Field::Content),
            b"blogger:type" => Some(Field::BloggerType),
            b"blogger:status" => Some(Field::BloggerStatus),
            b"blogger:filename" => Some(Field::BloggerFilename),
            _ => None,
        }
    }
}

/// Accumulated raw state of one `<entry>` while it is being read.
#[derive(Debug, Default)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    content: Option<String>,
    kind: Option<String>,
    status: Option<String>,
    filename: Option<String>,
    categories: Vec<String>,
}

impl RawEntry {
    fn field_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Id => &mut self.id,
            Field::Title => &mut self.title,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Content => &mut self.content,
            Field::BloggerType => &mut self.kind,
            Field::BloggerStatus => &mut self.status,
            Field::BloggerFilename => &mut self.filename,
        }
    }

    fn into_post(self, index: usize) -> Result<PostRecord, EntryError> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => return Err(EntryError::MissingField { index, field: "id" }),
        };
        let title = self
            .title
            .ok_or(EntryError::MissingField {
                index,
                field: "title",
            })?
            .trim()
            .to_string();
        let body_html = self.content.ok_or(EntryError::MissingField {
            index,
            field: "content",
        })?;

        let status = match self.status.as_deref() {
            Some("DRAFT") => PostStatus::Draft,
            _ => PostStatus::Published,
        };
        let legacy_url = self.filename.and_then(|f| {
            let f = f.trim();
            if f.is_empty() {
                None
            } else if f.starts_with('/') {
                Some(f.to_string())
            } else {
                Some(format!("/{f}"))
            }
        });

        Ok(PostRecord {
            id,
            title,
            published: self.published.unwrap_or_default().trim().to_string(),
            updated: self.updated.unwrap_or_default().trim().to_string(),
            status,
            legacy_url,
            body_html,
            categories: self.categories,
        })
    }
}

/// Lazy iterator over the POST entries of one export archive.
///
/// Yields `Ok(PostRecord)` per post, `Err(EntryError::MissingField)` for a
/// structurally valid entry lacking a required field, and
/// `Err(EntryError::Archive)` once for a document that breaks mid-stream
/// (after which iteration ends).
pub struct Entries<'a> {
    reader: Reader<&'a [u8]>,
    /// Ordinal of the entry currently being read, for error reporting.
    next_index: usize,
    done: bool,
}

impl<'a> std::fmt::Debug for Entries<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entries")
            .field("next_index", &self.next_index)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<'a> Entries<'a> {
    /// Validates that the document opens with an Atom `<feed>` root and
    /// positions the reader just inside it.
    pub fn new(content: &'a str) -> Result<Entries<'a>, ArchiveError> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if e.local_name().as_ref() == b"feed" {
                        return Ok(Entries {
                            reader,
                            next_index: 0,
                            done: false,
                        });
                    }
                    return Err(ArchiveError::NotAtom(format!(
                        "root element is `{}`, expected `feed`",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                Event::Eof => {
                    return Err(ArchiveError::NotAtom("document has no root element".into()))
                }
                // XML declaration, comments, processing instructions, doctype.
                _ => continue,
            }
        }
    }

    fn category_term(e: &BytesStart<'_>) -> Result<Option<String>, ArchiveError> {
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_ref() == b"term" {
                let term = attr.unescape_value().map_err(ArchiveError::Xml)?;
                return Ok(Some(term.into_owned()));
            }
        }
        Ok(None)
    }

    /// Reads one full `<entry>` element, the opening tag already consumed.
    fn read_entry(&mut self, index: usize) -> Result<RawEntry, ArchiveError> {
        let mut raw = RawEntry::default();
        // Depth of nesting relative to the entry element itself.
        let mut depth = 0usize;
        let mut field: Option<Field> = None;

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    if depth == 0 {
                        let name = e.name();
                        if name.as_ref() == b"category" {
                            if let Some(term) = Self::category_term(&e)? {
                                if !raw.categories.contains(&term) {
                                    raw.categories.push(term);
                                }
                            }
                        } else if let Some(f) = Field::recognize(name.as_ref()) {
                            field = Some(f);
                            // Element presence counts even when its text is empty.
                            raw.field_mut(f).get_or_insert_with(String::new);
                        }
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if depth == 0 {
                        let name = e.name();
                        if name.as_ref() == b"category" {
                            if let Some(term) = Self::category_term(&e)? {
                                if !raw.categories.contains(&term) {
                                    raw.categories.push(term);
                                }
                            }
                        } else if let Some(f) = Field::recognize(name.as_ref()) {
                            raw.field_mut(f).get_or_insert_with(String::new);
                        }
                    }
                }
                Event::Text(t) => {
                    if depth == 1 {
                        if let Some(f) = field {
                            let text = t.unescape()?;
                            if let Some(buf) = raw.field_mut(f).as_mut() {
                                buf.push_str(&text);
                            }
                        }
                    }
                }
                Event::CData(c) => {
                    if depth == 1 {
                        if let Some(f) = field {
                            let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                            if let Some(buf) = raw.field_mut(f).as_mut() {
                                buf.push_str(&text);
                            }
                        }
                    }
                }
                Event::End(e) => {
                    if depth == 0 {
                        if e.local_name().as_ref() == b"entry" {
                            return Ok(raw);
                        }
                        return Err(ArchiveError::NotAtom(format!(
                            "entry {index} closed by unexpected `</{}>`",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    depth -= 1;
                    if depth == 0 {
                        field = None;
                    }
                }
                Event::Eof => {
                    return Err(ArchiveError::NotAtom(format!(
                        "document ended inside entry {index}"
                    )))
                }
                _ => {}
            }
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<PostRecord, EntryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"entry" => {
                    let index = self.next_index;
                    self.next_index += 1;
                    match self.read_entry(index) {
                        Ok(raw) => {
                            // Only POST entries become records; pages, comments
                            // and settings entries are skipped silently.
                            if raw.kind.as_deref() != Some("POST") {
                                continue;
                            }
                            return Some(raw.into_post(index));
                        }
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e.into()));
                        }
                    }
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(EntryError::Archive(e.into())));
                }
            }
        }
    }
}
