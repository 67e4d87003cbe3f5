//! HTML-to-Markdown conversion for post bodies.
//!
//! The body is walked in document order with a closed dispatch over the
//! element kinds we can express in Markdown. Anything else is embedded as raw
//! HTML verbatim, which keeps theme-specific markup intact at the cost of
//! fidelity — Hugo renders inline HTML fine.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::images::ImageSet;

/// Recognized element kinds. One arm per Markdown construct we emit, plus a
/// catch-all that falls back to raw HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Paragraph,
    Break,
    Emphasis,
    Strong,
    Link,
    Image,
    Table,
    Embed,
    Other,
}

fn classify(name: &str) -> ElementKind {
    match name {
        "p" => ElementKind::Paragraph,
        "br" => ElementKind::Break,
        "em" | "i" => ElementKind::Emphasis,
        "strong" | "b" => ElementKind::Strong,
        "a" => ElementKind::Link,
        "img" => ElementKind::Image,
        "table" => ElementKind::Table,
        "iframe" => ElementKind::Embed,
        _ => ElementKind::Other,
    }
}

/// Converts a parsed post body to Markdown. Image reference targets are taken
/// from `images`; the converter itself performs no I/O.
pub fn convert_body(doc: &Html, images: &ImageSet) -> String {
    let mut out = String::new();
    render_children(doc.root_element(), &mut out, images);
    out.trim().to_string()
}

fn render_children(parent: ElementRef<'_>, out: &mut String, images: &ImageSet) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => push_text(out, &**text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    render_element(element, out, images);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef<'_>, out: &mut String, images: &ImageSet) {
    match classify(element.value().name()) {
        ElementKind::Paragraph => {
            ensure_block_break(out);
            render_children(element, out, images);
            out.push_str("\n\n");
        }
        ElementKind::Break => out.push('\n'),
        ElementKind::Emphasis => {
            out.push('*');
            render_children(element, out, images);
            out.push('*');
        }
        ElementKind::Strong => {
            out.push_str("**");
            render_children(element, out, images);
            out.push_str("**");
        }
        ElementKind::Link => match element.value().attr("href") {
            Some(href) => {
                out.push('[');
                render_children(element, out, images);
                out.push_str(&format!("]({href})"));
            }
            None => render_children(element, out, images),
        },
        ElementKind::Image => {
            let src = element.value().attr("src").unwrap_or("");
            if src.is_empty() {
                return;
            }
            let alt = element.value().attr("alt").unwrap_or("");
            let target = images.markdown_target(src);
            out.push_str(&format!("![{alt}]({target})"));
        }
        ElementKind::Table => match table_to_markdown(element) {
            Some(markdown) => {
                ensure_block_break(out);
                // The rendered table already ends with a newline.
                out.push_str(&markdown);
                out.push('\n');
            }
            None => {
                // Merged cells (or nothing tabular at all): keep the table as
                // HTML so no cell content is lost.
                ensure_block_break(out);
                out.push_str(&element.html());
                out.push_str("\n\n");
            }
        },
        ElementKind::Embed => render_embed(element, out),
        ElementKind::Other => out.push_str(&element.html()),
    }
}

fn push_text(out: &mut String, text: &str) {
    // Inter-element whitespace is layout, not content.
    if text.trim().is_empty() {
        if !out.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        return;
    }
    out.push_str(text);
}

fn ensure_block_break(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if out.is_empty() {
        return;
    }
    while !out.ends_with("\n\n") {
        out.push('\n');
    }
}

/// YouTube and Google Drive embeds become portable Markdown/shortcodes, the
/// same translations the old Blogger themes relied on. Everything else stays
/// raw.
fn render_embed(element: ElementRef<'_>, out: &mut String) {
    let src = element.value().attr("src").unwrap_or("");
    if src.is_empty() {
        return;
    }
    let youtube = Regex::new(r"(?:youtube\.com/embed/|youtu\.be/)([\w-]+)").unwrap();
    if let Some(captures) = youtube.captures(src) {
        ensure_block_break(out);
        out.push_str(&format!("{{{{< youtube {} >}}}}", &captures[1]));
        out.push_str("\n\n");
        return;
    }
    let drive = Regex::new(r"drive\.google\.com/file/d/([^/]+)").unwrap();
    if let Some(captures) = drive.captures(src) {
        ensure_block_break(out);
        out.push_str(&format!(
            "[Download PDF](https://drive.google.com/uc?export=download&id={})",
            &captures[1]
        ));
        out.push_str("\n\n");
        return;
    }
    out.push_str(&element.html());
}

fn has_merged_cell(table: ElementRef<'_>) -> bool {
    let cells = Selector::parse("td, th").unwrap();
    table.select(&cells).any(|cell| {
        cell.value().attr("colspan").is_some() || cell.value().attr("rowspan").is_some()
    })
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| {
            cell.text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
                .replace('|', "\\|")
        })
        .collect()
}

/// Renders a simple table as a pipe-delimited Markdown table, header inferred
/// from the first row. Returns `None` for tables Markdown cannot express
/// (merged cells) or tables with no textual rows.
fn table_to_markdown(table: ElementRef<'_>) -> Option<String> {
    if has_merged_cell(table) {
        return None;
    }

    let tr = Selector::parse("tr").unwrap();
    let rows: Vec<Vec<String>> = table
        .select(&tr)
        .map(row_cells)
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .collect();
    if rows.is_empty() {
        return None;
    }

    let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let pad = |mut cells: Vec<String>| {
        cells.resize(width, String::new());
        cells
    };

    let mut rows = rows.into_iter().map(pad);
    let header = rows.next()?;
    let mut markdown = format!("| {} |\n", header.join(" | "));
    markdown.push_str(&format!("| {} |\n", vec!["---"; width].join(" | ")));
    for row in rows {
        markdown.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    Some(markdown)
}
