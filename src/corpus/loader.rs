//! Loading HTML policy pages from a corpus directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::fs;
use tracing::warn;

use crate::types::PipelineError;

/// A policy page reduced to plain text, ready for splitting.
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    /// Path of the source file relative to the corpus root.
    pub source: String,
    /// Document title (`<title>`, first heading, or the file stem).
    pub title: String,
    /// Extracted visible text with paragraph breaks preserved.
    pub text: String,
}

/// Walks `root` recursively and loads every `.html`/`.htm` file found.
///
/// Files are visited in path order so repeated runs process the corpus
/// deterministically. Documents that parse to no visible text are skipped
/// with a warning. An empty corpus yields an empty vector, not an error.
pub async fn load_corpus(
    root: &Path,
    limit: Option<usize>,
) -> Result<Vec<PolicyDocument>, PipelineError> {
    let mut files = collect_html_files(root).await?;
    files.sort();
    if let Some(limit) = limit {
        files.truncate(limit);
    }

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let html = fs::read_to_string(&path).await?;
        let source = relative_source(root, &path);
        let text = extract_text(&html);
        if text.is_empty() {
            warn!(source = %source, "document has no visible text, skipping");
            continue;
        }
        let title = extract_title(&html).unwrap_or_else(|| file_stem(&path));
        documents.push(PolicyDocument {
            source,
            title,
            text,
        });
    }
    Ok(documents)
}

async fn collect_html_files(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if is_html(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm")
    )
}

fn relative_source(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extracts the visible text of an HTML document.
///
/// Script, style, and template content is dropped. Block-level elements
/// contribute paragraph breaks so the splitter's `"\n\n"` separator still
/// sees document structure.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = body_selector();

    let mut raw = String::new();
    match document.select(body_selector).next() {
        Some(body) => push_element_text(body, &mut raw),
        None => {
            for text in document.root_element().text() {
                raw.push_str(text);
            }
        }
    }
    normalize_whitespace(&raw)
}

/// Pulls a title from `<title>` or the first `h1`/`h2` heading.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector in [title_selector(), heading_selector()] {
        if let Some(element) = document.select(selector).next() {
            let text = element.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn push_element_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if matches!(name, "script" | "style" | "noscript" | "template" | "head") {
        return;
    }
    let block = is_block(name);
    if block {
        ensure_paragraph_break(out);
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            push_element_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
    if block {
        ensure_paragraph_break(out);
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "nav"
            | "aside"
            | "ul"
            | "ol"
            | "li"
            | "table"
            | "tr"
            | "blockquote"
            | "pre"
            | "br"
            | "hr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

fn ensure_paragraph_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push_str("\n\n");
    }
}

fn normalize_whitespace(raw: &str) -> String {
    let collapsed = inline_space_re().replace_all(raw, " ");

    let mut out = String::new();
    let mut blank_pending = false;
    for line in collapsed.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            blank_pending = !out.is_empty();
            continue;
        }
        if blank_pending {
            out.push_str("\n\n");
            blank_pending = false;
        } else if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

fn inline_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\r\u{000C}\u{00A0}]+").expect("static regex"))
}

fn body_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("body").expect("static selector"))
}

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("title").expect("static selector"))
}

fn heading_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("h1, h2").expect("static selector"))
}
