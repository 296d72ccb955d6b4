// Text extraction module
// Maps uploaded files to plain text for embedding


use crate::{RagError, Result};
use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::Html;
use std::fmt;
use tracing::debug;

/// Supported document formats, derived from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Html,
    Markdown,
    Text,
}

impl FileType {
    /// Determine the file type from a filename, matching the extension
    /// case-insensitively. Unknown extensions are rejected before any
    /// extraction work happens.
    #[inline]
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .ok_or_else(|| RagError::UnsupportedFileType(filename.to_string()))?;

        if extension.eq_ignore_ascii_case("html") || extension.eq_ignore_ascii_case("htm") {
            Ok(Self::Html)
        } else if extension.eq_ignore_ascii_case("md") || extension.eq_ignore_ascii_case("markdown")
        {
            Ok(Self::Markdown)
        } else if extension.eq_ignore_ascii_case("txt") {
            Ok(Self::Text)
        } else {
            Err(RagError::UnsupportedFileType(extension.to_string()))
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for FileType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns raw file bytes into plain text for a known file type.
///
/// Binary formats (pdf, docx, ...) belong behind an alternative
/// implementation of this trait; the default one covers the text-based
/// formats in [`FileType`].
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], filetype: FileType) -> Result<String>;
}

/// Default extractor for HTML, Markdown and plain-text files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    #[inline]
    fn extract(&self, bytes: &[u8], filetype: FileType) -> Result<String> {
        let raw = std::str::from_utf8(bytes)
            .map_err(|e| RagError::Extraction(format!("File is not valid UTF-8: {e}")))?;

        let text = match filetype {
            FileType::Html => extract_html_text(raw),
            FileType::Markdown => extract_markdown_text(raw),
            FileType::Text => raw.to_string(),
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(RagError::Extraction(format!(
                "No text content found in {filetype} file"
            )));
        }

        debug!(
            "Extracted {} chars of text from {} input",
            text.len(),
            filetype
        );
        Ok(text)
    }
}

/// Extract visible text from an HTML document, skipping non-content elements
fn extract_html_text(html: &str) -> String {
    const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "head", "template"];

    let document = Html::parse_document(html);
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_TAGS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(trimmed);
    }

    out
}

/// Flatten markdown to plain text by walking the event stream
fn extract_markdown_text(markdown: &str) -> String {
    let mut out = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_),
            ) => out.push('\n'),
            _ => {}
        }
    }

    out
}
