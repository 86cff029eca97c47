//! Recursive character splitting.
//!
//! Documents are cut into fragments of at most `fragment_chars` characters,
//! with `overlap_chars` of shared text between consecutive fragments. The
//! splitter prefers paragraph boundaries, then line boundaries, then word
//! boundaries, and only cuts mid-word when a single run of text has no
//! separators at all.

use crate::types::PipelineError;

/// Separator ladder, widest boundary first. The empty string is the
/// hard-cut fallback for separator-free text.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text into overlapping fragments along natural boundaries.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    fragment_chars: usize,
    overlap_chars: usize,
}

impl TextSplitter {
    /// Creates a splitter targeting `fragment_chars` per fragment with
    /// `overlap_chars` of overlap.
    pub fn new(fragment_chars: usize, overlap_chars: usize) -> Result<Self, PipelineError> {
        if fragment_chars == 0 {
            return Err(PipelineError::Config(
                "fragment_chars must be positive".into(),
            ));
        }
        if overlap_chars >= fragment_chars {
            return Err(PipelineError::Config(format!(
                "overlap_chars ({overlap_chars}) must be smaller than fragment_chars ({fragment_chars})"
            )));
        }
        Ok(Self {
            fragment_chars,
            overlap_chars,
        })
    }

    /// Splits `text` into fragments. Whitespace-only input yields nothing;
    /// input at or under the target size yields a single fragment.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        self.split_into(text, &SEPARATORS, &mut fragments);
        fragments
    }

    fn split_into(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.chars().count() <= self.fragment_chars {
            out.push(trimmed.to_string());
            return;
        }

        let (separator, narrower) = pick_separator(text, separators);
        if separator.is_empty() {
            self.hard_cut(trimmed, out);
            return;
        }

        let mut buffer: Vec<&str> = Vec::new();
        for part in text.split(separator) {
            if part.chars().count() > self.fragment_chars {
                self.merge_buffer(&mut buffer, separator, out);
                self.split_into(part, narrower, out);
            } else {
                buffer.push(part);
            }
        }
        self.merge_buffer(&mut buffer, separator, out);
    }

    /// Merges buffered parts into fragments no larger than the target,
    /// carrying a tail of at most `overlap_chars` forward so consecutive
    /// fragments overlap.
    fn merge_buffer(&self, buffer: &mut Vec<&str>, separator: &str, out: &mut Vec<String>) {
        if buffer.is_empty() {
            return;
        }
        let separator_chars = separator.chars().count();
        let mut window: Vec<&str> = Vec::new();

        for part in buffer.drain(..) {
            if !window.is_empty() && projected_chars(&window, separator_chars, part) > self.fragment_chars
            {
                if window_is_unemitted(&window, out, separator) {
                    emit(&window, separator, out);
                }
                while !window.is_empty()
                    && (joined_chars(&window, separator_chars) > self.overlap_chars
                        || projected_chars(&window, separator_chars, part) > self.fragment_chars)
                {
                    window.remove(0);
                }
            }
            window.push(part);
        }
        if window_is_unemitted(&window, out, separator) {
            emit(&window, separator, out);
        }
    }

    fn hard_cut(&self, text: &str, out: &mut Vec<String>) {
        let chars: Vec<char> = text.chars().collect();
        let step = self.fragment_chars - self.overlap_chars;
        let mut start = 0;
        loop {
            let end = (start + self.fragment_chars).min(chars.len());
            let fragment: String = chars[start..end].iter().collect();
            let fragment = fragment.trim().to_string();
            if !fragment.is_empty() {
                out.push(fragment);
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (idx, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[idx + 1..]);
        }
    }
    ("", &[])
}

/// Window size if `part` were appended.
fn projected_chars(window: &[&str], separator_chars: usize, part: &str) -> usize {
    let extra = if window.is_empty() { 0 } else { separator_chars };
    joined_chars(window, separator_chars) + extra + part.chars().count()
}

fn joined_chars(window: &[&str], separator_chars: usize) -> usize {
    if window.is_empty() {
        return 0;
    }
    let content: usize = window.iter().map(|part| part.chars().count()).sum();
    content + separator_chars * (window.len() - 1)
}

fn emit(window: &[&str], separator: &str, out: &mut Vec<String>) {
    let fragment = window.join(separator);
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        out.push(fragment.to_string());
    }
}

/// True when the current window holds content not yet covered by the last
/// emitted fragment, so shrinking or finishing should emit it first.
fn window_is_unemitted(window: &[&str], out: &[String], separator: &str) -> bool {
    if window.is_empty() {
        return false;
    }
    let joined = window.join(separator);
    let joined = joined.trim();
    if joined.is_empty() {
        return false;
    }
    out.last().map(|last| !last.ends_with(joined)).unwrap_or(true)
}
