//! Markup-to-plain-text rendering for indexed page bodies.
//!
//! Provides the `Renderer` trait and a Markdown implementation that keeps
//! the words and drops the syntax.

/// Converts a page body into indexable plain text.
pub trait Renderer: Send + Sync {
    /// Render raw body bytes to plain text.
    fn render(&self, body: &[u8]) -> String;
}

/// Markdown renderer that strips markup line by line.
///
/// Algorithm:
/// 1. Copy fenced code blocks verbatim (fence lines dropped)
/// 2. Drop setext underlines, thematic breaks and link reference definitions
/// 3. Strip heading, blockquote and list markers
/// 4. Reduce inline links and images to their text, drop emphasis and code marks
/// 5. Collapse runs of blank lines
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PlainTextRenderer {
    fn render(&self, body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        let mut out = String::with_capacity(text.len());
        let mut fence: Option<&str> = None;
        let mut last_blank = true;

        for raw in text.lines() {
            let trimmed = raw.trim();

            // Step 1: fenced code
            if let Some(marker) = fence {
                if trimmed.starts_with(marker) {
                    fence = None;
                } else {
                    out.push_str(raw);
                    out.push('\n');
                    last_blank = false;
                }
                continue;
            }
            if let Some(marker) = fence_marker(trimmed) {
                fence = Some(marker);
                continue;
            }

            // Step 2: lines with no text content
            if is_rule(trimmed) || is_reference_definition(trimmed) {
                continue;
            }

            // Step 3 + 4
            let mut line = String::new();
            render_inline(strip_block_markers(trimmed), &mut line);
            let line = line.trim_end();

            // Step 5
            if line.is_empty() {
                if !last_blank {
                    out.push('\n');
                    last_blank = true;
                }
                continue;
            }
            out.push_str(line);
            out.push('\n');
            last_blank = false;
        }

        out.trim_end().to_string()
    }
}

fn fence_marker(line: &str) -> Option<&'static str> {
    if line.starts_with("```") {
        Some("```")
    } else if line.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Setext underlines (`===`, `---`) and thematic breaks (`***`, `- - -`).
fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(first) = compact.chars().next() else {
        return false;
    };
    matches!(first, '=' | '-' | '*' | '_') && compact.chars().all(|c| c == first)
        && (first == '=' || compact.len() >= 3)
}

/// `[id]: https://...`
fn is_reference_definition(line: &str) -> bool {
    line.starts_with('[')
        && line
            .find("]:")
            .is_some_and(|end| !line[1..end].contains(']'))
}

fn strip_block_markers(mut line: &str) -> &str {
    // Blockquotes, possibly nested
    while let Some(rest) = line.strip_prefix('>') {
        line = rest.trim_start();
    }

    // ATX headings
    if line.starts_with('#') {
        let hashes = line.chars().take_while(|&c| c == '#').count();
        let rest = &line[hashes..];
        if hashes <= 6 && (rest.is_empty() || rest.starts_with(' ')) {
            return rest.trim().trim_end_matches('#').trim_end();
        }
    }

    // Bullet lists
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    // Ordered lists
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }

    line
}

fn render_inline(line: &str, out: &mut String) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if chars.get(i + 1).is_some_and(|n| n.is_ascii_punctuation()) => {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            '!' if chars.get(i + 1) == Some(&'[') && link_span(&chars, i + 1).is_some() => {}
            '[' => {
                if let Some((close, after)) = link_span(&chars, i) {
                    let text: String = chars[i + 1..close].iter().collect();
                    render_inline(&text, out);
                    i = after;
                    continue;
                }
                out.push(c);
            }
            '*' | '`' => {}
            '~' if chars.get(i + 1) == Some(&'~') => {
                i += 2;
                continue;
            }
            '_' if !is_intraword(&chars, i) => {}
            _ => out.push(c),
        }
        i += 1;
    }
}

/// For `[text](url)` or `[text][ref]` starting at `open`, return the index
/// of the closing `]` and the index just past the whole link.
fn link_span(chars: &[char], open: usize) -> Option<(usize, usize)> {
    let close = open + 1 + chars[open + 1..].iter().position(|&c| c == ']')?;
    let terminator = match chars.get(close + 1)? {
        '(' => ')',
        '[' => ']',
        _ => return None,
    };
    let end = close + 2 + chars[close + 2..].iter().position(|&c| c == terminator)?;
    Some((close, end + 1))
}

fn is_intraword(chars: &[char], i: usize) -> bool {
    let before = i.checked_sub(1).and_then(|p| chars.get(p));
    let after = chars.get(i + 1);
    before.is_some_and(|c| c.is_alphanumeric()) && after.is_some_and(|c| c.is_alphanumeric())
}
