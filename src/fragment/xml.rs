//! Minimal XML scanner for mapping documents.
//!
//! Mapping documents only need element boundaries and attributes: the merge
//! engine lifts the inner body out of a `<mapper>` root, and the registry loader
//! walks the root's direct children. Text, comments, CDATA sections, processing
//! instructions and the DOCTYPE are skipped without interpretation.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static ATTRIBUTE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok()
});

/// A markup token: start tag (possibly self-closing) or end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Start {
        name: &'a str,
        attrs: &'a str,
        self_closing: bool,
        span: Range<usize>,
    },
    End {
        name: &'a str,
        span: Range<usize>,
    },
}

struct Tokens<'a> {
    src: &'a str,
    pos: usize,
    limit: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str, range: Range<usize>) -> Self {
        Self {
            src,
            pos: range.start,
            limit: range.end.min(src.len()),
        }
    }

    fn skip_past(&mut self, from: usize, terminator: &str, what: &str) -> Result<(), String> {
        match self.src[from..self.limit].find(terminator) {
            Some(rel) => {
                self.pos = from + rel + terminator.len();
                Ok(())
            }
            None => Err(format!("unterminated {what} at offset {from}")),
        }
    }

    /// End of a tag starting at `from`, honouring quoted attribute values.
    fn tag_end(&self, from: usize) -> Option<usize> {
        let mut quote = None;
        for (i, c) in self.src[from..self.limit].char_indices() {
            match (quote, c) {
                (None, '"' | '\'') => quote = Some(c),
                (Some(q), _) if q == c => quote = None,
                (None, '>') => return Some(from + i),
                _ => {}
            }
        }
        None
    }

    /// `<!DOCTYPE ...>` with an optional `[...]` internal subset.
    fn doctype_end(&self, from: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, c) in self.src[from..self.limit].char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => return Some(from + i),
                _ => {}
            }
        }
        None
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos >= self.limit {
                return None;
            }
            let start = self.pos + self.src[self.pos..self.limit].find('<')?;
            let rest = &self.src[start..self.limit];

            let skipped = if rest.starts_with("<!--") {
                self.skip_past(start + 4, "-->", "comment")
            } else if rest.starts_with("<![CDATA[") {
                self.skip_past(start + 9, "]]>", "CDATA section")
            } else if rest.starts_with("<?") {
                self.skip_past(start + 2, "?>", "processing instruction")
            } else if rest.starts_with("<!") {
                match self.doctype_end(start) {
                    Some(end) => {
                        self.pos = end + 1;
                        Ok(())
                    }
                    None => Err(format!("unterminated declaration at offset {start}")),
                }
            } else {
                return Some(self.tag(start));
            };
            if let Err(e) = skipped {
                return Some(Err(e));
            }
        }
    }
}

impl<'a> Tokens<'a> {
    fn tag(&mut self, start: usize) -> Result<Token<'a>, String> {
        let end = self
            .tag_end(start + 1)
            .ok_or_else(|| format!("unterminated tag at offset {start}"))?;
        self.pos = end + 1;
        let span = start..end + 1;

        if let Some(name) = self.src[start + 1..end].strip_prefix('/') {
            return Ok(Token::End {
                name: name.trim(),
                span,
            });
        }

        let mut inner = &self.src[start + 1..end];
        let self_closing = inner.ends_with('/');
        if self_closing {
            inner = &inner[..inner.len() - 1];
        }
        let name_len = inner
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        if !name.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == ':') {
            return Err(format!("invalid tag name at offset {start}"));
        }
        Ok(Token::Start {
            name,
            attrs: &inner[name_len..],
            self_closing,
            span,
        })
    }
}

/// An element located inside a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    pub name: &'a str,
    attrs: &'a str,
    /// From `<` of the start tag to `>` of the end tag.
    pub outer: Range<usize>,
    /// Between the start and end tags; `None` for self-closing elements.
    pub inner: Option<Range<usize>>,
    src: &'a str,
}

impl<'a> Element<'a> {
    /// Attribute value with the predefined entities decoded.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.attributes().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        let Some(re) = ATTRIBUTE.as_ref() else {
            return Vec::new();
        };
        re.captures_iter(self.attrs)
            .filter_map(|caps| {
                let key = caps.get(1)?.as_str().to_string();
                let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
                Some((key, decode_entities(value)))
            })
            .collect()
    }

    pub fn outer_text(&self) -> &'a str {
        &self.src[self.outer.clone()]
    }

    pub fn inner_text(&self) -> &'a str {
        self.inner.clone().map_or("", |range| &self.src[range])
    }

    /// Direct child elements.
    pub fn children(&self) -> Result<Vec<Element<'a>>, String> {
        match &self.inner {
            Some(range) => elements(self.src, range.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// Top-level elements of `src[range]`, in document order.
pub fn elements(src: &str, range: Range<usize>) -> Result<Vec<Element<'_>>, String> {
    let mut found = Vec::new();
    // open elements: (name, start of outer, end of start tag, attrs)
    let mut stack: Vec<(&str, usize, usize, &str)> = Vec::new();

    for token in Tokens::new(src, range) {
        match token? {
            Token::Start {
                name,
                attrs,
                self_closing,
                span,
            } => {
                if self_closing {
                    if stack.is_empty() {
                        found.push(Element {
                            name,
                            attrs,
                            outer: span,
                            inner: None,
                            src,
                        });
                    }
                } else {
                    stack.push((name, span.start, span.end, attrs));
                }
            }
            Token::End { name, span } => {
                let Some((open, outer_start, inner_start, attrs)) = stack.pop() else {
                    return Err(format!("unexpected </{name}> at offset {}", span.start));
                };
                if open != name {
                    return Err(format!(
                        "mismatched </{name}> at offset {}, expected </{open}>",
                        span.start
                    ));
                }
                if stack.is_empty() {
                    found.push(Element {
                        name,
                        attrs,
                        outer: outer_start..span.end,
                        inner: Some(inner_start..span.start),
                        src,
                    });
                }
            }
        }
    }

    if let Some((open, start, _, _)) = stack.last() {
        return Err(format!("unclosed <{open}> at offset {start}"));
    }
    Ok(found)
}

/// The single root element of a document.
pub fn root(src: &str) -> Result<Element<'_>, String> {
    let mut top = elements(src, 0..src.len())?;
    match top.len() {
        0 => Err("document has no root element".to_string()),
        1 => Ok(top.remove(0)),
        n => Err(format!("document has {n} root elements")),
    }
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
