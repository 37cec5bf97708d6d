//! Alarm message templates.
//!
//! A template string mixes literal text with `<name>` placeholders and
//! `[...]` conditional spans:
//!
//! ```text
//! <pkmn>[ (<iv>%)] until <24h_time>
//! ```
//!
//! Spans may nest. A `<` that does not open a well-formed placeholder is
//! literal text; `\[`, `\]`, `\<` and `\\` escape the special characters.
//! Templates are compiled once at load time against the placeholder set of
//! the category they belong to.

use crate::suggest::{did_you_mean, suggestion};
use crate::vocabulary::{FieldFormat, PlaceholderSet};

/// Errors raised while compiling a template string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unbalanced '[' / ']' at byte {position}")]
    UnbalancedBracket { position: usize },

    #[error("unknown placeholder <{name}>{}", did_you_mean(.suggestion))]
    UnknownPlaceholder {
        name: String,
        suggestion: Option<String>,
    },
}

/// A named substitution point together with its declared formatting rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub format: FieldFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
    /// A `[...]` span, emitted only when its placeholders resolve.
    Conditional(Vec<Segment>),
}

/// A compiled, immutable template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile `raw`, validating every placeholder against `known`.
    pub fn compile(raw: &str, known: &PlaceholderSet) -> Result<Self, CompileError> {
        let chars: Vec<(usize, char)> = raw.char_indices().collect();
        // Segments of each enclosing span, with the byte offset of its '['.
        let mut stack: Vec<(usize, Vec<Segment>)> = Vec::new();
        let mut current: Vec<Segment> = Vec::new();
        let mut literal = String::new();

        let mut i = 0;
        while i < chars.len() {
            let (pos, ch) = chars[i];
            match ch {
                '\\' => {
                    if let Some(&(_, next)) = chars.get(i + 1) {
                        if matches!(next, '[' | ']' | '<' | '\\') {
                            literal.push(next);
                            i += 2;
                            continue;
                        }
                    }
                    literal.push('\\');
                }
                '[' => {
                    flush_literal(&mut literal, &mut current);
                    stack.push((pos, std::mem::take(&mut current)));
                }
                ']' => {
                    flush_literal(&mut literal, &mut current);
                    let (_, parent) = stack
                        .pop()
                        .ok_or(CompileError::UnbalancedBracket { position: pos })?;
                    let inner = std::mem::replace(&mut current, parent);
                    current.push(Segment::Conditional(inner));
                }
                '<' => match scan_placeholder(&chars[i + 1..]) {
                    Some(name) => {
                        let format = known.format_of(&name).ok_or_else(|| {
                            CompileError::UnknownPlaceholder {
                                suggestion: suggestion(&name, &known.names()),
                                name: name.clone(),
                            }
                        })?;
                        flush_literal(&mut literal, &mut current);
                        // name + '<' + '>'
                        i += name.chars().count() + 2;
                        current.push(Segment::Placeholder(Placeholder { name, format }));
                        continue;
                    }
                    None => literal.push('<'),
                },
                _ => literal.push(ch),
            }
            i += 1;
        }

        if let Some((position, _)) = stack.pop() {
            return Err(CompileError::UnbalancedBracket { position });
        }
        flush_literal(&mut literal, &mut current);

        Ok(Self { segments: current })
    }

    /// A template made of a single literal run.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(text)]
        };
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every placeholder name referenced, in order of appearance (nested spans included).
    pub fn placeholders(&self) -> Vec<&str> {
        fn walk<'a>(segments: &'a [Segment], out: &mut Vec<&'a str>) {
            for segment in segments {
                match segment {
                    Segment::Literal(_) => {}
                    Segment::Placeholder(p) => out.push(&p.name),
                    Segment::Conditional(inner) => walk(inner, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.segments, &mut out);
        out
    }

    /// Split off a trailing top-level `<name>` placeholder.
    ///
    /// Returns the template without it plus the placeholder, or `None` when
    /// the template does not end with that placeholder.
    pub fn split_trailing(&self, name: &str) -> Option<(Template, &Placeholder)> {
        match self.segments.last() {
            Some(Segment::Placeholder(p)) if p.name == name => {
                let head = self.segments[..self.segments.len() - 1].to_vec();
                Some((Template { segments: head }, p))
            }
            _ => None,
        }
    }
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

/// Read `name>` from the characters following a `<`.
fn scan_placeholder(rest: &[(usize, char)]) -> Option<String> {
    let mut name = String::new();
    for &(_, ch) in rest {
        match ch {
            '>' if !name.is_empty() => return Some(name),
            c if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
            _ => return None,
        }
    }
    None
}
