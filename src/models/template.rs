//! Message templates with `{field}` placeholders.

use crate::error::{AppError, Result};
use crate::models::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed message body template.
///
/// `{name}` is replaced with the record's `name` field; `{{` and `}}`
/// produce literal braces. Placeholder names are taken verbatim, including
/// surrounding spaces. Format specs (`{price:>8}`) and conversions
/// (`{title!r}`) are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Parse a template string.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(AppError::template(source, "unclosed '{'"));
                            }
                            Some(c) => name.push(c),
                        }
                    }
                    if name.is_empty() {
                        return Err(AppError::template(source, "empty placeholder '{}'"));
                    }
                    if let Some(pos) = name.find([':', '!']) {
                        return Err(AppError::template(
                            source,
                            format!(
                                "placeholder '{{{name}}}': format specs and conversions ('{}') are not supported",
                                &name[pos..]
                            ),
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                '}' => return Err(AppError::template(source, "unmatched '}'")),
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Field names referenced by the template, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render a record. Fails if the template references a missing field.
    pub fn render(&self, record: &Record) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = record.text(name).ok_or_else(|| {
                        AppError::template(&self.source, format!("record has no field '{name}'"))
                    })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }

    /// Render a subject line from a collector name (`{collector}` placeholder).
    pub fn render_subject(&self, collector: &str) -> Result<String> {
        let record = Record::from_pairs([("collector", collector)])?;
        self.render(&record)
    }
}
