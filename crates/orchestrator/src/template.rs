//! Prompt templates with `{placeholder}` syntax.
//!
//! `{{` and `}}` render as literal braces. Placeholder names follow
//! identifier rules (`[A-Za-z_][A-Za-z0-9_]*`). Substituted values are
//! inserted verbatim and never re-scanned, so model output containing braces
//! is safe to thread into later stages.

use std::collections::HashMap;

use contracts::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Parsed prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`
    ///
    /// # Errors
    /// `TemplateError::Syntax` on an unclosed or empty placeholder, an invalid
    /// character inside braces, or an unmatched `}`.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) if is_ident_char(c, name.is_empty()) => name.push(c),
                            Some((at, c)) => {
                                return Err(TemplateError::Syntax {
                                    position: at,
                                    message: format!("unexpected character '{c}' in placeholder"),
                                })
                            }
                            None => {
                                return Err(TemplateError::Syntax {
                                    position: pos,
                                    message: "unclosed placeholder".to_string(),
                                })
                            }
                        }
                    }

                    if name.is_empty() {
                        return Err(TemplateError::Syntax {
                            position: pos,
                            message: "empty placeholder".to_string(),
                        });
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::Syntax {
                            position: pos,
                            message: "unmatched '}'".to_string(),
                        });
                    }
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of first appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder from `bindings`
    ///
    /// # Errors
    /// `TemplateError::Unbound` for the first placeholder without a value.
    pub fn render(&self, bindings: &HashMap<&str, &str>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value =
                        bindings
                            .get(name.as_str())
                            .ok_or_else(|| TemplateError::Unbound {
                                placeholder: name.clone(),
                            })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn is_ident_char(c: char, first: bool) -> bool {
    if first {
        c.is_ascii_alphabetic() || c == '_'
    } else {
        c.is_ascii_alphanumeric() || c == '_'
    }
}
