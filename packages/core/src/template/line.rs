//! Line-oriented script templates
//!
//! Each non-blank line that does not start with `#` is one command.
//! `$name` and `${name}` expand to variable values and `$$` is a literal
//! dollar sign. A line that references a multi-valued variable is emitted
//! once per value; shorter lists repeat their last value.

use std::iter::Peekable;
use std::str::CharIndices;

use super::{ScriptInstance, TemplateError, TemplateParser};
use crate::vars::Variables;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

#[derive(Debug, Clone)]
struct Line {
    number: usize,
    segments: Vec<Segment>,
}

impl Line {
    fn var_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }
}

/// Parser for line templates
#[derive(Debug, Default, Clone, Copy)]
pub struct LineTemplateParser;

impl TemplateParser for LineTemplateParser {
    fn parse(
        &self,
        text: &str,
        vars: &Variables,
    ) -> Result<Box<dyn ScriptInstance>, TemplateError> {
        Ok(Box::new(LineScript::parse(text, vars)?))
    }
}

/// A parsed line template and its variables
#[derive(Debug, Clone)]
pub struct LineScript {
    lines: Vec<Line>,
    vars: Variables,
}

impl LineScript {
    pub fn parse(text: &str, vars: &Variables) -> Result<Self, TemplateError> {
        let mut lines = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let number = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let line = Line {
                number,
                segments: parse_segments(number, trimmed)?,
            };
            if let Some(name) = line.var_names().find(|name| !vars.contains_key(*name)) {
                return Err(TemplateError::Undefined {
                    line: number,
                    name: name.to_string(),
                });
            }
            lines.push(line);
        }
        Ok(Self {
            lines,
            vars: vars.clone(),
        })
    }

    fn render_line(&self, line: &Line) -> Result<Vec<String>, TemplateError> {
        let mut repeat = 1;
        for name in line.var_names() {
            let values = self.vars.get(name).ok_or_else(|| TemplateError::Undefined {
                line: line.number,
                name: name.to_string(),
            })?;
            repeat = repeat.max(values.len());
        }

        let rendered = (0..repeat)
            .map(|i| {
                line.segments
                    .iter()
                    .map(|segment| match segment {
                        Segment::Text(text) => text.as_str(),
                        Segment::Var(name) => self
                            .vars
                            .get(name)
                            .and_then(|values| values.get(i).or(values.last()))
                            .map(String::as_str)
                            .unwrap_or_default(),
                    })
                    .collect::<String>()
            })
            .collect();
        Ok(rendered)
    }
}

impl ScriptInstance for LineScript {
    fn define(&mut self, key: &str, values: Vec<String>) {
        self.vars.insert(key.to_string(), values);
    }

    fn get(&self, key: &str) -> Option<&[String]> {
        self.vars.get(key).map(Vec::as_slice)
    }

    fn commands(&self) -> Result<Vec<String>, TemplateError> {
        let mut commands = Vec::new();
        for line in &self.lines {
            commands.extend(self.render_line(line)?);
        }
        Ok(commands)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_segments(number: usize, text: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }
        let name = match chars.peek().map(|&(_, next)| next) {
            Some('$') => {
                chars.next();
                literal.push('$');
                continue;
            }
            Some('{') => {
                chars.next();
                braced_name(number, &mut chars)?
            }
            Some(next) if is_name_char(next) => bare_name(&mut chars),
            _ => {
                literal.push('$');
                continue;
            }
        };
        if !literal.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Var(name));
    }

    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    Ok(segments)
}

fn bare_name(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut name = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_name_char(c) {
            break;
        }
        name.push(c);
        chars.next();
    }
    name
}

fn braced_name(
    number: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<String, TemplateError> {
    let mut name = String::new();
    for (_, c) in chars.by_ref() {
        if c == '}' {
            if name.is_empty() || !name.chars().all(is_name_char) {
                return Err(TemplateError::Syntax {
                    line: number,
                    message: format!("invalid variable name '{name}'"),
                });
            }
            return Ok(name);
        }
        name.push(c);
    }
    Err(TemplateError::Syntax {
        line: number,
        message: "unterminated '${'".to_string(),
    })
}
