#![forbid(unsafe_code)]

//! Minimal CSS selector subset for the simulated document.
//!
//! Supports a single compound selector: optional tag or `*`, then any number
//! of `.class`, `[attr]`, `[attr="v"]` and `[attr*="v"]` parts. Anything
//! else is a syntax error, mirroring `querySelectorAll` throwing.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Class(String),
    Has(String),
    Equals(String, String),
    Contains(String, String),
}

/// Parsed compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    parts: Vec<Part>,
}

/// Attributes the matcher can see.
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'a> {
    pub tag: &'a str,
    pub classes: &'a [String],
    pub attrs: &'a BTreeMap<String, String>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("empty selector".into());
        }
        let mut rest = input;
        let tag_len = rest
            .find(|c: char| c == '.' || c == '[')
            .unwrap_or(rest.len());
        let tag = match &rest[..tag_len] {
            "" | "*" => None,
            name if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => {
                Some(name.to_ascii_lowercase())
            }
            other => return Err(format!("unsupported selector `{other}`")),
        };
        rest = &rest[tag_len..];

        let mut parts = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                let class = &after[..end];
                if class.is_empty() {
                    return Err("empty class name".into());
                }
                parts.push(Part::Class(class.to_owned()));
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| "unterminated attribute selector".to_string())?;
                parts.push(parse_attribute(&after[..end])?);
                rest = &after[end + 1..];
            } else {
                return Err(format!("unexpected `{rest}`"));
            }
        }
        Ok(Self { tag, parts })
    }

    #[must_use]
    pub fn matches(&self, el: &Attributes<'_>) -> bool {
        if let Some(tag) = &self.tag
            && !tag.eq_ignore_ascii_case(el.tag)
        {
            return false;
        }
        self.parts.iter().all(|part| match part {
            Part::Class(class) => el.classes.iter().any(|c| c == class),
            Part::Has(name) => el.attrs.contains_key(name),
            Part::Equals(name, value) => el.attrs.get(name).is_some_and(|v| v == value),
            Part::Contains(name, value) => el.attrs.get(name).is_some_and(|v| v.contains(value)),
        })
    }
}

fn parse_attribute(body: &str) -> Result<Part, String> {
    let unquote = |v: &str| -> Result<String, String> {
        let v = v.trim();
        v.strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .map(str::to_owned)
            .ok_or_else(|| format!("attribute value must be quoted: {v}"))
    };
    if let Some((name, value)) = body.split_once("*=") {
        return Ok(Part::Contains(name.trim().to_owned(), unquote(value)?));
    }
    if let Some((name, value)) = body.split_once('=') {
        return Ok(Part::Equals(name.trim().to_owned(), unquote(value)?));
    }
    let name = body.trim();
    if name.is_empty() {
        return Err("empty attribute name".into());
    }
    Ok(Part::Has(name.to_owned()))
}
