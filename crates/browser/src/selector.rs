//! Element selectors.
//!
//! WebDriver only has CSS, XPath, id and link text strategies, so `name`,
//! `class` and `tag` selectors are expressed as CSS.

use crate::error::BrowserError;
use std::fmt;

/// How to locate an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Id(String),
    XPath(String),
    Css(String),
    Name(String),
    Class(String),
    Tag(String),
}

/// Native WebDriver strategy a selector resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Id,
    XPath,
    Css,
}

impl Selector {
    /// Build a selector from a kind name (`id`, `xpath`, `css`, `name`, `class`, `tag`).
    pub fn parse(kind: &str, value: impl Into<String>) -> Result<Self, BrowserError> {
        let value = value.into();
        match kind.trim().to_lowercase().as_str() {
            "id" => Ok(Selector::Id(value)),
            "xpath" => Ok(Selector::XPath(value)),
            "css" => Ok(Selector::Css(value)),
            "name" => Ok(Selector::Name(value)),
            "class" => Ok(Selector::Class(value)),
            "tag" => Ok(Selector::Tag(value)),
            other => Err(BrowserError::UnsupportedSelector(other.to_string())),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    /// Strategy and query string sent to the driver.
    pub fn query(&self) -> (Strategy, String) {
        match self {
            Selector::Id(v) => (Strategy::Id, v.clone()),
            Selector::XPath(v) => (Strategy::XPath, v.clone()),
            Selector::Css(v) => (Strategy::Css, v.clone()),
            Selector::Name(v) => (Strategy::Css, format!("[name=\"{}\"]", escape_css_string(v))),
            Selector::Class(v) => (Strategy::Css, format!(".{}", v.trim())),
            Selector::Tag(v) => (Strategy::Css, v.trim().to_string()),
        }
    }
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "id={}", v),
            Selector::XPath(v) => write!(f, "xpath={}", v),
            Selector::Css(v) => write!(f, "css={}", v),
            Selector::Name(v) => write!(f, "name={}", v),
            Selector::Class(v) => write!(f, "class={}", v),
            Selector::Tag(v) => write!(f, "tag={}", v),
        }
    }
}
