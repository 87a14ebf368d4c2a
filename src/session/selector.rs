//! Locator parsing and query script generation
//!
//! A locator is one candidate of a selector chain. It is either a CSS
//! selector (the default), `text="..."` for an exact trimmed-text match,
//! `text=...` for a substring match, or `xpath=...`.

use crate::error::{Error, Result};

/// Selector strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorType {
    Css,
    XPath,
    Text,
}

/// Parsed locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector_type: SelectorType,
    pub value: String,
    /// Only meaningful for text locators
    pub exact: bool,
}

impl Locator {
    /// Parse a raw candidate string
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::invalid_selector("empty locator"));
        }

        if let Some(rest) = raw.strip_prefix("xpath=") {
            let rest = rest.trim();
            if rest.is_empty() {
                return Err(Error::invalid_selector(raw));
            }
            return Ok(Self {
                selector_type: SelectorType::XPath,
                value: rest.to_string(),
                exact: false,
            });
        }

        if let Some(rest) = raw.strip_prefix("text=") {
            let rest = rest.trim();
            if let Some(quoted) = rest.strip_prefix('"') {
                let inner = quoted
                    .strip_suffix('"')
                    .ok_or_else(|| Error::invalid_selector(format!("unterminated quote in {}", raw)))?;
                if inner.is_empty() {
                    return Err(Error::invalid_selector(raw));
                }
                return Ok(Self {
                    selector_type: SelectorType::Text,
                    value: inner.to_string(),
                    exact: true,
                });
            }
            if rest.is_empty() {
                return Err(Error::invalid_selector(raw));
            }
            return Ok(Self {
                selector_type: SelectorType::Text,
                value: rest.to_string(),
                exact: false,
            });
        }

        Ok(Self {
            selector_type: SelectorType::Css,
            value: raw.to_string(),
            exact: false,
        })
    }

    /// Function declaration returning the matching elements under `this`, in document order.
    ///
    /// The locator value is passed as the single argument so it never needs escaping.
    pub fn query_function(&self) -> String {
        match self.selector_type {
            SelectorType::Css => r#"function(selector) {
                    return Array.from(this.querySelectorAll(selector));
                }"#
            .to_string(),
            SelectorType::XPath => r#"function(xpath) {
                    const result = document.evaluate(xpath, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                    const elements = [];
                    for (let i = 0; i < result.snapshotLength; i++) {
                        const node = result.snapshotItem(i);
                        if (node && node.nodeType === Node.ELEMENT_NODE) elements.push(node);
                    }
                    return elements;
                }"#
            .to_string(),
            SelectorType::Text => format!(
                r#"function(needle) {{
                    const root = this === document ? (document.body || document.documentElement) : this;
                    const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT, null);
                    const elements = [];
                    let node;
                    while (node = walker.nextNode()) {{
                        const text = node.textContent.trim();
                        const hit = {};
                        const el = node.parentElement;
                        if (hit && el && !elements.includes(el)) elements.push(el);
                    }}
                    return elements;
                }}"#,
                if self.exact {
                    "text === needle"
                } else {
                    "text.length > 0 && text.includes(needle)"
                }
            ),
        }
    }

    /// Expression evaluating to the array of matches in the whole document
    pub fn document_expression(&self) -> Result<String> {
        let argument = serde_json::to_string(&self.value)?;
        Ok(format!("({}).call(document, {})", self.query_function(), argument))
    }

    /// Expression evaluating to the number of matches in the whole document
    pub fn count_expression(&self) -> Result<String> {
        Ok(format!("{}.length", self.document_expression()?))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.selector_type, self.exact) {
            (SelectorType::Css, _) => write!(f, "{}", self.value),
            (SelectorType::XPath, _) => write!(f, "xpath={}", self.value),
            (SelectorType::Text, true) => write!(f, "text=\"{}\"", self.value),
            (SelectorType::Text, false) => write!(f, "text={}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_is_default() {
        let locator = Locator::parse(" .songlist__item ").unwrap();
        assert_eq!(locator.selector_type, SelectorType::Css);
        assert_eq!(locator.value, ".songlist__item");
    }

    #[test]
    fn test_text_exact_and_substring() {
        let exact = Locator::parse("text=\"登录\"").unwrap();
        assert_eq!(exact.selector_type, SelectorType::Text);
        assert!(exact.exact);
        assert_eq!(exact.value, "登录");

        let partial = Locator::parse("text=登录").unwrap();
        assert!(!partial.exact);
        assert_eq!(partial.to_string(), "text=登录");
    }

    #[test]
    fn test_xpath() {
        let locator = Locator::parse("xpath=//div[@class='lyric']").unwrap();
        assert_eq!(locator.selector_type, SelectorType::XPath);
        assert_eq!(locator.value, "//div[@class='lyric']");
    }

    #[test]
    fn test_invalid_forms() {
        for raw in ["", "   ", "text=", "text=\"open", "text=\"\"", "xpath="] {
            assert!(
                matches!(Locator::parse(raw), Err(Error::InvalidSelector(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_document_expression_passes_value_as_json() {
        let locator = Locator::parse("a[title='it\\'s']").unwrap();
        let script = locator.document_expression().unwrap();
        assert!(script.contains("querySelectorAll"));
        assert!(script.ends_with(r#".call(document, "a[title='it\\'s']")"#));
        assert!(locator.count_expression().unwrap().ends_with(".length"));
    }

    #[test]
    fn test_text_function_uses_match_mode() {
        let exact = Locator::parse("text=\"登录\"").unwrap().query_function();
        assert!(exact.contains("text === needle"));
        let partial = Locator::parse("text=登录").unwrap().query_function();
        assert!(partial.contains("text.includes(needle)"));
    }
}
