use std::str;

use tracing::debug;

use crate::error::FilterError;
use crate::rules::{RuleSet, SELF_CLOSING};
use crate::session::Session;
use crate::tokenizer::{StartTag, TokenSink, tokenize};

/// Knobs for a [`FilterEngine`]. The defaults keep every text node and
/// decide every tag on its own.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterOptions {
    /// Log each keep/drop decision at debug level.
    pub debug: bool,
    /// Trim leading and trailing whitespace from the result.
    pub trim: bool,
    /// Disallowed tags whose whole content is dropped along with the markup,
    /// e.g. `script` or `style`.
    pub strip_enclosed_content: Vec<String>,
}

/// Strips markup down to the tags and attributes allowed by a [`RuleSet`].
///
/// ```
/// use tagsieve_core::{FilterEngine, RuleSet};
///
/// let rules = RuleSet::new().with("a", ["href"]);
/// let engine = FilterEngine::with_rules(rules);
/// let out = engine.process(r#"<p><a title="t" href="/x">go</a></p>"#).unwrap();
/// assert_eq!(out, r#"<a href="/x">go</a>"#);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FilterEngine {
    rules: RuleSet,
    options: FilterOptions,
}

impl FilterEngine {
    pub fn new(rules: RuleSet, options: FilterOptions) -> Self {
        Self { rules, options }
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self::new(rules, FilterOptions::default())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Replaces the rules used by every later call to `process`.
    pub fn set_rules(&mut self, rules: RuleSet) {
        if self.options.debug {
            debug!(tags = rules.len(), "rules replaced");
        }
        self.rules = rules;
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Filters `input`, which must be UTF-8 text.
    ///
    /// Fails with [`FilterError::InvalidInput`] when it is not; nothing is
    /// produced in that case.
    pub fn process(&self, input: impl AsRef<[u8]>) -> Result<String, FilterError> {
        let text = str::from_utf8(input.as_ref())?;
        Ok(self.process_str(text))
    }

    pub fn process_str(&self, input: &str) -> String {
        let mut pass = FilterPass {
            rules: &self.rules,
            options: &self.options,
            session: Session::with_capacity(input.len()),
            enclosed: None,
        };
        tokenize(input, &mut pass);
        pass.session.finish(self.options.trim)
    }
}

/// Disallowed element whose content is being skipped.
struct Enclosed {
    name: String,
    depth: usize,
}

/// Event handler for one `process` call.
struct FilterPass<'e> {
    rules: &'e RuleSet,
    options: &'e FilterOptions,
    session: Session,
    enclosed: Option<Enclosed>,
}

impl FilterPass<'_> {
    fn strips_content(&self, name: &str) -> bool {
        self.options
            .strip_enclosed_content
            .iter()
            .any(|tag| tag == name)
    }
}

impl TokenSink for FilterPass<'_> {
    fn start_tag(&mut self, tag: &StartTag) {
        if let Some(enclosed) = self.enclosed.as_mut() {
            if enclosed.name == tag.name && !tag.self_closing {
                enclosed.depth += 1;
            }
            return;
        }

        let Some(allowed) = self.rules.attributes(&tag.name) else {
            if self.options.debug {
                debug!(tag = %tag.name, "dropping start tag");
            }
            if !tag.self_closing && self.strips_content(&tag.name) {
                self.enclosed = Some(Enclosed {
                    name: tag.name.clone(),
                    depth: 1,
                });
            }
            return;
        };

        let keep_slash = self.rules.keeps_self_closing(&tag.name);
        let rebuilt = rebuild_start_tag(allowed, keep_slash, tag);
        if self.options.debug {
            debug!(tag = %tag.name, output = %rebuilt, "keeping start tag");
        }
        self.session.push_tag(&rebuilt);
    }

    fn end_tag(&mut self, name: &str, raw: &str) {
        if let Some(enclosed) = self.enclosed.as_mut() {
            if enclosed.name == name {
                enclosed.depth -= 1;
                if enclosed.depth == 0 {
                    self.enclosed = None;
                }
            }
            return;
        }

        if self.rules.contains(name) {
            if self.options.debug {
                debug!(tag = name, "keeping end tag");
            }
            self.session.push_tag(raw);
        } else if self.options.debug {
            debug!(tag = name, "dropping end tag");
        }
    }

    fn text(&mut self, raw: &str) {
        if self.enclosed.is_none() {
            self.session.push_text(raw);
        }
    }
}

/// Writes an allowed start tag back out: attributes in rule order, the
/// self-closing slash last when the rule lists it and the source had one,
/// whitespace collapsed.
fn rebuild_start_tag(allowed: &[String], keep_slash: bool, tag: &StartTag) -> String {
    let mut rebuilt = String::new();
    rebuilt.push('<');
    rebuilt.push_str(&tag.name);

    for attr in allowed {
        if attr == SELF_CLOSING {
            continue;
        }
        if let Some(value) = tag.attr(attr) {
            rebuilt.push(' ');
            rebuilt.push_str(attr);
            rebuilt.push_str("=\"");
            rebuilt.push_str(value);
            rebuilt.push('"');
        }
    }
    if keep_slash && tag.self_closing && tag.attr(SELF_CLOSING).is_some() {
        rebuilt.push_str(" /");
    }

    let mut out = collapse_whitespace(&rebuilt);
    out.truncate(out.trim_end().len());
    out.push('>');
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
