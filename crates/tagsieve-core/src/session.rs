use tracing::trace;

/// Output of a single filtering pass.
///
/// Lives exactly as long as one `process` call: created empty, appended to by
/// the event callbacks, then consumed by [`Session::finish`].
#[derive(Debug, Default)]
pub(crate) struct Session {
    out: String,
    tags: usize,
}

impl Session {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        trace!(capacity, "session opened");
        Self {
            out: String::with_capacity(capacity),
            tags: 0,
        }
    }

    pub(crate) fn push_tag(&mut self, tag: &str) {
        self.tags += 1;
        self.out.push_str(tag);
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn finish(self, trim: bool) -> String {
        trace!(bytes = self.out.len(), tags = self.tags, "session closed");
        if trim {
            let trimmed = self.out.trim();
            if trimmed.len() != self.out.len() {
                return trimmed.to_string();
            }
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::Session;

    #[test]
    fn collects_in_push_order() {
        let mut session = Session::with_capacity(8);
        session.push_text("a ");
        session.push_tag("<b>");
        session.push_text("c");
        session.push_tag("</b>");
        assert_eq!(session.finish(false), "a <b>c</b>");
    }

    #[test]
    fn trim_only_touches_the_ends() {
        let mut session = Session::default();
        session.push_text("\n  one  two \t");
        assert_eq!(session.finish(true), "one  two");
    }
}
