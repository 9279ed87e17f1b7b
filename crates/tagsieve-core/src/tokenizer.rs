//! Markup tokenizer.
//!
//! Drives the html5ever tokenizer over the input and forwards start tags, end
//! tags and text to a [`TokenSink`] in document order. Comments, doctypes and
//! markup left unterminated at the end of input produce no event.
//!
//! html5ever decodes character references, so text and attribute values are
//! escaped again before they are handed on: `&`, `<` and `>` in text, and
//! additionally `"` in values. Everything a sink receives can be written back
//! out verbatim.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    self as html, BufferQueue, Tag, TagKind, Token, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::rules::SELF_CLOSING;

/// A start tag as seen by the filter.
///
/// Names are ASCII-lowercased. Values are escaped for use inside double
/// quotes. A trailing slash shows up both as `self_closing` and as the
/// pseudo-attribute `/`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

impl StartTag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Receiver of tokenizer events.
pub trait TokenSink {
    fn start_tag(&mut self, tag: &StartTag);
    fn end_tag(&mut self, name: &str, raw: &str);
    fn text(&mut self, raw: &str);
}

/// Owned form of a tokenizer event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    TagOpen {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    TagClose {
        name: String,
        raw: String,
    },
    Text {
        raw: String,
    },
}

impl TokenSink for Vec<Event> {
    fn start_tag(&mut self, tag: &StartTag) {
        self.push(Event::TagOpen {
            name: tag.name.clone(),
            attrs: tag.attrs.clone(),
            self_closing: tag.self_closing,
        });
    }

    fn end_tag(&mut self, name: &str, raw: &str) {
        self.push(Event::TagClose {
            name: name.to_string(),
            raw: raw.to_string(),
        });
    }

    fn text(&mut self, raw: &str) {
        self.push(Event::Text {
            raw: raw.to_string(),
        });
    }
}

/// Collects the events of `input` into a list.
pub fn events(input: &str) -> Vec<Event> {
    let mut out = Vec::new();
    tokenize(input, &mut out);
    out
}

/// Feeds every event of `input` to `sink`, strictly in document order.
pub fn tokenize<S: TokenSink + ?Sized>(input: &str, sink: &mut S) {
    let adapter = Adapter {
        sink,
        text: String::new(),
    };
    let mut tokenizer = Tokenizer::new(adapter, TokenizerOpts::default());
    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(input));
    // The adapter never asks for a script pause, so feeding runs to the end.
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();
    tokenizer.sink.flush_text();
}

/// Translates html5ever tokens into [`TokenSink`] calls.
///
/// Adjacent character tokens are merged so a run of text reaches the sink
/// as one event.
struct Adapter<'s, S: ?Sized> {
    sink: &'s mut S,
    text: String,
}

impl<S: TokenSink + ?Sized> Adapter<'_, S> {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.sink.text(&self.text);
            self.text.clear();
        }
    }

    fn start_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let mut attrs: Vec<(String, String)> = tag
            .attrs
            .iter()
            .map(|attr| (attr.name.local.to_string(), escape_attr(&attr.value)))
            .collect();
        if tag.self_closing {
            attrs.push((SELF_CLOSING.to_string(), SELF_CLOSING.to_string()));
        }
        let start = StartTag {
            name: tag.name.to_string(),
            attrs,
            self_closing: tag.self_closing,
        };
        self.sink.start_tag(&start);

        if start.self_closing {
            return TokenSinkResult::Continue;
        }
        match start.name.as_str() {
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" => TokenSinkResult::RawData(RawKind::Rawtext),
            _ => TokenSinkResult::Continue,
        }
    }
}

impl<S: TokenSink + ?Sized> html::TokenSink for Adapter<'_, S> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => {
                escape_text_into(&mut self.text, &text);
                TokenSinkResult::Continue
            }
            Token::TagToken(tag) => {
                self.flush_text();
                match tag.kind {
                    TagKind::StartTag => self.start_tag(tag),
                    TagKind::EndTag => {
                        let name = tag.name.to_string();
                        let raw = format!("</{}>", name);
                        self.sink.end_tag(&name, &raw);
                        TokenSinkResult::Continue
                    }
                }
            }
            Token::EOFToken => {
                self.flush_text();
                TokenSinkResult::Continue
            }
            // Comments, doctypes, NUL characters and parse errors.
            _ => TokenSinkResult::Continue,
        }
    }
}

fn escape_text_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("&quot;"),
            _ => escape_text_into(&mut out, ch.encode_utf8(&mut [0; 4])),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Event, escape_attr, events};

    fn open(name: &str, attrs: &[(&str, &str)], self_closing: bool) -> Event {
        Event::TagOpen {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            self_closing,
        }
    }

    fn close(name: &str) -> Event {
        Event::TagClose {
            name: name.to_string(),
            raw: format!("</{}>", name),
        }
    }

    fn text(raw: &str) -> Event {
        Event::Text {
            raw: raw.to_string(),
        }
    }

    #[test]
    fn splits_tags_and_text_in_order() {
        assert_eq!(
            events("a<b class=x>bold</b>c"),
            vec![
                text("a"),
                open("b", &[("class", "x")], false),
                text("bold"),
                close("b"),
                text("c"),
            ]
        );
    }

    #[test]
    fn names_are_lowercased() {
        assert_eq!(
            events("<A HREF='u'>x</A >"),
            vec![open("a", &[("href", "u")], false), text("x"), close("a")]
        );
    }

    #[test]
    fn trailing_slash_becomes_pseudo_attribute() {
        assert_eq!(
            events("<hr /><br/><img src=a.png />"),
            vec![
                open("hr", &[("/", "/")], true),
                open("br", &[("/", "/")], true),
                open("img", &[("src", "a.png"), ("/", "/")], true),
            ]
        );
    }

    #[test]
    fn unquoted_value_keeps_slashes() {
        assert_eq!(events("<a href=/x/>"), vec![open("a", &[("href", "/x/")], false)]);
    }

    #[test]
    fn attribute_values_are_escaped_for_double_quotes() {
        assert_eq!(
            events(r#"<p title='say "hi"' data-x="a &amp; b" hidden>"#),
            vec![open(
                "p",
                &[
                    ("title", "say &quot;hi&quot;"),
                    ("data-x", "a &amp; b"),
                    ("hidden", ""),
                ],
                false,
            )]
        );
    }

    #[test]
    fn first_duplicate_attribute_wins() {
        assert_eq!(
            events(r#"<a id="1" ID="2">"#),
            vec![open("a", &[("id", "1")], false)]
        );
    }

    #[test]
    fn comments_and_declarations_are_dropped() {
        assert_eq!(
            events("<!DOCTYPE html><!-- note -->x<?xml version=\"1.0\"?>y"),
            vec![text("xy")]
        );
    }

    #[test]
    fn slash_must_touch_the_closing_bracket() {
        assert_eq!(
            events("<br / >"),
            vec![open("br", &[], false)]
        );
    }

    #[test]
    fn stray_angle_brackets_are_escaped_text() {
        assert_eq!(events("1 < 2 > 0"), vec![text("1 &lt; 2 &gt; 0")]);
        assert_eq!(events("<</b>b>x"), vec![text("&lt;"), close("b"), text("b&gt;x")]);
    }

    #[test]
    fn character_references_come_back_escaped() {
        assert_eq!(
            events("&lt;script&gt; &amp;amp; &#60;b&#62; &copy;"),
            vec![text("&lt;script&gt; &amp;amp; &lt;b&gt; ©")]
        );
    }

    #[test]
    fn unterminated_markup_at_end_is_dropped() {
        assert_eq!(events("a<b title=\"x><i>y</i>"), vec![text("a")]);
        assert_eq!(events("a<!-- <img src=x>"), vec![text("a")]);
        assert_eq!(events("a<em"), vec![text("a")]);
    }

    #[test]
    fn script_content_is_one_text_event() {
        assert_eq!(
            events("<script>if (a<b) { x('</p>'); }</SCRIPT>z"),
            vec![
                open("script", &[], false),
                text("if (a&lt;b) { x('&lt;/p&gt;'); }"),
                close("script"),
                text("z"),
            ]
        );
    }

    #[test]
    fn unclosed_style_runs_to_end() {
        assert_eq!(
            events("<style>p > b { }"),
            vec![open("style", &[], false), text("p &gt; b { }")]
        );
    }

    #[test]
    fn only_script_and_style_are_raw_text() {
        assert_eq!(
            events("<xmp><b>x</b></xmp>"),
            vec![
                open("xmp", &[], false),
                open("b", &[], false),
                text("x"),
                close("b"),
                close("xmp"),
            ]
        );
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            events("héllo <i>wörld</i> ✓"),
            vec![
                text("héllo "),
                open("i", &[], false),
                text("wörld"),
                close("i"),
                text(" ✓"),
            ]
        );
    }

    #[test]
    fn escape_attr_covers_quotes_and_markup() {
        assert_eq!(escape_attr(r#"a"<&>"#), "a&quot;&lt;&amp;&gt;");
    }
}
