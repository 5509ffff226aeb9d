//! Tokenizer for the SGML-ish markup used by SAMI files.
//!
//! SAMI is loosely HTML: tags are case-insensitive, attribute values are
//! usually unquoted, and end tags are routinely omitted. The tokenizer never
//! tries to build a tree; it only yields a flat stream of [`Token`]s for the
//! decoder in [`crate::sami`] to interpret.

use std::borrow::Cow;

use log::trace;
use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::opt;
use nom::multi::many0;
use nom::sequence::{delimited, preceded};
use nom::IResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// A single markup token. `raw` is the exact source slice it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        raw: &'a str,
    },
    EndTag {
        name: String,
        raw: &'a str,
    },
    Text {
        text: String,
        raw: &'a str,
    },
    Comment {
        raw: &'a str,
    },
    End,
    Error(String),
}

impl<'a> Token<'a> {
    pub fn raw(&self) -> &'a str {
        match self {
            Token::StartTag { raw, .. }
            | Token::EndTag { raw, .. }
            | Token::Text { raw, .. }
            | Token::Comment { raw } => *raw,
            Token::End | Token::Error(_) => "",
        }
    }
}

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

pub struct Tokenizer<'a> {
    input: &'a str,
    raw_text_until: Option<&'static str>,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            raw_text_until: None,
            finished: false,
        }
    }

    /// Splits `len` bytes off the front of the remaining input.
    fn advance(&mut self, len: usize) -> &'a str {
        let (raw, rest) = self.input.split_at(len);
        self.input = rest;
        raw
    }

    fn raw_text(&mut self, element: &str) -> Option<Token<'a>> {
        let closing = format!("</{}", element);
        let len = find_ignore_ascii_case(self.input, &closing).unwrap_or(self.input.len());
        if len == 0 {
            return None;
        }
        let raw = self.advance(len);
        Some(Token::Text {
            text: raw.to_string(),
            raw,
        })
    }

    /// An unclosed comment runs to the end of input.
    fn comment(&mut self, open: &str, close: &str) -> Token<'a> {
        let len = self.input[open.len()..]
            .find(close)
            .map_or(self.input.len(), |pos| open.len() + pos + close.len());
        Token::Comment {
            raw: self.advance(len),
        }
    }

    fn start_tag(&mut self) -> Token<'a> {
        let (len, name, attrs) = match start_tag(self.input) {
            Ok((rest, (name, attrs))) => (self.input.len() - rest.len(), name, attrs),
            // Junk inside the tag: keep the name, drop the attributes.
            Err(_) => match (self.input.find('>'), tag_name(&self.input[1..])) {
                (Some(gt), Ok((_, name))) => (gt + 1, name.to_ascii_lowercase(), Vec::new()),
                _ => return self.truncated(),
            },
        };
        let raw = self.advance(len);
        self.raw_text_until = RAW_TEXT_ELEMENTS.iter().copied().find(|e| *e == name);
        Token::StartTag { name, attrs, raw }
    }

    fn end_tag(&mut self) -> Token<'a> {
        let name = match tag_name(&self.input[2..]) {
            Ok((_, name)) => name.to_ascii_lowercase(),
            Err(_) => return self.fail("invalid end tag".to_string()),
        };
        match self.input.find('>') {
            Some(gt) => Token::EndTag {
                name,
                raw: self.advance(gt + 1),
            },
            None => self.truncated(),
        }
    }

    fn text(&mut self) -> Token<'a> {
        // A leading '<' here is known not to open markup, so skip past it.
        let len = self
            .input
            .char_indices()
            .skip(1)
            .find(|(i, c)| *c == '<' && starts_markup(&self.input[*i..]))
            .map_or(self.input.len(), |(i, _)| i);
        let raw = self.advance(len);
        Token::Text {
            text: decode_entities(raw).into_owned(),
            raw,
        }
    }

    /// A tag cut off by the end of input ends the stream like a clean EOF.
    fn truncated(&mut self) -> Token<'a> {
        trace!("dropping truncated tag '{}'", self.input);
        self.input = "";
        self.finished = true;
        Token::End
    }

    fn fail(&mut self, msg: String) -> Token<'a> {
        let shown: String = self.input.chars().take(40).collect();
        self.finished = true;
        Token::Error(format!("{} at '{}'", msg, shown))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.finished {
            return None;
        }
        if let Some(element) = self.raw_text_until.take() {
            if let Some(token) = self.raw_text(element) {
                return Some(token);
            }
        }
        let token = if self.input.is_empty() {
            self.finished = true;
            Token::End
        } else if self.input.starts_with("<!--") {
            self.comment("<!--", "-->")
        } else if self.input.starts_with("<!") || self.input.starts_with("<?") {
            self.comment("<", ">")
        } else if starts_markup(self.input) && self.input.starts_with("</") {
            self.end_tag()
        } else if starts_markup(self.input) {
            self.start_tag()
        } else {
            self.text()
        };
        trace!("token: {:?}", token);
        Some(token)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == ':'
}

/// Whether `s` begins with a tag, end tag, comment or declaration.
fn starts_markup(s: &str) -> bool {
    let mut chars = s.chars();
    if chars.next() != Some('<') {
        return false;
    }
    match chars.next() {
        Some('!') | Some('?') => true,
        Some('/') => chars.next().map_or(false, |c| c.is_ascii_alphabetic()),
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack.as_bytes()[i..]
                .get(..needle.len())
                .map_or(false, |b| b.eq_ignore_ascii_case(needle.as_bytes()))
        })
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

fn start_tag(input: &str) -> IResult<&str, (String, Vec<Attribute>)> {
    let (input, _) = char('<')(input)?;
    let (input, name) = tag_name(input)?;
    let (input, attrs) = many0(preceded(multispace0, attribute))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(char('/'))(input)?;
    let (input, _) = char('>')(input)?;
    Ok((input, (name.to_ascii_lowercase(), attrs)))
}

fn attribute(input: &str) -> IResult<&str, Attribute> {
    let (input, key) = take_while1(|c: char| {
        !c.is_whitespace() && !matches!(c, '/' | '>' | '<' | '=' | '"' | '\'')
    })(input)?;
    let (input, value) = opt(preceded(
        delimited(multispace0, char('='), multispace0),
        attribute_value,
    ))(input)?;

    Ok((
        input,
        Attribute {
            key: key.to_ascii_lowercase(),
            value: value.map_or_else(String::new, |v| decode_entities(v).into_owned()),
        },
    ))
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        take_while1(|c: char| !c.is_whitespace() && c != '>'),
    ))(input)
}

/// Replaces character references with the characters they name.
/// Unknown or malformed references are left as they are.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return std::char::from_u32(code);
    }
    match name.to_ascii_lowercase().as_str() {
        "nbsp" => Some('\u{a0}'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Tokenizer::new(input).collect()
    }

    fn attr(key: &str, value: &str) -> Attribute {
        Attribute {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn sync_and_paragraph() {
        let toks = tokens("<SYNC Start=28500><P Class=KRCC>\n");
        assert_eq!(
            toks,
            vec![
                Token::StartTag {
                    name: "sync".to_string(),
                    attrs: vec![attr("start", "28500")],
                    raw: "<SYNC Start=28500>",
                },
                Token::StartTag {
                    name: "p".to_string(),
                    attrs: vec![attr("class", "KRCC")],
                    raw: "<P Class=KRCC>",
                },
                Token::Text {
                    text: "\n".to_string(),
                    raw: "\n",
                },
                Token::End,
            ]
        );
    }

    #[test]
    fn quoted_and_bare_attributes() {
        let toks = tokens(r##"<font color="#66CCFF" face='Arial Black' hidden>"##);
        match &toks[0] {
            Token::StartTag { name, attrs, .. } => {
                assert_eq!(name, "font");
                assert_eq!(
                    attrs,
                    &vec![
                        attr("color", "#66CCFF"),
                        attr("face", "Arial Black"),
                        attr("hidden", ""),
                    ]
                );
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn spaced_equals_sign() {
        let toks = tokens("<SYNC Start = 100>");
        match &toks[0] {
            Token::StartTag { attrs, .. } => assert_eq!(attrs, &vec![attr("start", "100")]),
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn end_tags_and_br() {
        let toks = tokens("a</font><br>b<BR/>");
        let kinds: Vec<_> = toks
            .iter()
            .map(|t| match t {
                Token::StartTag { name, .. } => format!("start:{}", name),
                Token::EndTag { name, .. } => format!("end:{}", name),
                Token::Text { text, .. } => format!("text:{}", text),
                Token::Comment { .. } => "comment".to_string(),
                Token::End => "end".to_string(),
                Token::Error(e) => format!("error:{}", e),
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["text:a", "end:font", "start:br", "text:b", "start:br", "end"]
        );
    }

    #[test]
    fn comment_token() {
        let toks = tokens("<!-- hidden <b> -->x");
        assert_eq!(toks[0], Token::Comment { raw: "<!-- hidden <b> -->" });
        assert_eq!(toks[1].raw(), "x");
    }

    #[test]
    fn doctype_is_a_comment() {
        let toks = tokens("<!DOCTYPE html>");
        assert_eq!(toks[0], Token::Comment { raw: "<!DOCTYPE html>" });
    }

    #[test]
    fn style_body_is_raw_text() {
        let input = "<STYLE TYPE=\"text/css\">\n<!--\nP { color:white; }\n-->\n</STYLE><BODY>";
        let toks = tokens(input);
        assert_eq!(
            toks[1],
            Token::Text {
                text: "\n<!--\nP { color:white; }\n-->\n".to_string(),
                raw: "\n<!--\nP { color:white; }\n-->\n",
            }
        );
        assert!(matches!(&toks[2], Token::EndTag { name, .. } if name == "style"));
        assert!(matches!(&toks[3], Token::StartTag { name, .. } if name == "body"));
    }

    #[test]
    fn unclosed_style_runs_to_end() {
        let toks = tokens("<style>\n<!-- x -->");
        assert_eq!(toks[1].raw(), "\n<!-- x -->");
        assert_eq!(toks[2], Token::End);
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let toks = tokens("1 < 2 <b>");
        assert_eq!(toks[0].raw(), "1 < 2 ");
        assert!(matches!(&toks[1], Token::StartTag { name, .. } if name == "b"));
    }

    #[test]
    fn entities_in_text() {
        let toks = tokens("&nbsp;&amp;&lt;&#65;&#x42;&bogus;&");
        assert_eq!(
            toks[0],
            Token::Text {
                text: "\u{a0}&<AB&bogus;&".to_string(),
                raw: "&nbsp;&amp;&lt;&#65;&#x42;&bogus;&",
            }
        );
    }

    #[test]
    fn truncated_start_tag_ends_stream() {
        let toks = tokens("a<SYNC Start=100");
        assert_eq!(toks[0].raw(), "a");
        assert_eq!(toks[1], Token::End);
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn truncated_end_tag_ends_stream() {
        assert_eq!(tokens("</font"), vec![Token::End]);
    }

    #[test]
    fn unclosed_comment_runs_to_end() {
        let toks = tokens("text<!-- never closed");
        assert_eq!(toks[0].raw(), "text");
        assert_eq!(toks[1], Token::Comment { raw: "<!-- never closed" });
        assert_eq!(toks[2], Token::End);
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokens(""), vec![Token::End]);
    }
}
