//! Allow-list HTML cleaner for untrusted post bodies.
//!
//! The cleaner never fails. Whatever it cannot make sense of is dropped or
//! escaped, and its output is a fixed point: cleaning it again yields the same
//! string.

use std::collections::HashSet;

const DEFAULT_TAGS: &[&str] = &[
    "p", "a", "strong", "em", "ul", "ol", "li", "br", "img", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "code", "table", "thead", "caption", "tbody", "tr", "th", "td", "strike",
    "del", "hr", "sup", "sub", "div", "span",
];

const DEFAULT_ATTRIBUTES: &[&str] = &["href", "target", "rel", "src", "alt"];

/// Never emitted, whatever the policy says.
const DENIED_TAGS: &[&str] = &["script", "style"];

/// Elements removed together with everything up to their closing tag.
const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "title",
    "svg", "math", "xmp", "noembed", "noframes",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

pub fn is_hard_denied_tag(name: &str) -> bool {
    DENIED_TAGS.contains(&name)
}

/// Event handlers and inline styles.
pub fn is_hard_denied_attribute(name: &str) -> bool {
    name.starts_with("on") || name == "style"
}

#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    allowed_tags: HashSet<String>,
    allowed_attributes: HashSet<String>,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            allowed_tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            allowed_attributes: DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl SanitizePolicy {
    pub fn allow_tag(mut self, tag: &str) -> Self {
        self.allowed_tags.insert(tag.to_ascii_lowercase());
        self
    }

    pub fn allow_attribute(mut self, attribute: &str) -> Self {
        self.allowed_attributes.insert(attribute.to_ascii_lowercase());
        self
    }

    pub fn allows_tag(&self, name: &str) -> bool {
        !is_hard_denied_tag(name) && self.allowed_tags.contains(name)
    }

    pub fn allows_attribute(&self, name: &str) -> bool {
        !is_hard_denied_attribute(name) && self.allowed_attributes.contains(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: SanitizePolicy,
}

impl Sanitizer {
    pub fn new(policy: SanitizePolicy) -> Self {
        Self { policy }
    }

    pub fn sanitize(&self, raw: &str) -> String {
        Cleaner {
            policy: &self.policy,
            input: raw,
            pos: 0,
            out: String::with_capacity(raw.len()),
            open: Vec::new(),
        }
        .run()
    }
}

/// Cleans `raw` with the default policy.
pub fn sanitize(raw: &str) -> String {
    Sanitizer::default().sanitize(raw)
}

struct Tag {
    name: String,
    attributes: Vec<(String, Option<String>)>,
    /// Byte offset just past the closing `>`.
    end: usize,
}

struct Cleaner<'a> {
    policy: &'a SanitizePolicy,
    input: &'a str,
    pos: usize,
    out: String,
    open: Vec<String>,
}

impl<'a> Cleaner<'a> {
    fn run(mut self) -> String {
        while self.pos < self.input.len() {
            if self.input.as_bytes()[self.pos] == b'<' {
                self.markup();
            } else {
                self.text();
            }
        }
        while let Some(name) = self.open.pop() {
            self.close(&name);
        }
        self.out
    }

    fn text(&mut self) {
        let rest = &self.input[self.pos..];
        let len = rest.find('<').unwrap_or(rest.len());
        escape_into(&mut self.out, &rest[..len], false);
        self.pos += len;
    }

    fn markup(&mut self) {
        let rest = &self.input[self.pos..];
        let bytes = rest.as_bytes();
        let next = bytes.get(1).copied();

        if rest.starts_with("<!--") {
            self.pos = match rest[4..].find("-->") {
                Some(i) => self.pos + 4 + i + 3,
                None => self.input.len(),
            };
        } else if matches!(next, Some(b'!') | Some(b'?')) {
            self.skip_past('>');
        } else if next == Some(b'/') && bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
            self.end_tag();
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            self.start_tag();
        } else {
            self.out.push_str("&lt;");
            self.pos += 1;
        }
    }

    fn skip_past(&mut self, delimiter: char) {
        self.pos = match self.input[self.pos..].find(delimiter) {
            Some(i) => self.pos + i + 1,
            None => self.input.len(),
        };
    }

    fn start_tag(&mut self) {
        let Some(tag) = parse_start_tag(self.input, self.pos) else {
            // EOF inside a tag
            self.pos = self.input.len();
            return;
        };
        self.pos = tag.end;

        if DROPPED_WITH_CONTENT.contains(&tag.name.as_str()) {
            self.skip_raw_content(&tag.name);
            return;
        }
        if !self.policy.allows_tag(&tag.name) {
            return;
        }

        self.out.push('<');
        self.out.push_str(&tag.name);
        let mut seen: Vec<&str> = Vec::new();
        for (name, value) in &tag.attributes {
            if seen.contains(&name.as_str()) || !self.policy.allows_attribute(name) {
                continue;
            }
            seen.push(name);
            let value = value.as_deref().unwrap_or("");
            if URL_ATTRIBUTES.contains(&name.as_str()) && !is_safe_url(name, value) {
                continue;
            }
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            escape_into(&mut self.out, value, true);
            self.out.push('"');
        }
        self.out.push('>');

        if !VOID_TAGS.contains(&tag.name.as_str()) {
            self.open.push(tag.name);
        }
    }

    fn end_tag(&mut self) {
        let start = self.pos + 2;
        let bytes = self.input.as_bytes();
        let mut i = start;
        while i < bytes.len() && !is_name_terminator(bytes[i]) {
            i += 1;
        }
        let name = self.input[start..i].to_ascii_lowercase();
        self.pos = i;
        self.skip_past('>');

        if let Some(index) = self.open.iter().rposition(|open| *open == name) {
            while self.open.len() > index {
                if let Some(open) = self.open.pop() {
                    self.close(&open);
                }
            }
        }
    }

    fn skip_raw_content(&mut self, name: &str) {
        let needle = format!("</{name}");
        let haystack = self.input[self.pos..].to_ascii_lowercase();
        match haystack.find(&needle) {
            Some(i) => {
                self.pos += i + needle.len();
                self.skip_past('>');
            }
            None => self.pos = self.input.len(),
        }
    }

    fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

fn is_name_terminator(b: u8) -> bool {
    is_space(b) || b == b'/' || b == b'>'
}

/// Parses the tag opening at `start`. Returns `None` when the input ends
/// before the tag is closed.
fn parse_start_tag(input: &str, start: usize) -> Option<Tag> {
    let bytes = input.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && !is_name_terminator(bytes[i]) {
        i += 1;
    }
    let name = input[start + 1..i].to_ascii_lowercase();
    let mut attributes = Vec::new();

    loop {
        while i < bytes.len() && (is_space(bytes[i]) || bytes[i] == b'/') {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                return Some(Tag {
                    name,
                    attributes,
                    end: i + 1,
                })
            }
            Some(_) => {}
        }

        let name_start = i;
        if bytes[i] == b'=' {
            i += 1;
        }
        while i < bytes.len() && !is_name_terminator(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let attr_name = input[name_start..i].to_ascii_lowercase();

        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        let mut value = None;
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && is_space(bytes[i]) {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let close = input[i + 1..].find(quote as char)? + i + 1;
                    value = Some(input[i + 1..close].to_string());
                    i = close + 1;
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = Some(input[value_start..i].to_string());
                }
                None => return None,
            }
        }
        attributes.push((attr_name, value));
    }
}

/// Length of the character reference at the start of `s`, if it is one.
fn entity_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }
    let (body_start, valid): (usize, fn(&u8) -> bool) = match (bytes.get(1), bytes.get(2)) {
        (Some(b'#'), Some(b'x' | b'X')) => (3, u8::is_ascii_hexdigit),
        (Some(b'#'), _) => (2, u8::is_ascii_digit),
        (Some(b), _) if b.is_ascii_alphabetic() => (1, u8::is_ascii_alphanumeric),
        _ => return None,
    };
    let body = bytes[body_start..]
        .iter()
        .take(32)
        .take_while(|b| valid(*b))
        .count();
    if body == 0 || bytes.get(body_start + body) != Some(&b';') {
        return None;
    }
    Some(body_start + body + 1)
}

/// Escapes markup-significant characters while leaving well-formed character
/// references untouched, so repeated passes do not double-escape.
fn escape_into(out: &mut String, s: &str, in_attribute: bool) {
    for (i, c) in s.char_indices() {
        match c {
            '&' if entity_len(&s[i..]).is_some() => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\0' => {}
            c => out.push(c),
        }
    }
}

/// Resolves numeric references and the named ones that matter inside URLs.
/// Unknown or malformed references are kept as written.
pub(super) fn decode_references(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        let rest = &value[i..];
        if let Some(len) = entity_len(rest) {
            let body = &rest[1..len - 1];
            let resolved = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match body.to_ascii_lowercase().as_str() {
                    "colon" => Some(':'),
                    "tab" => Some('\t'),
                    "newline" => Some('\n'),
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            if let Some(c) = resolved {
                decoded.push(c);
                i += len;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else { break };
        decoded.push(c);
        i += c.len_utf8();
    }
    decoded
}

fn is_safe_url(attribute: &str, value: &str) -> bool {
    let normalized: String = decode_references(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let Some(colon) = normalized.find(':') else {
        return true;
    };
    let scheme = &normalized[..colon];
    if scheme.contains(|c| matches!(c, '/' | '?' | '#')) {
        // relative reference with a colon later in the path
        return true;
    }
    match scheme {
        "javascript" | "vbscript" => false,
        "data" => {
            attribute == "src"
                && normalized.starts_with("data:image/")
                && !normalized.starts_with("data:image/svg")
        }
        _ => true,
    }
}
