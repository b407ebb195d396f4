//! Derived product fields
//!
//! Some product fields are two renderings of the same information:
//! `description` and `descriptionHtml`, or a raw price string and the
//! `price`/`currency`/`currencyRaw` triple. The helpers here derive the
//! missing side from the present one. Both sides are computed together on
//! first access of either and then reused, so the result never depends on
//! which side is read first.

use crate::product::Product;
use regex::Regex;
use std::sync::{LazyLock, OnceLock};
use tracing::trace;

/// Block-level tags that start a new paragraph
const BLOCK_TAGS: &[&str] = &[
    "article", "blockquote", "div", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li",
    "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Tags whose content is never text
const SKIPPED_TAGS: &[&str] = &["script", "style"];

/// Currency symbols and their ISO 4217 codes, longest symbol first
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("C$", "CAD"),
    ("A$", "AUD"),
    ("R$", "BRL"),
    ("zł", "PLN"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DescriptionSides {
    text: Option<String>,
    html: Option<String>,
}

/// `description` and `descriptionHtml` of a product
///
/// When only one is given, the other is derived from it: HTML is reduced to
/// plain text paragraphs, and text paragraphs are wrapped into an
/// `<article>`. When both are given they are kept as they are.
#[derive(Debug, Clone, Default)]
pub struct DescriptionPair {
    description: Option<String>,
    description_html: Option<String>,
    resolved: OnceLock<DescriptionSides>,
}

impl DescriptionPair {
    /// Pair from the given sides
    pub fn new(description: Option<String>, description_html: Option<String>) -> Self {
        Self {
            description,
            description_html,
            resolved: OnceLock::new(),
        }
    }

    /// Pair from the description fields of `product`
    pub fn from_product(product: &Product) -> Self {
        Self::new(product.description.clone(), product.description_html.clone())
    }

    /// Plain text description
    pub fn description(&self) -> Option<&str> {
        self.resolve().text.as_deref()
    }

    /// HTML description
    pub fn description_html(&self) -> Option<&str> {
        self.resolve().html.as_deref()
    }

    /// Fill the description fields `product` does not have yet
    pub fn apply(&self, product: &mut Product) {
        let sides = self.resolve();
        if product.description.is_none() {
            product.description = sides.text.clone();
        }
        if product.description_html.is_none() {
            product.description_html = sides.html.clone();
        }
    }

    fn resolve(&self) -> &DescriptionSides {
        self.resolved.get_or_init(|| {
            let sides = match (&self.description, &self.description_html) {
                (Some(text), Some(html)) => DescriptionSides {
                    text: Some(text.clone()),
                    html: Some(html.clone()),
                },
                (Some(text), None) => DescriptionSides {
                    text: Some(text.clone()),
                    html: text_to_html(text),
                },
                (None, Some(html)) => DescriptionSides {
                    text: html_to_text(html),
                    html: Some(html.clone()),
                },
                (None, None) => DescriptionSides::default(),
            };
            trace!(
                text = sides.text.is_some(),
                html = sides.html.is_some(),
                "derived description fields"
            );
            sides
        })
    }
}

/// Plain text of an HTML fragment
///
/// Block elements become paragraphs separated by blank lines, `<br>`
/// becomes a line break and runs of whitespace collapse. Returns `None`
/// when no text is left.
pub fn html_to_text(html: &str) -> Option<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        push_text(&mut current, &rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find('>') else {
            push_text(&mut current, tail);
            rest = "";
            break;
        };

        let tag = &tail[1..end];
        rest = &tail[end + 1..];
        let closing = tag.starts_with('/');
        let name = tag_name(tag);

        if !closing && SKIPPED_TAGS.contains(&name.as_str()) {
            let close = format!("</{name}");
            rest = match rest.to_ascii_lowercase().find(&close) {
                Some(pos) => &rest[pos..],
                None => "",
            };
        } else if name == "br" {
            current.push('\n');
        } else if BLOCK_TAGS.contains(&name.as_str()) {
            flush_paragraph(&mut paragraphs, &mut current);
        }
    }
    push_text(&mut current, rest);
    flush_paragraph(&mut paragraphs, &mut current);

    if paragraphs.is_empty() {
        return None;
    }
    Some(paragraphs.join("\n\n"))
}

/// HTML rendering of plain text
///
/// Blank-line separated paragraphs become `<p>` elements inside an
/// `<article>`; single line breaks become `<br>`. Returns `None` for blank
/// text.
pub fn text_to_html(text: &str) -> Option<String> {
    let normalized = text.replace("\r\n", "\n");
    let paragraphs: Vec<String> = normalized
        .split("\n\n")
        .map(|paragraph| {
            paragraph
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(escape)
                .collect::<Vec<_>>()
                .join("<br>")
        })
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return None;
    }
    let mut html = String::from("<article>");
    for paragraph in &paragraphs {
        html.push_str("<p>");
        html.push_str(paragraph);
        html.push_str("</p>");
    }
    html.push_str("</article>");
    Some(html)
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Source line breaks are plain whitespace; only `<br>` breaks lines.
fn push_text(current: &mut String, raw: &str) {
    let text = unescape(raw);
    current.extend(text.chars().map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c }));
}

fn flush_paragraph(paragraphs: &mut Vec<String>, current: &mut String) {
    let paragraph = current
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if !paragraph.is_empty() {
        paragraphs.push(paragraph);
    }
    current.clear();
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let entity = rest
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
        match entity {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Price fields parsed from a raw price string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPrice {
    /// Amount as a decimal string without thousands separators
    pub price: Option<String>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    /// Currency as written in the raw string
    pub currency_raw: Option<String>,
}

/// `price`, `currency` and `currencyRaw` derived from a raw price string
#[derive(Debug, Clone, Default)]
pub struct PriceFields {
    raw: Option<String>,
    parsed: OnceLock<ParsedPrice>,
}

impl PriceFields {
    /// Fields derived from `raw`, e.g. `"$1,299.99"` or `"12,50 €"`
    pub fn new(raw: Option<String>) -> Self {
        Self {
            raw,
            parsed: OnceLock::new(),
        }
    }

    /// The raw price string
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Amount as a decimal string
    pub fn price(&self) -> Option<&str> {
        self.parsed().price.as_deref()
    }

    /// ISO 4217 currency code
    pub fn currency(&self) -> Option<&str> {
        self.parsed().currency.as_deref()
    }

    /// Currency as written in the raw string
    pub fn currency_raw(&self) -> Option<&str> {
        self.parsed().currency_raw.as_deref()
    }

    /// All parsed fields
    pub fn parsed(&self) -> &ParsedPrice {
        self.parsed.get_or_init(|| {
            let parsed = self.raw.as_deref().map(parse_price).unwrap_or_default();
            trace!(raw = ?self.raw, price = ?parsed.price, currency = ?parsed.currency, "parsed price");
            parsed
        })
    }

    /// Fill the price fields `product` does not have yet
    pub fn apply(&self, product: &mut Product) {
        let parsed = self.parsed();
        if product.price.is_none() {
            product.price = parsed.price.clone();
        }
        if product.currency.is_none() {
            product.currency = parsed.currency.clone();
        }
        if product.currency_raw.is_none() {
            product.currency_raw = parsed.currency_raw.clone();
        }
    }
}

/// Parse a raw price string
///
/// Thousands separators may be `.`, `,`, spaces or apostrophes. When both
/// `.` and `,` occur, the last one is the decimal separator. A lone `,`
/// followed by exactly three digits groups thousands; a `.` is decimal unless
/// it occurs more than once. The currency is the first symbol or
/// standalone three-letter code in the string.
pub fn parse_price(raw: &str) -> ParsedPrice {
    let (currency, currency_raw) = match find_currency(raw) {
        Some((code, written)) => (Some(code.to_string()), Some(written.to_string())),
        None => (None, None),
    };
    ParsedPrice {
        price: parse_amount(raw),
        currency,
        currency_raw,
    }
}

/// A run of digits with single separators between digit groups
static AMOUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:[.,'\s][0-9]+)*").ok());

/// A known currency symbol, or a standalone three-letter code
static CURRENCY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let symbols: Vec<String> = CURRENCY_SYMBOLS
        .iter()
        .map(|(symbol, _)| regex::escape(symbol))
        .collect();
    let pattern = format!(
        r"(?P<symbol>{})|(?:^|[^A-Za-z])(?P<code>[A-Z]{{3}})(?:[^A-Za-z]|$)",
        symbols.join("|")
    );
    Regex::new(&pattern).ok()
});

fn find_currency(raw: &str) -> Option<(&str, &str)> {
    let captures = CURRENCY.as_ref()?.captures(raw)?;
    if let Some(symbol) = captures.name("symbol") {
        let symbol = symbol.as_str();
        return CURRENCY_SYMBOLS
            .iter()
            .find(|(known, _)| *known == symbol)
            .map(|&(_, code)| (code, symbol));
    }
    let code = captures.name("code")?.as_str();
    Some((code, code))
}

fn parse_amount(raw: &str) -> Option<String> {
    let run = AMOUNT.as_ref()?.find(raw)?.as_str();
    let decimal_at = decimal_separator(run);
    let amount = run
        .char_indices()
        .filter_map(|(idx, c)| match c {
            '0'..='9' => Some(c),
            _ if Some(idx) == decimal_at => Some('.'),
            _ => None,
        })
        .collect();
    Some(amount)
}

/// Byte offset of the decimal separator in a digit run, if it has one
fn decimal_separator(run: &str) -> Option<usize> {
    match (run.rfind('.'), run.rfind(',')) {
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(dot), None) => lone_separator(run, '.', dot),
        (None, Some(comma)) => lone_separator(run, ',', comma),
        (None, None) => None,
    }
}

fn lone_separator(run: &str, separator: char, at: usize) -> Option<usize> {
    let count = run.matches(separator).count();
    let digits_after = run[at + 1..]
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if count > 1 || (separator == ',' && digits_after == 3) {
        return None;
    }
    Some(at)
}
