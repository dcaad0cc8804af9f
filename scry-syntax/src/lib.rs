//! # Scryfall-style query syntax parser
//!
//! `scry-syntax` turns a compact Scryfall-style query string into a
//! normalized [`ParsedQuery`]: a flat AND-set of [`Filter`]s plus a list of
//! OR-groups, ready to be compiled into storage conditions by a downstream
//! crate. The grammar covers field filters with comparison operators, color
//! and color-identity set algebra (including guild/shard/wedge names),
//! quoted and strict name matching, implicit AND, explicit `OR`, `-`
//! negation, and parenthesized grouping.
//!
//! ## Example
//! ```
//! use scry_syntax::{parse_query, FilterKind, NumericOp};
//!
//! let parsed = parse_query("c:blue t:instant cmc<=2").unwrap();
//! assert_eq!(parsed.filters.len(), 3);
//! assert!(parsed.or_groups.is_empty());
//! assert!(matches!(
//!     parsed.filters[2].kind,
//!     FilterKind::ManaValue { op: NumericOp::Le, value } if value == 2.0
//! ));
//!
//! // Explicit OR splits the query into groups.
//! let parsed = parse_query("t:elf OR t:goblin c:green").unwrap();
//! assert!(parsed.filters.is_empty());
//! assert_eq!(parsed.or_groups.len(), 2);
//! ```
//!
//! Parsing is pure and deterministic: the same input always produces the
//! same `ParsedQuery` or the same [`QueryError`].

use std::fmt;

/// Parses a query string into a [`ParsedQuery`].
///
/// Empty (or whitespace-only) input yields an empty query:
/// ```
/// assert!(scry_syntax::parse_query("   ").unwrap().is_empty());
/// ```
pub fn parse_query(input: &str) -> Result<ParsedQuery, QueryError> {
    let tokens = tokenize(input.trim())?;
    if tokens.is_empty() {
        return Ok(ParsedQuery::default());
    }
    let expr = Parser::new(tokens).parse()?;
    Ok(lower(expr))
}

/// One-line syntax description for embedding in tool/help text.
pub const SYNTAX_SUMMARY: &str = "Supports: name, colors (c:blue), mana value (cmc:3), \
mana cost (m:{R}{R}), type (t:creature), oracle text (o:flying), set (set:neo), \
rarity (r:mythic), format (f:modern), power/toughness (pow:3, tou:4), keywords \
(kw:flying), artist (a:name), year (year:2023), produces token (pt:zombie). \
Boolean operators: implicit AND, OR, - (negation), (parentheses).";

/// Detailed per-key syntax list, surfaced verbatim alongside query errors.
pub const SUPPORTED_SYNTAX: &[&str] = &[
    "name search: \"Lightning Bolt\" (exact), bolt (partial), !\"Exact Name\" (strict)",
    "colors: c:blue, c:urg, c>=rg, c<=w, c:c (colorless)",
    "color identity: id:wubrg, identity:esper, ci:rg (for Commander)",
    "mana value: cmc:3, cmc>=5, cmc<2, mv:3",
    "mana cost: m:{R}, m:{2}{U}{U}, mana:{W}{W} (exact symbols with m=)",
    "type: t:creature, t:\"legendary creature\"",
    "oracle text: o:flying, o:\"enters the battlefield\"",
    "keyword ability: kw:flying, keyword:deathtouch, keywords:vigilance",
    "set: set:neo, e:m19, s:cmd",
    "block: b:innistrad, block:zendikar",
    "rarity: r:mythic, r:rare, r:uncommon, r:common",
    "format: f:standard, f:modern, f:legacy, f:vintage, f:commander",
    "banned in format: banned:modern",
    "power: pow:3, pow>=4, power<2",
    "toughness: tou:3, tou>=4, toughness<2",
    "loyalty: loy:3, loy>=4, loyalty<5 (planeswalkers)",
    "artist: a:\"Rebecca Guay\", artist:Seb",
    "year: year:2023, year>=2020, year<2015",
    "flavor text: ft:\"flavor text\" (search flavor text)",
    "collector number: cn:123, cn:1a (find specific printings)",
    "price: usd<1, usd>=10, eur<5",
    "watermark: wm:phyrexian, watermark:selesnya",
    "layout: layout:transform, layout:adventure",
    "produces mana: produces:g, produces:wubrg, produces:c",
    "produces token: pt:zombie, produces_token:\"Goblin Token\" (find token creators)",
    "boolean: implicit AND, OR, - (negation), parentheses",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong while parsing a query.
///
/// All variants are deterministic functions of the input string; the same
/// input fails the same way on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed token: unterminated quote, or a character no token can
    /// start with. Carries the byte position of the offense.
    Lex { message: String, position: usize },
    /// Structural grammar violation: unbalanced parentheses, dangling
    /// `OR`/`AND`/`-`.
    Parse { message: String, position: usize },
    /// Recognized field key with a disallowed operator, or a value outside
    /// a closed vocabulary. Carries the offending fragment and a hint
    /// showing accepted syntax for that key.
    Unsupported { fragment: String, hint: String },
}

impl QueryError {
    fn unsupported(fragment: impl Into<String>, hint: impl Into<String>) -> Self {
        QueryError::Unsupported {
            fragment: fragment.into(),
            hint: hint.into(),
        }
    }

    /// Human-readable hint for fixing the query.
    pub fn hint(&self) -> &str {
        match self {
            QueryError::Lex { .. } => "Check for unsupported characters or syntax",
            QueryError::Parse { .. } => "Check the query structure",
            QueryError::Unsupported { hint, .. } => hint,
        }
    }

    /// The full supported-syntax list, for building user-facing errors.
    pub fn supported_syntax(&self) -> &'static [&'static str] {
        SUPPORTED_SYNTAX
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Lex { message, position } => {
                write!(f, "{message} (at byte {position})")
            }
            QueryError::Parse { message, position } => {
                write!(f, "{message} (at byte {position})")
            }
            QueryError::Unsupported { fragment, hint } => {
                write!(f, "unsupported syntax `{fragment}`. Hint: {hint}")
            }
        }
    }
}

impl std::error::Error for QueryError {}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// One of the five Magic colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    /// All five colors in canonical WUBRG order.
    pub const ALL: [Color; 5] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
    ];

    /// Canonical single-letter symbol (`W`, `U`, `B`, `R`, `G`).
    pub fn letter(self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
        }
    }

    fn from_letter(ch: char) -> Option<Color> {
        match ch.to_ascii_lowercase() {
            'w' => Some(Color::White),
            'u' => Some(Color::Blue),
            'b' => Some(Color::Black),
            'r' => Some(Color::Red),
            'g' => Some(Color::Green),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Blue => 2,
            Color::Black => 4,
            Color::Red => 8,
            Color::Green => 16,
        }
    }
}

/// A set of colors. The empty set is the colorless sentinel.
///
/// ```
/// use scry_syntax::{Color, ColorSet};
/// let rg: ColorSet = [Color::Red, Color::Green].into_iter().collect();
/// assert!(rg.contains(Color::Red));
/// assert_eq!(rg.len(), 2);
/// // Iteration is always WUBRG-ordered regardless of input order.
/// assert_eq!(rg.iter().map(Color::letter).collect::<String>(), "RG");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ColorSet(u8);

impl ColorSet {
    /// The colorless sentinel.
    pub const COLORLESS: ColorSet = ColorSet(0);
    /// All five colors.
    pub const ALL: ColorSet = ColorSet(0b11111);

    pub fn insert(&mut self, color: Color) {
        self.0 |= color.bit();
    }

    pub fn contains(self, color: Color) -> bool {
        self.0 & color.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// The colors NOT in this set.
    pub fn complement(self) -> ColorSet {
        ColorSet(!self.0 & Self::ALL.0)
    }

    /// Iterates members in WUBRG order.
    pub fn iter(self) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        let mut set = ColorSet::default();
        for color in iter {
            set.insert(color);
        }
        set
    }
}

/// Named color combinations: mono colors, guilds, shards, wedges, the
/// four-color names and the five-color aliases. Resolved during
/// normalization for both `c:` and `id:` values.
const NAMED_COMBINATIONS: &[(&str, &str)] = &[
    ("white", "w"),
    ("blue", "u"),
    ("black", "b"),
    ("red", "r"),
    ("green", "g"),
    ("colorless", ""),
    ("azorius", "wu"),
    ("dimir", "ub"),
    ("rakdos", "br"),
    ("gruul", "rg"),
    ("selesnya", "gw"),
    ("orzhov", "wb"),
    ("izzet", "ur"),
    ("golgari", "bg"),
    ("boros", "rw"),
    ("simic", "gu"),
    ("bant", "gwu"),
    ("esper", "wub"),
    ("grixis", "ubr"),
    ("jund", "brg"),
    ("naya", "rgw"),
    ("abzan", "wbg"),
    ("jeskai", "urw"),
    ("sultai", "bgu"),
    ("mardu", "rwb"),
    ("temur", "gur"),
    ("chaos", "ubrg"),
    ("aggression", "brgw"),
    ("altruism", "rgwu"),
    ("growth", "gwub"),
    ("artifice", "wubr"),
    ("wubrg", "wubrg"),
    ("fivecolor", "wubrg"),
];

/// Resolves a color value: `c`/`colorless`, a combination name, or a run of
/// color letters in any case and order. `None` when any letter falls outside
/// the five-color alphabet.
fn resolve_color_set(value: &str) -> Option<ColorSet> {
    let lower = value.to_ascii_lowercase();
    if lower == "c" || lower == "colorless" {
        return Some(ColorSet::COLORLESS);
    }
    if let Some((_, letters)) = NAMED_COMBINATIONS.iter().find(|(name, _)| *name == lower) {
        return Some(letters.chars().filter_map(Color::from_letter).collect());
    }
    let mut set = ColorSet::default();
    for ch in lower.chars() {
        set.insert(Color::from_letter(ch)?);
    }
    Some(set)
}

// ---------------------------------------------------------------------------
// Operators and value shapes
// ---------------------------------------------------------------------------

/// Set-comparison semantics for color and color-identity filters.
///
/// `:`, `=` and `>=` all mean "has at least these colors"; `<=` means
/// "fits within these colors"; `>` and `<` are the strict (proper)
/// superset/subset forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    AtLeast,
    AtMost,
    StrictSuperset,
    StrictSubset,
}

/// Comparison operator for numeric filters. `:` canonicalizes to `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

/// A power/toughness value: a number, or the literal `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatValue {
    Number(i64),
    Star,
}

/// Price currency, taken from the filter key itself (`usd<1`, `eur<5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Eur,
    Tix,
}

impl Currency {
    /// Key used in the prices object (`usd`, `eur`, `tix`).
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Tix => "tix",
        }
    }
}

/// The closed set of known format codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Standard,
    Future,
    Historic,
    Timeless,
    Gladiator,
    Pioneer,
    Modern,
    Legacy,
    Pauper,
    Vintage,
    Penny,
    Commander,
    Oathbreaker,
    StandardBrawl,
    Brawl,
    Alchemy,
    PauperCommander,
    Duel,
    OldSchool,
    Premodern,
    Predh,
}

impl Format {
    /// Code as it appears in query input and in the legalities object.
    pub fn code(self) -> &'static str {
        match self {
            Format::Standard => "standard",
            Format::Future => "future",
            Format::Historic => "historic",
            Format::Timeless => "timeless",
            Format::Gladiator => "gladiator",
            Format::Pioneer => "pioneer",
            Format::Modern => "modern",
            Format::Legacy => "legacy",
            Format::Pauper => "pauper",
            Format::Vintage => "vintage",
            Format::Penny => "penny",
            Format::Commander => "commander",
            Format::Oathbreaker => "oathbreaker",
            Format::StandardBrawl => "standardbrawl",
            Format::Brawl => "brawl",
            Format::Alchemy => "alchemy",
            Format::PauperCommander => "paupercommander",
            Format::Duel => "duel",
            Format::OldSchool => "oldschool",
            Format::Premodern => "premodern",
            Format::Predh => "predh",
        }
    }

    pub fn from_code(code: &str) -> Option<Format> {
        const ALL: [Format; 21] = [
            Format::Standard,
            Format::Future,
            Format::Historic,
            Format::Timeless,
            Format::Gladiator,
            Format::Pioneer,
            Format::Modern,
            Format::Legacy,
            Format::Pauper,
            Format::Vintage,
            Format::Penny,
            Format::Commander,
            Format::Oathbreaker,
            Format::StandardBrawl,
            Format::Brawl,
            Format::Alchemy,
            Format::PauperCommander,
            Format::Duel,
            Format::OldSchool,
            Format::Premodern,
            Format::Predh,
        ];
        let lower = code.to_ascii_lowercase();
        ALL.into_iter().find(|f| f.code() == lower)
    }
}

/// A format value as written in the query. Unknown codes still parse:
/// they compile to an always-false condition instead of failing the query,
/// so a stale binary degrades to "no results" when Scryfall adds formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatValue {
    Known(Format),
    Unknown(String),
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// One normalized filter. Negation is a flag, not a separate kind: the
/// condition compiler threads `negated` through a single rule per key.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub negated: bool,
}

impl Filter {
    fn new(kind: FilterKind) -> Self {
        Filter {
            kind,
            negated: false,
        }
    }

    fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}

/// The closed enumeration of filter kinds, each carrying its normalized
/// value shape. The condition compiler matches exhaustively on this enum,
/// so adding a kind without a compiler rule fails the build.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Case-insensitive whole-name match (`"Lightning Bolt"`).
    NameExact(String),
    /// Case-sensitive whole-name match (`!"Lightning Bolt"`).
    NameStrict(String),
    /// Case-insensitive substring of the name (bare word).
    NamePartial(String),
    Color { op: SetOp, colors: ColorSet },
    Identity { op: SetOp, colors: ColorSet },
    ManaValue { op: NumericOp, value: f64 },
    /// `m:{R}` contains the symbols; `m={R}` is the exact cost.
    ManaCost { exact: bool, symbols: String },
    TypeLine(String),
    OracleText(String),
    FlavorText(String),
    /// Matches a discrete keyword-ability list entry, not rules text.
    Keyword(String),
    Set(String),
    Block(String),
    Rarity(String),
    FormatLegal(FormatValue),
    FormatBanned(FormatValue),
    Power { op: NumericOp, value: StatValue },
    Toughness { op: NumericOp, value: StatValue },
    Loyalty { op: NumericOp, value: i64 },
    Artist(String),
    Year { op: NumericOp, value: i64 },
    CollectorNumber { op: NumericOp, value: String },
    Price {
        currency: Currency,
        op: NumericOp,
        value: f64,
    },
    Watermark(String),
    Layout(String),
    ProducesMana(ColorSet),
    ProducesToken(String),
}

impl FilterKind {
    /// Multi-valued kinds accumulate when repeated in one AND-set; all
    /// others follow the last-wins policy.
    fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            FilterKind::NamePartial(_)
                | FilterKind::TypeLine(_)
                | FilterKind::OracleText(_)
                | FilterKind::FlavorText(_)
                | FilterKind::Keyword(_)
                | FilterKind::ProducesToken(_)
        )
    }

    /// Whether two filters occupy the same last-wins slot. Price slots are
    /// per currency: `usd<1 eur<5` are independent filters.
    fn same_slot(&self, other: &FilterKind) -> bool {
        match (self, other) {
            (FilterKind::Price { currency: a, .. }, FilterKind::Price { currency: b, .. }) => {
                a == b
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed query
// ---------------------------------------------------------------------------

/// The normalized intermediate representation of one query.
///
/// `filters` is an AND-set; `or_groups` is a disjunction of AND-sets. The
/// compiled condition is `filters AND (group₁ OR group₂ OR …)`. Groups are
/// only present when the source contained an explicit `OR` (or a negated
/// multi-filter group, whose De Morgan expansion is a disjunction).
///
/// A `ParsedQuery` lives for one parse→compile→execute cycle: freshly
/// constructed, never mutated, never cached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedQuery {
    pub filters: Vec<Filter>,
    pub or_groups: Vec<Vec<Filter>>,
}

impl ParsedQuery {
    /// An empty query matches everything.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.or_groups.is_empty()
    }

    /// Total number of filters across the flat set and all groups.
    pub fn filter_count(&self) -> usize {
        self.filters.len() + self.or_groups.iter().map(Vec::len).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Phrase { text: String, strict: bool },
    Field { key: FieldKey, op: Op, value: String, raw: String },
    And,
    Or,
    Not,
    OpenParen,
    CloseParen,
}

/// Raw comparison operator as written. Keys decide which of these they
/// accept and how `:` canonicalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Colon,
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Colon => ":",
            Op::Eq => "=",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
        }
    }
}

/// Field key families recognized by the tokenizer, before value
/// normalization. Aliases collapse here (`cmc`/`mv`/`manavalue` → one key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKey {
    Color,
    Identity,
    ManaValue,
    ManaCost,
    Type,
    Oracle,
    Flavor,
    Keyword,
    Set,
    Block,
    Rarity,
    Format,
    Banned,
    Power,
    Toughness,
    Loyalty,
    CollectorNumber,
    Price(Currency),
    Artist,
    Year,
    Watermark,
    Layout,
    Produces,
    ProducesToken,
}

impl FieldKey {
    fn from_name(name: &str) -> Option<FieldKey> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "c" | "color" | "colors" => Some(FieldKey::Color),
            "id" | "identity" | "ci" => Some(FieldKey::Identity),
            "cmc" | "mv" | "manavalue" => Some(FieldKey::ManaValue),
            "m" | "mana" => Some(FieldKey::ManaCost),
            "t" | "type" => Some(FieldKey::Type),
            // oracle_text already embeds reminder text, so fo: is an alias
            "o" | "oracle" | "text" | "fo" | "fulloracle" => Some(FieldKey::Oracle),
            "ft" | "flavor" => Some(FieldKey::Flavor),
            "kw" | "keyword" | "keywords" => Some(FieldKey::Keyword),
            "set" | "s" | "e" | "edition" => Some(FieldKey::Set),
            "b" | "block" => Some(FieldKey::Block),
            "r" | "rarity" => Some(FieldKey::Rarity),
            "f" | "format" | "legal" | "legality" => Some(FieldKey::Format),
            "banned" => Some(FieldKey::Banned),
            "pow" | "power" => Some(FieldKey::Power),
            "tou" | "toughness" => Some(FieldKey::Toughness),
            "loy" | "loyalty" => Some(FieldKey::Loyalty),
            "cn" | "number" => Some(FieldKey::CollectorNumber),
            "usd" => Some(FieldKey::Price(Currency::Usd)),
            "eur" => Some(FieldKey::Price(Currency::Eur)),
            "tix" => Some(FieldKey::Price(Currency::Tix)),
            "a" | "artist" => Some(FieldKey::Artist),
            "year" => Some(FieldKey::Year),
            "wm" | "watermark" => Some(FieldKey::Watermark),
            "layout" => Some(FieldKey::Layout),
            "produces" => Some(FieldKey::Produces),
            "pt" | "produces_token" => Some(FieldKey::ProducesToken),
            _ => None,
        }
    }

    /// Example syntax shown in "unsupported" error hints.
    fn syntax_hint(self) -> &'static str {
        match self {
            FieldKey::Color => "colors accept letters or names: c:blue, c:urg, c>=rg, c<=w, c:c",
            FieldKey::Identity => "identity accepts letters or names: id:wubrg, identity:esper, ci:rg",
            FieldKey::ManaValue => "mana value compares numbers: cmc:3, cmc>=5, mv<2",
            FieldKey::ManaCost => "mana cost uses {X} symbols: m:{R}, m:{2}{U}{U}, m={W}{W} for exact",
            FieldKey::Type => "type matches text: t:creature, t:\"legendary creature\"",
            FieldKey::Oracle => "oracle text matches text: o:flying, o:\"enters the battlefield\"",
            FieldKey::Flavor => "flavor text matches text: ft:\"some flavor\"",
            FieldKey::Keyword => "keywords name an ability: kw:flying, keyword:deathtouch",
            FieldKey::Set => "sets use a set code: set:neo, e:m19",
            FieldKey::Block => "blocks use a block name: b:innistrad, block:zendikar",
            FieldKey::Rarity => "rarity is one of: r:common, r:uncommon, r:rare, r:mythic",
            FieldKey::Format => "formats use a format code: f:standard, f:modern, f:commander",
            FieldKey::Banned => "banned takes a format code: banned:modern",
            FieldKey::Power => "power compares numbers or *: pow:3, pow>=4, pow:*",
            FieldKey::Toughness => "toughness compares numbers or *: tou:3, tou>=4, tou:*",
            FieldKey::Loyalty => "loyalty compares numbers: loy:3, loy>=4",
            FieldKey::CollectorNumber => "collector numbers: cn:123, cn:1a, cn>=100",
            FieldKey::Price(_) => "prices compare numbers: usd<1, usd>=10, eur<5",
            FieldKey::Artist => "artist matches a name: a:\"Rebecca Guay\", artist:Seb",
            FieldKey::Year => "year compares four-digit years: year:2023, year>=2020",
            FieldKey::Watermark => "watermarks use a name: wm:phyrexian, watermark:selesnya",
            FieldKey::Layout => "layouts use a layout name: layout:transform, layout:adventure",
            FieldKey::Produces => "produced mana uses color letters: produces:g, produces:wubrg, produces:c",
            FieldKey::ProducesToken => "token search: pt:zombie, produces_token:\"Goblin Token\"",
        }
    }
}

/// Bare words accept letters (ASCII and Latin-extended accents), digits,
/// and the punctuation real card names contain: `_ ' , . & -`.
/// Supports names like "Urza's", "Séance", "Lim-Dûl", "R&D".
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ('\u{00C0}'..='\u{024F}').contains(&ch)
        || matches!(ch, '_' | '\'' | ',' | '.' | '&' | '-')
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ('\u{00C0}'..='\u{024F}').contains(&ch)
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, QueryError> {
    Lexer { input, pos: 0 }.run()
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<(Token, usize)>, QueryError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws();
            let start = self.pos;
            let Some(ch) = self.peek() else {
                return Ok(tokens);
            };
            let token = match ch {
                '(' => {
                    self.advance();
                    Token::OpenParen
                }
                ')' => {
                    self.advance();
                    Token::CloseParen
                }
                '-' => {
                    self.advance();
                    Token::Not
                }
                '!' => {
                    self.advance();
                    match self.peek() {
                        Some('"') | Some('\'') => Token::Phrase {
                            text: self.quoted_string()?,
                            strict: true,
                        },
                        _ => {
                            return Err(QueryError::Lex {
                                message: "'!' must be followed by a quoted name".into(),
                                position: start,
                            })
                        }
                    }
                }
                '"' | '\'' => Token::Phrase {
                    text: self.quoted_string()?,
                    strict: false,
                },
                ch if is_word_start(ch) => self.word_or_field(start)?,
                other => {
                    return Err(QueryError::Lex {
                        message: format!("unexpected character '{other}'"),
                        position: start,
                    })
                }
            };
            tokens.push((token, start));
        }
    }

    /// Scans a word; when it names a known field key and an operator
    /// follows, continues into a field-filter token. Unknown prefixes fall
    /// back to plain words (the operator then fails the next scan round).
    fn word_or_field(&mut self, start: usize) -> Result<Token, QueryError> {
        while self.peek().is_some_and(is_word_char) {
            self.advance();
        }
        let word = &self.input[start..self.pos];

        if let Some(op) = self.peek_operator() {
            if let Some(key) = FieldKey::from_name(word) {
                self.consume_operator(op);
                let value = self.field_value()?;
                let raw = self.input[start..self.pos].to_string();
                if value.is_empty() {
                    return Err(QueryError::unsupported(raw, key.syntax_hint()));
                }
                return Ok(Token::Field {
                    key,
                    op,
                    value,
                    raw,
                });
            }
        }

        if word.eq_ignore_ascii_case("or") {
            Ok(Token::Or)
        } else if word.eq_ignore_ascii_case("and") {
            Ok(Token::And)
        } else {
            Ok(Token::Word(word.to_string()))
        }
    }

    fn peek_operator(&self) -> Option<Op> {
        let rest = &self.input[self.pos..];
        if rest.starts_with(">=") {
            Some(Op::Ge)
        } else if rest.starts_with("<=") {
            Some(Op::Le)
        } else if rest.starts_with(':') {
            Some(Op::Colon)
        } else if rest.starts_with('=') {
            Some(Op::Eq)
        } else if rest.starts_with('>') {
            Some(Op::Gt)
        } else if rest.starts_with('<') {
            Some(Op::Lt)
        } else {
            None
        }
    }

    fn consume_operator(&mut self, op: Op) {
        self.pos += op.as_str().len();
    }

    /// Field values may be bare (ends at whitespace, parens or quotes) or
    /// quoted with either quote style.
    fn field_value(&mut self) -> Result<String, QueryError> {
        match self.peek() {
            Some('"') | Some('\'') => self.quoted_string(),
            _ => {
                let start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '\'') {
                        break;
                    }
                    self.advance();
                }
                Ok(self.input[start..self.pos].to_string())
            }
        }
    }

    /// Quotes carry no escape syntax; a missing closing quote is an error
    /// at the opening quote's position.
    fn quoted_string(&mut self) -> Result<String, QueryError> {
        let quote_pos = self.pos;
        let quote = self.peek().expect("caller checked the quote");
        self.advance();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == quote {
                let text = self.input[start..self.pos].to_string();
                self.advance();
                return Ok(text);
            }
            self.advance();
        }
        Err(QueryError::Lex {
            message: "missing closing quote".into(),
            position: quote_pos,
        })
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }
}

// ---------------------------------------------------------------------------
// Grammar parser
// ---------------------------------------------------------------------------

/// Expression tree the grammar produces before lowering. Flat vectors for
/// And/Or so the lowering pass can iterate without rebalancing; `Empty` is
/// the sentinel for whitespace-only groups.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Empty,
    Leaf(Filter),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

/// Hand-rolled recursive descent over the token stream. Precedence, high
/// to low: `-` (one operand), implicit AND (adjacency), explicit `OR`.
/// Parentheses group a full sub-expression into one operand.
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, QueryError> {
        let expr = self.parse_or()?;
        // Anything left over can only be an unmatched ')'.
        if let Some((_, pos)) = self.tokens.get(self.pos) {
            return Err(QueryError::Parse {
                message: "unbalanced parentheses: extra closing ')'".into(),
                position: *pos,
            });
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut parts = Vec::new();
        loop {
            let before = self.pos;
            let operand = self.parse_and()?;
            let consumed = self.pos > before;
            match operand {
                // An operand that consumed tokens but produced nothing was
                // an empty group; it contributes no filter. An operand that
                // consumed nothing next to an OR is a dangling operator.
                Expr::Empty if !consumed => {
                    if let Some((Token::Or, pos)) = self.tokens.get(self.pos) {
                        return Err(QueryError::Parse {
                            message: "dangling OR: expected an expression".into(),
                            position: *pos,
                        });
                    }
                }
                Expr::Empty => {}
                expr => parts.push(expr),
            }
            if matches!(self.tokens.get(self.pos), Some((Token::Or, _))) {
                let pos = self.tokens[self.pos].1;
                self.pos += 1;
                if !self.operand_ahead() {
                    return Err(QueryError::Parse {
                        message: "dangling OR: expected an expression".into(),
                        position: pos,
                    });
                }
            } else {
                break;
            }
        }
        Ok(match parts.len() {
            0 => Expr::Empty,
            1 => parts.pop().expect("len checked"),
            _ => Expr::Or(parts),
        })
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut parts = Vec::new();
        loop {
            match self.tokens.get(self.pos) {
                None | Some((Token::Or, _)) | Some((Token::CloseParen, _)) => break,
                Some((Token::And, pos)) => {
                    // Explicit AND is a no-op separator, but it still needs
                    // operands on both sides.
                    let pos = *pos;
                    if parts.is_empty() {
                        return Err(QueryError::Parse {
                            message: "dangling AND: expected an expression before it".into(),
                            position: pos,
                        });
                    }
                    self.pos += 1;
                    if !self.operand_ahead() {
                        return Err(QueryError::Parse {
                            message: "dangling AND: expected an expression after it".into(),
                            position: pos,
                        });
                    }
                }
                _ => {
                    let expr = self.parse_not()?;
                    if !matches!(expr, Expr::Empty) {
                        parts.push(expr);
                    }
                }
            }
        }
        Ok(match parts.len() {
            0 => Expr::Empty,
            1 => parts.pop().expect("len checked"),
            _ => Expr::And(parts),
        })
    }

    fn parse_not(&mut self) -> Result<Expr, QueryError> {
        let mut negations = 0usize;
        let mut last_pos = 0;
        while let Some((Token::Not, pos)) = self.tokens.get(self.pos) {
            last_pos = *pos;
            negations += 1;
            self.pos += 1;
        }
        if negations > 0 && !self.operand_ahead() {
            return Err(QueryError::Parse {
                message: "dangling '-': expected a filter or group after it".into(),
                position: last_pos,
            });
        }
        let expr = self.parse_primary()?;
        // Chains like --x collapse by parity.
        if negations % 2 == 1 && !matches!(expr, Expr::Empty) {
            Ok(Expr::Not(Box::new(expr)))
        } else {
            Ok(expr)
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        let (token, pos) = self.tokens[self.pos].clone();
        match token {
            Token::OpenParen => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.tokens.get(self.pos) {
                    Some((Token::CloseParen, _)) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(QueryError::Parse {
                        message: "unbalanced parentheses: missing closing ')'".into(),
                        position: pos,
                    }),
                }
            }
            Token::Word(text) => {
                self.pos += 1;
                Ok(Expr::Leaf(Filter::new(FilterKind::NamePartial(text))))
            }
            Token::Phrase { text, strict } => {
                self.pos += 1;
                let kind = if strict {
                    FilterKind::NameStrict(text)
                } else {
                    FilterKind::NameExact(text)
                };
                Ok(Expr::Leaf(Filter::new(kind)))
            }
            Token::Field {
                key,
                op,
                value,
                raw,
            } => {
                self.pos += 1;
                let kind = normalize_field(key, op, &value, &raw)?;
                Ok(Expr::Leaf(Filter::new(kind)))
            }
            // parse_and/parse_not consume these before primary is reached.
            Token::And | Token::Or | Token::Not | Token::CloseParen => Err(QueryError::Parse {
                message: "expected a filter, word or group".into(),
                position: pos,
            }),
        }
    }

    /// True when the next token can begin an operand.
    fn operand_ahead(&self) -> bool {
        matches!(
            self.tokens.get(self.pos),
            Some((
                Token::Word(_)
                    | Token::Phrase { .. }
                    | Token::Field { .. }
                    | Token::Not
                    | Token::OpenParen,
                _
            ))
        )
    }
}

// ---------------------------------------------------------------------------
// Value normalizers
// ---------------------------------------------------------------------------

fn normalize_field(key: FieldKey, op: Op, value: &str, raw: &str) -> Result<FilterKind, QueryError> {
    match key {
        FieldKey::Color => Ok(FilterKind::Color {
            op: set_op(op),
            colors: color_value(key, value, raw)?,
        }),
        FieldKey::Identity => Ok(FilterKind::Identity {
            op: set_op(op),
            colors: color_value(key, value, raw)?,
        }),
        FieldKey::ManaValue => Ok(FilterKind::ManaValue {
            op: numeric_op(op),
            value: float_value(key, value, raw)?,
        }),
        FieldKey::ManaCost => {
            let exact = match op {
                Op::Colon => false,
                Op::Eq => true,
                _ => return Err(operator_error(key, op, raw)),
            };
            if !is_mana_symbols(value) {
                return Err(QueryError::unsupported(raw, key.syntax_hint()));
            }
            Ok(FilterKind::ManaCost {
                exact,
                symbols: value.to_string(),
            })
        }
        FieldKey::Type => Ok(FilterKind::TypeLine(text_value(key, op, value, raw)?)),
        FieldKey::Oracle => Ok(FilterKind::OracleText(text_value(key, op, value, raw)?)),
        FieldKey::Flavor => Ok(FilterKind::FlavorText(text_value(key, op, value, raw)?)),
        FieldKey::Keyword => {
            // Title case so lookups line up with Scryfall's keyword list
            // ("Flying", "First Strike").
            Ok(FilterKind::Keyword(title_case(&text_value(
                key, op, value, raw,
            )?)))
        }
        FieldKey::Set => Ok(FilterKind::Set(
            text_value(key, op, value, raw)?.to_ascii_lowercase(),
        )),
        FieldKey::Block => Ok(FilterKind::Block(
            text_value(key, op, value, raw)?.to_ascii_lowercase(),
        )),
        FieldKey::Rarity => {
            let lower = text_value(key, op, value, raw)?.to_ascii_lowercase();
            // Shorthands expand; unknown rarities (special, bonus) pass
            // through so they can still match the stored column.
            let rarity = match lower.as_str() {
                "c" => "common".to_string(),
                "u" => "uncommon".to_string(),
                "r" => "rare".to_string(),
                "m" => "mythic".to_string(),
                _ => lower,
            };
            Ok(FilterKind::Rarity(rarity))
        }
        FieldKey::Format => Ok(FilterKind::FormatLegal(format_value(
            key, op, value, raw,
        )?)),
        FieldKey::Banned => Ok(FilterKind::FormatBanned(format_value(
            key, op, value, raw,
        )?)),
        FieldKey::Power => Ok(FilterKind::Power {
            op: numeric_op(op),
            value: stat_value(key, op, value, raw)?,
        }),
        FieldKey::Toughness => Ok(FilterKind::Toughness {
            op: numeric_op(op),
            value: stat_value(key, op, value, raw)?,
        }),
        FieldKey::Loyalty => Ok(FilterKind::Loyalty {
            op: numeric_op(op),
            value: int_value(key, value, raw)?,
        }),
        FieldKey::CollectorNumber => {
            if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(QueryError::unsupported(raw, key.syntax_hint()));
            }
            Ok(FilterKind::CollectorNumber {
                op: numeric_op(op),
                value: value.to_string(),
            })
        }
        FieldKey::Price(currency) => Ok(FilterKind::Price {
            currency,
            op: numeric_op(op),
            value: float_value(key, value, raw)?,
        }),
        FieldKey::Artist => Ok(FilterKind::Artist(text_value(key, op, value, raw)?)),
        FieldKey::Year => {
            let year = int_value(key, value, raw)?;
            if !(1000..=9999).contains(&year) {
                return Err(QueryError::unsupported(raw, key.syntax_hint()));
            }
            Ok(FilterKind::Year {
                op: numeric_op(op),
                value: year,
            })
        }
        FieldKey::Watermark => Ok(FilterKind::Watermark(
            text_value(key, op, value, raw)?.to_ascii_lowercase(),
        )),
        FieldKey::Layout => Ok(FilterKind::Layout(
            text_value(key, op, value, raw)?.to_ascii_lowercase(),
        )),
        FieldKey::Produces => Ok(FilterKind::ProducesMana(color_value(
            key,
            &text_value(key, op, value, raw)?,
            raw,
        )?)),
        FieldKey::ProducesToken => Ok(FilterKind::ProducesToken(text_value(key, op, value, raw)?)),
    }
}

fn operator_error(key: FieldKey, op: Op, raw: &str) -> QueryError {
    QueryError::unsupported(
        raw,
        format!("operator '{}' is not valid here; {}", op.as_str(), key.syntax_hint()),
    )
}

/// Keys that only ever take `:`.
fn text_value(key: FieldKey, op: Op, value: &str, raw: &str) -> Result<String, QueryError> {
    if op != Op::Colon {
        return Err(operator_error(key, op, raw));
    }
    Ok(value.to_string())
}

fn set_op(op: Op) -> SetOp {
    match op {
        // ':' and '=' and '>=' all read "has at least these colors"; the
        // exact-match collapse for the full or empty set falls out in the
        // compiler.
        Op::Colon | Op::Eq | Op::Ge => SetOp::AtLeast,
        Op::Le => SetOp::AtMost,
        Op::Gt => SetOp::StrictSuperset,
        Op::Lt => SetOp::StrictSubset,
    }
}

/// Numeric keys accept every operator; `:` reads as equality.
fn numeric_op(op: Op) -> NumericOp {
    match op {
        Op::Colon | Op::Eq => NumericOp::Eq,
        Op::Ge => NumericOp::Ge,
        Op::Le => NumericOp::Le,
        Op::Gt => NumericOp::Gt,
        Op::Lt => NumericOp::Lt,
    }
}

fn color_value(key: FieldKey, value: &str, raw: &str) -> Result<ColorSet, QueryError> {
    resolve_color_set(value).ok_or_else(|| QueryError::unsupported(raw, key.syntax_hint()))
}

fn float_value(key: FieldKey, value: &str, raw: &str) -> Result<f64, QueryError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| QueryError::unsupported(raw, key.syntax_hint()))
}

fn int_value(key: FieldKey, value: &str, raw: &str) -> Result<i64, QueryError> {
    value
        .parse::<i64>()
        .map_err(|_| QueryError::unsupported(raw, key.syntax_hint()))
}

fn stat_value(key: FieldKey, op: Op, value: &str, raw: &str) -> Result<StatValue, QueryError> {
    if value == "*" {
        // Ordering against a literal star is meaningless.
        if !matches!(op, Op::Colon | Op::Eq) {
            return Err(operator_error(key, op, raw));
        }
        return Ok(StatValue::Star);
    }
    Ok(StatValue::Number(int_value(key, value, raw)?))
}

/// `{2}{U}{U}`-shaped: one or more non-empty brace groups and nothing else.
fn is_mana_symbols(value: &str) -> bool {
    let mut rest = value;
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let Some(stripped) = rest.strip_prefix('{') else {
            return false;
        };
        let Some(end) = stripped.find('}') else {
            return false;
        };
        if end == 0 {
            return false;
        }
        rest = &stripped[end + 1..];
    }
    true
}

fn format_value(key: FieldKey, op: Op, value: &str, raw: &str) -> Result<FormatValue, QueryError> {
    let code = text_value(key, op, value, raw)?.to_ascii_lowercase();
    Ok(match Format::from_code(&code) {
        Some(format) => FormatValue::Known(format),
        None => FormatValue::Unknown(code),
    })
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, word) in value.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(char::to_lowercase));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Lowering: Expr -> ParsedQuery
// ---------------------------------------------------------------------------

/// An AND-set of filters during lowering; a DNF is a disjunction of these.
type AndSet = Vec<Filter>;

fn lower(expr: Expr) -> ParsedQuery {
    match expr {
        Expr::Empty => ParsedQuery::default(),
        Expr::Or(parts) => {
            let mut or_groups = Vec::new();
            for part in parts {
                for alt in to_dnf(part) {
                    or_groups.push(merge_and_set(alt));
                }
            }
            ParsedQuery {
                filters: Vec::new(),
                or_groups,
            }
        }
        other => {
            let parts = match other {
                Expr::And(parts) => parts,
                single => vec![single],
            };
            let mut filters = Vec::new();
            let mut disjunctions: Vec<Vec<AndSet>> = Vec::new();
            for part in parts {
                let mut dnf = to_dnf(part);
                if dnf.len() == 1 {
                    for filter in dnf.pop().expect("len checked") {
                        merge_filter(&mut filters, filter);
                    }
                } else {
                    disjunctions.push(dnf);
                }
            }
            // Several OR-groups in one AND-chain fold by cross product:
            // (a OR b) (c OR d) -> (a c) OR (a d) OR (b c) OR (b d).
            let or_groups = match disjunctions.len() {
                0 => Vec::new(),
                _ => {
                    let mut iter = disjunctions.into_iter();
                    let mut acc = iter.next().expect("len checked");
                    for next in iter {
                        acc = cross_product(&acc, &next);
                    }
                    acc.into_iter().map(merge_and_set).collect()
                }
            };
            ParsedQuery { filters, or_groups }
        }
    }
}

/// Flattens a sub-expression to disjunctive normal form, pushing negation
/// down onto individual filters by De Morgan.
fn to_dnf(expr: Expr) -> Vec<AndSet> {
    match expr {
        Expr::Empty => vec![Vec::new()],
        Expr::Leaf(filter) => vec![vec![filter]],
        Expr::And(parts) => {
            let mut acc: Vec<AndSet> = vec![Vec::new()];
            for part in parts {
                acc = cross_product(&acc, &to_dnf(part));
            }
            acc
        }
        Expr::Or(parts) => parts.into_iter().flat_map(to_dnf).collect(),
        Expr::Not(inner) => negate_dnf(to_dnf(*inner)),
    }
}

/// Complement of a DNF: negate every literal, swap the connectives, and
/// re-expand to DNF. Inputs stay small; queries are human-typed.
fn negate_dnf(alternatives: Vec<AndSet>) -> Vec<AndSet> {
    let mut acc: Vec<AndSet> = vec![Vec::new()];
    for alt in alternatives {
        let negated: Vec<AndSet> = alt
            .into_iter()
            .map(|filter| vec![filter.negate()])
            .collect();
        acc = cross_product(&acc, &negated);
    }
    acc
}

fn cross_product(left: &[AndSet], right: &[AndSet]) -> Vec<AndSet> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for a in left {
        for b in right {
            let mut combined = a.clone();
            combined.extend(b.iter().cloned());
            out.push(combined);
        }
    }
    out
}

/// Applies the repetition policy while building an AND-set: multi-valued
/// kinds accumulate, single-valued kinds follow last-wins (per negation
/// polarity: `c:r -c:r` keeps both, contradictory as it is).
fn merge_filter(set: &mut Vec<Filter>, filter: Filter) {
    if !filter.kind.is_multi_valued() {
        if let Some(existing) = set
            .iter_mut()
            .find(|f| f.negated == filter.negated && f.kind.same_slot(&filter.kind))
        {
            *existing = filter;
            return;
        }
    }
    set.push(filter);
}

fn merge_and_set(filters: Vec<Filter>) -> Vec<Filter> {
    let mut merged = Vec::with_capacity(filters.len());
    for filter in filters {
        merge_filter(&mut merged, filter);
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
