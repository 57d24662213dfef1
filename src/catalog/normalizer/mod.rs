// Catalog normalizer
// Turns one raw catalog record into the embedding-input text and the derived
// attributes (type classification, artist, physical dimensions).


use fancy_regex::Regex;
use itertools::Itertools;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use super::{CatalogLookups, RawProduct};

/// Closed set of product type classifications. Records that resolve to
/// nothing get `Unknown` rather than failing ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Statue,
    Jewelry,
    Print,
    Textile,
    Homeware,
    Ornament,
    Unknown,
}

impl ProductType {
    pub const ALL: [ProductType; 7] = [
        ProductType::Statue,
        ProductType::Jewelry,
        ProductType::Print,
        ProductType::Textile,
        ProductType::Homeware,
        ProductType::Ornament,
        ProductType::Unknown,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Statue => "statue",
            ProductType::Jewelry => "jewelry",
            ProductType::Print => "print",
            ProductType::Textile => "textile",
            ProductType::Homeware => "homeware",
            ProductType::Ornament => "ornament",
            ProductType::Unknown => "unknown",
        }
    }

    /// Infallible parse; anything unrecognized maps to `Unknown`.
    #[inline]
    pub fn parse(value: &str) -> Self {
        match value {
            "statue" => ProductType::Statue,
            "jewelry" => ProductType::Jewelry,
            "print" => ProductType::Print,
            "textile" => ProductType::Textile,
            "homeware" => ProductType::Homeware,
            "ornament" => ProductType::Ornament,
            _ => ProductType::Unknown,
        }
    }
}

impl fmt::Display for ProductType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived view of one catalog record, ready for embedding and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProduct {
    /// Space-joined concatenation of every text signal. Fed to the embedding
    /// client, never persisted verbatim.
    pub embedding_text: String,
    pub product_type: ProductType,
    pub artist: Option<String>,
    pub dimensions: Option<String>,
}

/// Keyword table in classification priority order. Dutch and English retail
/// vocabulary, since upstream catalogs mix both.
const TYPE_KEYWORDS: [(ProductType, &[&str]); 6] = [
    (
        ProductType::Statue,
        &[
            "beeld", "beeldje", "sculptuur", "sculpture", "statue", "figurine", "buste", "bust",
        ],
    ),
    (
        ProductType::Jewelry,
        &[
            "sieraad",
            "sieraden",
            "ketting",
            "armband",
            "oorbellen",
            "broche",
            "necklace",
            "bracelet",
            "earrings",
            "jewelry",
            "jewellery",
            "pendant",
        ],
    ),
    (
        ProductType::Print,
        &[
            "poster",
            "print",
            "kaart",
            "card",
            "schilderij",
            "painting",
            "reproductie",
            "reproduction",
            "canvas",
            "zeefdruk",
        ],
    ),
    (
        ProductType::Textile,
        &[
            "sjaal", "scarf", "paraplu", "umbrella", "kussen", "cushion", "plaid", "theedoek",
            "sokken", "socks",
        ],
    ),
    (
        ProductType::Homeware,
        &[
            "mok",
            "mug",
            "kop",
            "cup",
            "schaal",
            "bowl",
            "bord",
            "plate",
            "vaas",
            "vase",
            "glas",
            "glass",
            "onderzetter",
            "coaster",
            "theepot",
            "teapot",
        ],
    ),
    (
        ProductType::Ornament,
        &[
            "ornament",
            "decoratie",
            "kerstbal",
            "bauble",
            "suncatcher",
            "magneet",
            "magnet",
            "sleutelhanger",
            "keychain",
        ],
    ),
];

const NUMBER: &str = r"\d+(?:\.\d+)?";

static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d)").expect("regex is valid"));

static TRIPLE_AXIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({NUMBER})\s*[x×]\s*({NUMBER})\s*[x×]\s*({NUMBER})\s*cm\b"
    ))
    .expect("regex is valid")
});

static DOUBLE_AXIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({NUMBER})\s*[x×]\s*({NUMBER})\s*cm\b")).expect("regex is valid")
});

static LABELED_AXIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:hoogte|height|breedte|width|lengte|length|diepte|depth|diameter|doorsnede)\s*[:]?\s*(?:ca\.?\s*)?({NUMBER})\s*cm\b"
    ))
    .expect("regex is valid")
});

static CONTEXT_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:afmeting(?:en)?|formaat|maat|grootte|size)\D{{0,30}}?({NUMBER})\s*cm\b"
    ))
    .expect("regex is valid")
});

static CONTEXT_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({NUMBER})\s*cm\s*(?:groot|hoog|breed|lang|diep|tall|wide|high)\b"
    ))
    .expect("regex is valid")
});

/// Build the derived view of one catalog record. Best-effort throughout:
/// missing fields are omitted and extraction misses yield `None`.
#[inline]
pub fn normalize(product: &RawProduct, lookups: &CatalogLookups) -> NormalizedProduct {
    let description = strip_html(&product.description);
    let content = strip_html(&product.content);
    let categories = lookups.category_titles(product.id);
    let tags = lookups.tag_titles(product.id);
    let artist = lookups.brand_name(product.brand_id).map(str::to_string);

    let embedding_text = build_embedding_text(
        &product.title,
        &product.fulltitle,
        &description,
        &content,
        artist.as_deref(),
        categories,
        tags,
    );

    let product_type = classify(&product.title, &description, categories);
    let dimensions = extract_dimensions(&description, &content);

    NormalizedProduct {
        embedding_text,
        product_type,
        artist,
        dimensions,
    }
}

/// Space-joined concatenation of every available text signal, in fixed
/// order. Missing fields are omitted, not inserted as placeholders.
#[inline]
pub fn build_embedding_text(
    title: &str,
    fulltitle: &str,
    description: &str,
    content: &str,
    artist: Option<&str>,
    categories: &[String],
    tags: &[String],
) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for part in [title, fulltitle, description, content] {
        let trimmed = part.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    if let Some(artist) = artist {
        let trimmed = artist.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    for name in categories.iter().chain(tags) {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

/// Strip HTML markup, keeping text nodes and collapsing whitespace.
#[inline]
pub fn strip_html(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(input);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().join(" ")
}

/// Deterministic keyword classification over title, category names, and
/// description, in that precedence. No signal yields `Unknown`.
#[inline]
pub fn classify(title: &str, description: &str, categories: &[String]) -> ProductType {
    let category_text = categories.join(" ");
    for haystack in [title, category_text.as_str(), description] {
        let words: Vec<String> = haystack
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            continue;
        }
        for (product_type, keywords) in TYPE_KEYWORDS {
            if keywords.iter().any(|keyword| {
                words.iter().any(|word| {
                    word.as_str() == *keyword || (keyword.len() >= 5 && word.contains(*keyword))
                })
            }) {
                return product_type;
            }
        }
    }
    ProductType::Unknown
}

/// Scan description and content for a physical measurement in centimeters.
/// Multi-axis patterns win over single-axis, labeled over unlabeled; the
/// first pattern with a hit in either text wins. No match yields `None`.
#[inline]
pub fn extract_dimensions(description: &str, content: &str) -> Option<String> {
    let description = normalize_decimals(description);
    let content = normalize_decimals(content);

    for text in [&description, &content] {
        if let Some(caps) = TRIPLE_AXIS.captures(text).ok().flatten() {
            return Some(format!(
                "{} x {} x {} cm",
                group(&caps, 1),
                group(&caps, 2),
                group(&caps, 3)
            ));
        }
    }
    for text in [&description, &content] {
        if let Some(caps) = DOUBLE_AXIS.captures(text).ok().flatten() {
            return Some(format!("{} x {} cm", group(&caps, 1), group(&caps, 2)));
        }
    }
    for text in [&description, &content] {
        if let Some(caps) = LABELED_AXIS.captures(text).ok().flatten() {
            return Some(format!("{} cm", group(&caps, 1)));
        }
    }
    for text in [&description, &content] {
        let caps = CONTEXT_BEFORE
            .captures(text)
            .ok()
            .flatten()
            .or_else(|| CONTEXT_AFTER.captures(text).ok().flatten());
        if let Some(caps) = caps {
            return Some(format!("{} cm", group(&caps, 1)));
        }
    }

    None
}

fn normalize_decimals(text: &str) -> String {
    DECIMAL_COMMA.replace_all(text, "$1.$2").into_owned()
}

fn group<'t>(caps: &fancy_regex::Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}
