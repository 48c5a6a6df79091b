//! Structured entity recognition over extracted text.
//!
//! A pure function: text in, ordered entity matches out. Recognizers run
//! independently and their results are concatenated in a fixed order
//! (email, domain, phone, amount, pay hint). There is deliberately no
//! cross-recognizer suppression: a phone-like substring inside a URL may
//! yield both a domain and a phone entity.

use once_cell::sync::Lazy;
use regex::Regex;

/// One recognized entity, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMatch {
    pub kind: String,
    pub value: String,
    pub normalized: Option<String>,
    pub context: Option<String>,
    pub score: Option<f64>,
}

impl EntityMatch {
    fn new(kind: &str, value: String, normalized: Option<String>) -> EntityMatch {
        EntityMatch {
            kind: kind.to_string(),
            value,
            normalized,
            context: None,
            score: None,
        }
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b").unwrap()
});
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(\d{2,3}\)[\s.-]?)?\d{2,4}[\s.-]?\d{2,4}[\s.-]?\d{2,4}")
        .unwrap()
});
static AMOUNT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<currency>€|\$|eur|usd)\s?(?P<value>\d{1,3}(?:[\s.,]\d{3})*(?:[.,]\d{2})?)")
        .unwrap()
});
static AMOUNT_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<value>\d{1,3}(?:[\s.,]\d{3})*(?:[.,]\d{2})?)\s?(?P<currency>€|\$|eur|usd)")
        .unwrap()
});

/// Payslip-indicative phrases, matched case-insensitively as substrings.
const PAY_HINTS: &[&str] = &[
    "bulletin de salaire",
    "net a payer",
    "net à payer",
    "salaire brut",
    "retenues",
    "cotisation",
];

/// Minimum stripped-digit count for a phone candidate; shorter runs are
/// numeric noise, not phone numbers.
const PHONE_MIN_DIGITS: usize = 7;

/// Extract structured entities from the provided text.
pub fn extract_entities(text: &str) -> Vec<EntityMatch> {
    let mut entities: Vec<EntityMatch> = Vec::new();

    // Emails: dedup by normalized (lowercased) value, first occurrence wins.
    let mut seen_emails = std::collections::HashSet::new();
    for m in EMAIL_RE.find_iter(text) {
        let normalized = m.as_str().to_lowercase();
        if !seen_emails.insert(normalized.clone()) {
            continue;
        }
        entities.push(EntityMatch::new(
            "email",
            m.as_str().to_string(),
            Some(normalized),
        ));
    }

    // Domains: deduplicated as a set by raw value.
    let mut seen_domains = std::collections::HashSet::new();
    for m in DOMAIN_RE.find_iter(text) {
        let value = m.as_str().to_string();
        if !seen_domains.insert(value.clone()) {
            continue;
        }
        let normalized = value.to_lowercase();
        entities.push(EntityMatch::new("domain", value, Some(normalized)));
    }

    // Phones: keep digits and a leading '+'; drop short candidates.
    for m in PHONE_RE.find_iter(text) {
        let cleaned: String = m
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        if cleaned.chars().filter(|c| c.is_ascii_digit()).count() < PHONE_MIN_DIGITS {
            continue;
        }
        entities.push(EntityMatch::new(
            "phone",
            m.as_str().to_string(),
            Some(cleaned),
        ));
    }

    // Amounts: two passes, currency before and after the number.
    for caps in AMOUNT_PREFIX_RE
        .captures_iter(text)
        .chain(AMOUNT_SUFFIX_RE.captures_iter(text))
    {
        let currency = canonical_currency(&caps["currency"]);
        let normalized = normalize_amount(&caps["value"]);
        entities.push(EntityMatch::new(
            "amount",
            caps[0].to_string(),
            Some(format!("{} {}", currency, normalized)),
        ));
    }

    // Pay hints: one match per hint phrase present anywhere in the text.
    let lowered = text.to_lowercase();
    for hint in PAY_HINTS {
        if lowered.contains(hint) {
            entities.push(EntityMatch::new("pay_hint", hint.to_string(), None));
        }
    }

    entities
}

fn canonical_currency(raw: &str) -> String {
    match raw {
        "€" => "EUR".to_string(),
        "$" => "USD".to_string(),
        other => other.to_uppercase(),
    }
}

/// Normalize a matched amount value: strip spaces; when a decimal comma is
/// present, dots are thousands separators and the comma becomes the decimal
/// point. `"1 234,56"` → `"1234.56"`, `"45.00"` → `"45.00"`.
fn normalize_amount(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_normalized(text: &str) -> Vec<(String, Option<String>)> {
        extract_entities(text)
            .into_iter()
            .map(|e| (e.kind, e.normalized))
            .collect()
    }

    #[test]
    fn email_normalized_and_deduplicated() {
        let entities = extract_entities("Contact Agent@Example.org or agent@example.org today");
        let emails: Vec<_> = entities.iter().filter(|e| e.kind == "email").collect();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].value, "Agent@Example.org");
        assert_eq!(emails[0].normalized.as_deref(), Some("agent@example.org"));
    }

    #[test]
    fn domains_deduplicated() {
        let entities = extract_entities("see evil.example.com and evil.example.com again");
        let domains: Vec<_> = entities.iter().filter(|e| e.kind == "domain").collect();
        assert_eq!(domains.len(), 1);
        assert_eq!(
            domains[0].normalized.as_deref(),
            Some("evil.example.com")
        );
    }

    #[test]
    fn short_phone_candidates_discarded() {
        let entities = extract_entities("order 12 34 56 ref");
        assert!(entities.iter().all(|e| e.kind != "phone"));
    }

    #[test]
    fn phone_normalized_to_digits_and_plus() {
        let entities = extract_entities("call +33612345678 now");
        let phones: Vec<_> = entities.iter().filter(|e| e.kind == "phone").collect();
        assert!(!phones.is_empty());
        assert_eq!(phones[0].normalized.as_deref(), Some("+33612345678"));
    }

    #[test]
    fn amount_with_suffix_euro() {
        let entities = extract_entities("total 1 234,56 € due");
        let amounts: Vec<_> = entities.iter().filter(|e| e.kind == "amount").collect();
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].normalized.as_deref(), Some("EUR 1234.56"));
    }

    #[test]
    fn amount_with_prefix_dollar() {
        let entities = extract_entities("paid $45.00 upfront");
        let amounts: Vec<_> = entities.iter().filter(|e| e.kind == "amount").collect();
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].normalized.as_deref(), Some("USD 45.00"));
    }

    #[test]
    fn amount_currency_code_uppercased() {
        let entities = extract_entities("facture de 900,00 eur");
        let amounts: Vec<_> = entities.iter().filter(|e| e.kind == "amount").collect();
        assert_eq!(amounts[0].normalized.as_deref(), Some("EUR 900.00"));
    }

    #[test]
    fn pay_hint_case_insensitive() {
        let entities = extract_entities("BULLETIN DE SALAIRE — Net à payer: 1 800,00 €");
        let hints: Vec<_> = entities.iter().filter(|e| e.kind == "pay_hint").collect();
        let values: Vec<_> = hints.iter().map(|e| e.value.as_str()).collect();
        assert!(values.contains(&"bulletin de salaire"));
        assert!(values.contains(&"net à payer"));
    }

    #[test]
    fn no_cross_recognizer_suppression() {
        // the email's domain part also matches the domain recognizer
        let entities = extract_entities("mail agent@example.org");
        let kinds: Vec<_> = entities.iter().map(|e| e.kind.as_str()).collect();
        assert!(kinds.contains(&"email"));
        assert!(kinds.contains(&"domain"));
    }

    #[test]
    fn extraction_is_idempotent_and_ordered() {
        let text = "mail a@b.fr, call +33612345678, owed 12,50 € — salaire brut";
        assert_eq!(kinds_and_normalized(text), kinds_and_normalized(text));
        let kinds: Vec<_> = extract_entities(text)
            .into_iter()
            .map(|e| e.kind)
            .collect();
        // recognizer order is fixed: emails before domains before phones...
        let first_email = kinds.iter().position(|k| k.as_str() == "email").unwrap();
        let first_domain = kinds.iter().position(|k| k.as_str() == "domain").unwrap();
        let first_phone = kinds.iter().position(|k| k.as_str() == "phone").unwrap();
        assert!(first_email < first_domain);
        assert!(first_domain < first_phone);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(extract_entities("").is_empty());
    }
}
