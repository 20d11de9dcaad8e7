//! Spelling variations of identity values.
//!
//! A name like `Greg Barker` is also typed as `gbarker`, `G. Barker` or `greg_barker`.
//! Substitution matches every variation, so each generator lists the common
//! spellings in a stable order with duplicates removed.

use fxhash::FxHashSet;
use shroud_domain::{IdentityData, VariationSet};

/// Insertion-ordered set of non-empty strings.
#[derive(Default)]
struct Ordered {
    seen: FxHashSet<String>,
    items: Vec<String>,
}

impl Ordered {
    fn add(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() && self.seen.insert(value.clone()) {
            self.items.push(value);
        }
    }

    fn finish(self) -> Vec<String> {
        self.items
    }
}

fn first_char(word: &str) -> &str {
    word.char_indices().nth(1).map_or(word, |(end, _)| &word[..end])
}

/// `word` with an upper-case first letter and the rest lower-cased.
fn title(word: &str) -> String {
    let head = first_char(word);
    format!("{}{}", head.to_uppercase(), word[head.len()..].to_lowercase())
}

/// `word` with an upper-case first letter and the rest unchanged.
fn capitalize(word: &str) -> String {
    let head = first_char(word);
    format!("{}{}", head.to_uppercase(), &word[head.len()..])
}

#[must_use]
pub fn name_variations(name: &str) -> Vec<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut out = Ordered::default();
    out.add(trimmed);

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let (first, last) = match parts.as_slice() {
        [word] => {
            out.add(*word);
            out.add(word.to_lowercase());
            out.add(title(word));
            out.add(word.to_uppercase());
            return out.finish();
        },
        [first, .., last] => (*first, *last),
        [] => return out.finish(),
    };

    let spaced = parts.join(" ");
    let joined = parts.concat();
    out.add(spaced.clone());
    out.add(joined.clone());
    out.add(joined.to_lowercase());
    out.add(spaced.to_lowercase());

    let titled: Vec<String> = parts.iter().map(|p| title(p)).collect();
    out.add(titled.join(" "));
    out.add(titled.concat());

    let initial = first_char(first);
    let (lower_i, upper_i) = (initial.to_lowercase(), initial.to_uppercase());
    let lower_last = last.to_lowercase();
    out.add(format!("{lower_i}{lower_last}"));
    out.add(format!("{upper_i}{lower_last}"));
    out.add(format!("{lower_i}{last}"));
    out.add(format!("{upper_i}{last}"));
    out.add(format!("{upper_i}. {last}"));
    out.add(format!("{upper_i}.{last}"));

    if parts.len() > 2 {
        out.add(format!("{first} {last}"));
        out.add(format!("{first}{last}"));
        out.add(format!("{}{lower_last}", first.to_lowercase()));
    }

    out.add(spaced.to_uppercase());
    out.add(joined.to_uppercase());

    for sep in ["_", "-", "."] {
        let separated = parts.join(sep);
        out.add(separated.to_lowercase());
        if sep == "_" {
            out.add(separated.to_uppercase());
        } else {
            out.add(separated);
        }
    }

    out.finish()
}

#[must_use]
pub fn email_variations(email: &str) -> Vec<String> {
    if !email.contains('@') {
        return Vec::new();
    }

    let address = email.trim().to_lowercase();
    let mut pieces = address.split('@');
    let local = pieces.next().unwrap_or_default();
    let domain = pieces.next().unwrap_or_default();

    let mut out = Ordered::default();
    out.add(address.clone());
    out.add(format!("{}@{domain}", local.replace('.', "")));

    if local.contains('.') {
        let mut words = local.split('.');
        let head = words.next().unwrap_or_default();
        let camel: String = words.map(capitalize).collect();
        out.add(format!("{head}{camel}@{domain}"));
    }
    if local.contains('_') {
        out.add(format!("{}@{domain}", local.replace('_', ".")));
    }
    if local.contains('.') {
        out.add(format!("{}@{domain}", local.replace('.', "_")));
    }
    out.add(format!("{}@{domain}", capitalize(local)));

    out.finish()
}

#[must_use]
pub fn phone_variations(phone: &str) -> Vec<String> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return vec![phone.to_owned()];
    }

    let mut out = Ordered::default();
    out.add(trimmed);
    out.add(digits.clone());

    if digits.len() == 10 {
        let (area, prefix, line) = (&digits[..3], &digits[3..6], &digits[6..]);
        out.add(format!("({area}) {prefix}-{line}"));
        out.add(format!("{area}-{prefix}-{line}"));
        out.add(format!("{area}.{prefix}.{line}"));
        out.add(format!("{area} {prefix} {line}"));
        out.add(format!("+1 {area} {prefix} {line}"));
        out.add(format!("+1-{area}-{prefix}-{line}"));
        out.add(format!("1-{area}-{prefix}-{line}"));
    } else if digits.len() == 11 && digits.starts_with('1') {
        let (area, prefix, line) = (&digits[1..4], &digits[4..7], &digits[7..]);
        out.add(format!("+{digits}"));
        out.add(format!("+1 {area} {prefix} {line}"));
        out.add(format!("+1-{area}-{prefix}-{line}"));
        out.add(format!("1-{area}-{prefix}-{line}"));
        out.add(format!("({area}) {prefix}-{line}"));
    }

    out.finish()
}

/// Case variations for free text such as a company or an address.
#[must_use]
pub fn generic_variations(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut out = Ordered::default();
    out.add(trimmed);
    out.add(trimmed.to_lowercase());
    out.add(trimmed.to_uppercase());
    out.add(trimmed.split_whitespace().map(title).collect::<Vec<_>>().join(" "));
    out.finish()
}

/// Variations of every populated field. Empty values produce no entry.
#[must_use]
pub fn identity_variations(identity: &IdentityData) -> VariationSet {
    fn field(value: Option<&String>, generate: fn(&str) -> Vec<String>) -> Option<Vec<String>> {
        value.filter(|v| !v.is_empty()).map(|v| generate(v))
    }

    VariationSet {
        name: field(identity.name.as_ref(), name_variations),
        email: field(identity.email.as_ref(), email_variations),
        phone: field(identity.phone.as_ref(), phone_variations),
        cell_phone: field(identity.cell_phone.as_ref(), phone_variations),
        company: field(identity.company.as_ref(), generic_variations),
        address: field(identity.address.as_ref(), generic_variations),
    }
}

/// True when `text` contains any variation, ignoring case.
#[must_use]
pub fn contains_variation(text: &str, variations: &[String]) -> bool {
    !find_variations(text, variations).is_empty()
}

/// Variations that occur in `text`, ignoring case, in the order given.
#[must_use]
pub fn find_variations<'a>(text: &str, variations: &'a [String]) -> Vec<&'a str> {
    if text.is_empty() {
        return Vec::new();
    }
    let haystack = text.to_lowercase();
    variations
        .iter()
        .filter(|v| haystack.contains(&v.to_lowercase()))
        .map(String::as_str)
        .collect()
}
