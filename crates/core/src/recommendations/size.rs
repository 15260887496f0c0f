//! Tire size keys.
//!
//! A size key is the normalized `WIDTH-ASPECT-RIM` form (`205-55-16`); the
//! display form is the sidewall notation (`205/55R16`). Conversions never
//! fail: input that cannot be parsed is passed through unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

const KEY_SEPARATOR: char = '-';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SizeKey {
    pub width: u32,
    pub aspect: u32,
    pub rim: u32,
}

impl SizeKey {
    pub fn new(width: u32, aspect: u32, rim: u32) -> Self {
        Self { width, aspect, rim }
    }

    pub fn to_key(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}", self.width, self.aspect, self.rim)
    }

    pub fn display(&self) -> String {
        format!("{}/{}R{}", self.width, self.aspect, self.rim)
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Outcome of a lenient size parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SizeParse {
    Parsed(SizeKey),
    Raw(String),
}

impl SizeParse {
    pub fn from_input(input: &str) -> Self {
        match parse_size(input) {
            Some(size) => Self::Parsed(size),
            None => Self::Raw(input.to_owned()),
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Parsed(size) => size.to_key(),
            Self::Raw(raw) => raw.clone(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Parsed(size) => size.display(),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

/// Parses the strict normalized form only.
pub fn parse_size_key(key: &str) -> Option<SizeKey> {
    let mut parts = key.split(KEY_SEPARATOR);
    let width = parse_component(parts.next()?)?;
    let aspect = parse_component(parts.next()?)?;
    let rim = parse_component(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(SizeKey::new(width, aspect, rim))
}

/// Parses free-form size notation: `205/55R16`, `205/55 R16`, `205 55 16`,
/// `P205/55ZR16`, `LT265/70R17`, or an already normalized key.
pub fn parse_size(input: &str) -> Option<SizeKey> {
    let trimmed = input.trim().to_ascii_uppercase();
    let body = trimmed.trim_start_matches(|ch: char| ch.is_ascii_alphabetic());

    let mut groups: Vec<u32> = Vec::with_capacity(3);
    let mut digits = String::new();
    let mut pending_letters = String::new();

    for ch in body.chars() {
        if ch.is_ascii_digit() {
            if !pending_letters.is_empty() {
                if !is_construction_code(&pending_letters) {
                    return None;
                }
                pending_letters.clear();
            }
            digits.push(ch);
            continue;
        }

        if !digits.is_empty() {
            groups.push(parse_component(&digits)?);
            digits.clear();
        }

        match ch {
            '/' | '-' | ' ' | '_' => {}
            letter if letter.is_ascii_alphabetic() => pending_letters.push(letter),
            _ => return None,
        }
    }

    if !digits.is_empty() {
        groups.push(parse_component(&digits)?);
    }
    if !pending_letters.is_empty() {
        return None;
    }

    match groups.as_slice() {
        [width, aspect, rim] => Some(SizeKey::new(*width, *aspect, *rim)),
        _ => None,
    }
}

/// `205-55-16` → `205/55R16`; anything unparseable is returned unchanged.
pub fn to_size_display(key: &str) -> String {
    parse_size_key(key).map(|size| size.display()).unwrap_or_else(|| key.to_owned())
}

/// Free-form size → normalized key; anything unparseable is returned unchanged.
pub fn normalize_size(input: &str) -> String {
    if parse_size_key(input).is_some() {
        return input.to_owned();
    }
    SizeParse::from_input(input).key()
}

fn parse_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn is_construction_code(letters: &str) -> bool {
    matches!(letters, "R" | "ZR" | "D" | "B")
}
