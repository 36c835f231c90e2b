//! Chapter addresses with a structured chapter number.
//!
//! A queue line such as `https://mangabuff.ru/manga/some-title/1/17` is split
//! into the part before the chapter number, the number itself and an optional
//! trailing slash. Advancing a chapter works on the number, never on the raw
//! text, so `9` becomes `10` and `09` becomes `10` while `04` becomes `05`.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn locator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<head>.+/)(?P<value>\d+)(?:\.(?P<part>\d+))?(?P<tail>/?)$")
            .expect("locator pattern is valid")
    })
}

/// Errors produced while parsing a chapter address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("address has no trailing chapter number: {0}")]
    MissingChapter(String),

    #[error("chapter number out of range in {0}")]
    ChapterOutOfRange(String),
}

/// Chapter number as it appears in the last path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterNumber {
    value: u64,
    /// Digit count of the integer part, kept so zero padding survives
    width: usize,
    /// Fractional part of chapters like `12.5`
    part: Option<String>,
}

impl ChapterNumber {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            width: 1,
            part: None,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_fractional(&self) -> bool {
        self.part.is_some()
    }

    /// The following whole chapter, `None` past the largest number
    pub fn next(&self) -> Option<Self> {
        Some(Self {
            value: self.value.checked_add(1)?,
            width: self.width,
            part: None,
        })
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.width)?;
        if let Some(part) = &self.part {
            write!(f, ".{}", part)?;
        }
        Ok(())
    }
}

/// Address of a single chapter of a title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLocator {
    head: String,
    chapter: ChapterNumber,
    tail: String,
}

impl ChapterLocator {
    pub fn parse(address: &str) -> Result<Self, LocatorError> {
        let address = address.trim();
        let caps = locator_pattern()
            .captures(address)
            .ok_or_else(|| LocatorError::MissingChapter(address.to_string()))?;

        let digits = &caps["value"];
        let value = digits
            .parse::<u64>()
            .map_err(|_| LocatorError::ChapterOutOfRange(address.to_string()))?;

        Ok(Self {
            head: caps["head"].to_string(),
            chapter: ChapterNumber {
                value,
                width: digits.len(),
                part: caps.name("part").map(|m| m.as_str().to_string()),
            },
            tail: caps["tail"].to_string(),
        })
    }

    pub fn chapter(&self) -> &ChapterNumber {
        &self.chapter
    }

    /// Locator of the chapter after this one
    pub fn next(&self) -> Result<Self, LocatorError> {
        let chapter = self
            .chapter
            .next()
            .ok_or_else(|| LocatorError::ChapterOutOfRange(self.to_string()))?;
        Ok(Self {
            head: self.head.clone(),
            chapter,
            tail: self.tail.clone(),
        })
    }

    /// Whether both locators point into the same title
    pub fn same_title(&self, other: &ChapterLocator) -> bool {
        self.title_path() == other.title_path()
    }

    /// Address without the volume and chapter segments
    fn title_path(&self) -> &str {
        let trimmed = self.head.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if trimmed[idx + 1..].chars().all(|c| c.is_ascii_digit()) => &trimmed[..idx],
            _ => trimmed,
        }
    }
}

impl fmt::Display for ChapterLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.head, self.chapter, self.tail)
    }
}

impl FromStr for ChapterLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
