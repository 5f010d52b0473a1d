//! Location (path + query string) that owns the list position, and a
//! browser-like history over it.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::{fmt, str::FromStr};

pub const LIST_PATH: &str = "/reclamation";
const PAGE_PARAM: &str = "page";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
}

impl Location {
    pub fn list(page: u64) -> Self {
        Self {
            path: LIST_PATH.to_string(),
            query: vec![(PAGE_PARAM.to_string(), page.to_string())],
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// One-based page; missing or unparsable values mean page 1.
    pub fn page(&self) -> u64 {
        self.param(PAGE_PARAM)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }

    /// Same path with the query replaced by `page` alone.
    pub fn with_page(&self, page: u64) -> Self {
        Self {
            path: self.path.clone(),
            query: vec![(PAGE_PARAM.to_string(), page.to_string())],
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            path: LIST_PATH.to_string(),
            query: Vec::new(),
        }
    }
}

fn decode(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " ")).decode_utf8_lossy().into_owned()
}

impl FromStr for Location {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, query) = match s.split_once('?') {
            Some((path, query)) => (path, query),
            None => (s, ""),
        };
        let path = if path.is_empty() { LIST_PATH } else { path };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode(key), decode(value)),
                None => (decode(pair), String::new()),
            })
            .collect();

        Ok(Self {
            path: path.to_string(),
            query,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        for (index, (key, value)) in self.query.iter().enumerate() {
            write!(
                f,
                "{}{}={}",
                if index == 0 { '?' } else { '&' },
                utf8_percent_encode(key, NON_ALPHANUMERIC),
                utf8_percent_encode(value, NON_ALPHANUMERIC)
            )?;
        }
        Ok(())
    }
}

/// Back/forward stack of locations.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Location>,
    index: usize,
}

impl History {
    pub fn new(initial: Location) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    pub fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    /// Navigate to `location`, dropping any forward entries.
    pub fn push(&mut self, location: Location) {
        if *self.current() == location {
            return;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index += 1;
    }

    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }
}
