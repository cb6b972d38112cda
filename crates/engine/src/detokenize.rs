//! Detokenizer: find `[[...]]` tokens in free text and map them back through
//! an imported dictionary.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("token pattern is valid"));

/// Imported `token -> original` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: FxHashMap<String, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, original: impl Into<String>) {
        self.entries.insert(token.into(), original.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// One token match in the scanned text. Offsets are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub token: String,
    pub start: usize,
    pub end: usize,
    pub found: bool,
}

/// Distinct token with its number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenEntry {
    pub token: String,
    pub count: usize,
    pub original: Option<String>,
}

impl TokenEntry {
    pub fn is_found(&self) -> bool {
        self.original.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Text length in characters.
    pub chars: usize,
    pub total: usize,
    pub unique: usize,
    /// Occurrences resolved by the dictionary.
    pub found: usize,
    pub not_found: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Replaced { token: &'a str, original: &'a str },
    Unresolved { token: &'a str },
}

/// Which token-list entries are visible. Substitution ignores the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenFilter {
    pub found: bool,
    pub not_found: bool,
}

impl Default for TokenFilter {
    fn default() -> Self {
        Self { found: true, not_found: true }
    }
}

impl TokenFilter {
    pub fn allows(&self, entry: &TokenEntry) -> bool {
        if entry.is_found() {
            self.found
        } else {
            self.not_found
        }
    }
}

/// Result of scanning one text against one dictionary.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    text: &'a str,
    occurrences: Vec<Occurrence>,
    entries: Vec<TokenEntry>,
    stats: ScanStats,
}

/// Scan the whole text. Stateless: call again on every edit.
pub fn scan<'a>(text: &'a str, dictionary: &Dictionary) -> Scan<'a> {
    let mut occurrences = Vec::new();
    let mut entries: Vec<TokenEntry> = Vec::new();
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();

    for m in TOKEN_PATTERN.find_iter(text) {
        let token = m.as_str();
        let found = dictionary.contains(token);
        occurrences.push(Occurrence {
            token: token.to_string(),
            start: m.start(),
            end: m.end(),
            found,
        });
        match index.get(token) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(token, entries.len());
                entries.push(TokenEntry {
                    token: token.to_string(),
                    count: 1,
                    original: dictionary.get(token).map(str::to_string),
                });
            }
        }
    }

    let found = occurrences.iter().filter(|o| o.found).count();
    let stats = ScanStats {
        chars: text.chars().count(),
        total: occurrences.len(),
        unique: entries.len(),
        found,
        not_found: occurrences.len() - found,
    };

    Scan { text, occurrences, entries, stats }
}

impl<'a> Scan<'a> {
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Matches in text order.
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Distinct tokens in first-appearance order.
    pub fn entries(&self) -> &[TokenEntry] {
        &self.entries
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Entries left visible by `filter`. An empty result with a non-empty
    /// scan means the filter hides everything.
    pub fn filtered_entries(&self, filter: TokenFilter) -> Vec<&TokenEntry> {
        self.entries.iter().filter(|e| filter.allows(e)).collect()
    }

    /// Text split into plain runs and token substitutions.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::with_capacity(self.occurrences.len() * 2 + 1);
        let mut last = 0;
        for occ in &self.occurrences {
            if occ.start > last {
                segments.push(Segment::Text(&self.text[last..occ.start]));
            }
            let token = &self.text[occ.start..occ.end];
            match self.original(token) {
                Some(original) => segments.push(Segment::Replaced { token, original }),
                None => segments.push(Segment::Unresolved { token }),
            }
            last = occ.end;
        }
        if last < self.text.len() {
            segments.push(Segment::Text(&self.text[last..]));
        }
        segments
    }

    fn original(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.token == token)
            .and_then(|e| e.original.as_deref())
    }

    /// Found tokens replaced, unresolved tokens kept verbatim.
    pub fn render_plain(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        for segment in self.segments() {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Replaced { original, .. } => out.push_str(original),
                Segment::Unresolved { token } => out.push_str(token),
            }
        }
        out
    }

    /// Source text split into runs, each tagged `Some(found)` for a token
    /// match or `None` for plain text.
    pub fn highlight_source(&self) -> Vec<(&'a str, Option<bool>)> {
        let mut runs = Vec::new();
        let mut last = 0;
        for occ in &self.occurrences {
            if occ.start > last {
                runs.push((&self.text[last..occ.start], None));
            }
            runs.push((&self.text[occ.start..occ.end], Some(occ.found)));
            last = occ.end;
        }
        if last < self.text.len() {
            runs.push((&self.text[last..], None));
        }
        runs
    }
}
