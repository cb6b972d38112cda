use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::table::Table;

/// Number of random bytes behind every token (128 bits).
pub const TOKEN_ENTROPY_BYTES: usize = 16;

/// Opaque stand-in for a sensitive value: `[[<22 base64url chars>]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Draw a fresh token from the OS random source.
    pub fn generate() -> Result<Token, EngineError> {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| EngineError::RandomUnavailable(e.to_string()))?;
        Ok(Token(format!("[[{}]]", URL_SAFE_NO_PAD.encode(bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: &str) -> Token {
        Token(raw.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Value-level token cache: one token per distinct original string.
///
/// The two maps are only ever mutated together, so they stay mutually
/// inverse for the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    by_value: FxHashMap<String, Token>,
    by_token: FxHashMap<Token, String>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing token for `value`, or a freshly generated and registered one.
    pub fn get_or_create_token(&mut self, value: &str) -> Result<Token, EngineError> {
        if let Some(token) = self.by_value.get(value) {
            return Ok(token.clone());
        }
        let token = Token::generate()?;
        self.register(value.to_string(), token.clone());
        Ok(token)
    }

    /// Generate tokens for every value not yet in the store, without
    /// registering them. Either all of them are generated or none is.
    pub fn prepare<'a, I>(&self, values: I) -> Result<Vec<(String, Token)>, EngineError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut pending: Vec<(String, Token)> = Vec::new();
        for value in values {
            if self.by_value.contains_key(value) || pending.iter().any(|(v, _)| v == value) {
                continue;
            }
            pending.push((value.to_string(), Token::generate()?));
        }
        Ok(pending)
    }

    /// Register tokens produced by [`TokenStore::prepare`].
    pub fn commit(&mut self, pending: Vec<(String, Token)>) {
        for (value, token) in pending {
            if !self.by_value.contains_key(&value) {
                self.register(value, token);
            }
        }
    }

    fn register(&mut self, value: String, token: Token) {
        self.by_token.insert(token.clone(), value.clone());
        self.by_value.insert(value, token);
    }

    pub fn token_for(&self, value: &str) -> Option<&Token> {
        self.by_value.get(value)
    }

    pub fn original_for(&self, token: &Token) -> Option<&str> {
        self.by_token.get(token).map(String::as_str)
    }

    /// Drop `token` from both maps unless some cell outside `excluding_column`
    /// still holds it. Returns true when the token was removed.
    pub fn release_if_unused(&mut self, token: &Token, table: &Table, excluding_column: usize) -> bool {
        if table.holds_token_outside(token, excluding_column) {
            return false;
        }
        match self.by_token.remove(token) {
            Some(value) => {
                self.by_value.remove(&value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_value.clear();
        self.by_token.clear();
    }

    /// All (token, original) pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &str)> {
        self.by_token.iter().map(|(t, v)| (t, v.as_str()))
    }
}
