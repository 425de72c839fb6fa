//! Tokenizer
//!
//! The shell splits `a@'hello world'` into `a@'hello` and `world'`. The
//! tokenizer glues such words back together by tracking single quotes, then
//! splits each token into a key/value pair or leaves it bare.

/// Ordered key→value mapping; a repeated key keeps its first position and
/// takes the last value given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    entries: Vec<(String, String)>,
}

impl KeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair; returns the value it replaced
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, String)> for KeyValues {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut kv = KeyValues::new();
        for (key, value) in iter {
            kv.insert(key, value);
        }
        kv
    }
}

impl IntoIterator for KeyValues {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Tokenizer output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// `key@value` tokens, split on the first `@`
    pub pairs: KeyValues,

    /// Tokens without `@`, in input order, empty ones dropped
    pub bare: Vec<String>,
}

/// Re-join words while the running count of `'` is odd.
///
/// An unterminated group is flushed as the final token.
pub fn reassemble<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut quotes = 0usize;

    for word in words {
        let word = word.as_ref();
        current.push(word);
        quotes += word.matches('\'').count();
        if quotes % 2 == 0 {
            tokens.push(current.join(" "));
            current.clear();
            quotes = 0;
        }
    }

    if !current.is_empty() {
        tokens.push(current.join(" "));
    }
    tokens
}

/// Split words into pairs and bare tokens
pub fn tokenize<S: AsRef<str>>(words: &[S]) -> Tokens {
    let mut out = Tokens::default();

    for token in reassemble(words) {
        match token.split_once('@') {
            Some((key, value)) => {
                out.pairs
                    .insert(strip_quotes(key).to_string(), strip_quotes(value).to_string());
            }
            None => {
                let bare = strip_quotes(&token);
                if !bare.is_empty() {
                    out.bare.push(bare.to_string());
                }
            }
        }
    }
    out
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches('\'')
}
