//! Parameter sources
//!
//! Transport metadata (headers) and the query string are merged into one
//! ordered parameter list. Keys are case-folded; on collision the query
//! string value replaces the header value in place, so the first occurrence
//! position decides ordering.

/// One merged parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Lower-cased key used for dispatch
    pub key: String,
    /// Key as received; same byte length as `key`
    pub raw_key: String,
    pub value: String,
}

impl Param {
    pub fn new(raw_key: impl Into<String>, value: impl Into<String>) -> Self {
        let raw_key = raw_key.into().trim().to_string();
        Self {
            key: raw_key.to_ascii_lowercase(),
            raw_key,
            value: value.into(),
        }
    }

    /// Suffix of the raw key after a dispatch prefix, case preserved
    pub fn raw_suffix(&self, prefix_len: usize) -> &str {
        self.raw_key.get(prefix_len..).unwrap_or("")
    }
}

/// Merges headers and query-string pairs; the query string wins on
/// case-insensitive key collision.
pub fn merge_sources<K, V>(headers: &[(K, V)], query: &[(K, V)]) -> Vec<Param>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut merged: Vec<Param> = Vec::with_capacity(headers.len() + query.len());

    for (key, value) in headers.iter().chain(query.iter()) {
        let param = Param::new(key.as_ref(), value.as_ref());
        if param.key.is_empty() {
            continue;
        }
        match merged.iter_mut().find(|p| p.key == param.key) {
            Some(existing) => *existing = param,
            None => merged.push(param),
        }
    }

    merged
}

/// Value of a merged parameter by case-insensitive key
pub fn lookup<'a>(params: &'a [Param], key: &str) -> Option<&'a str> {
    let key = key.to_ascii_lowercase();
    params
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value.as_str())
}
