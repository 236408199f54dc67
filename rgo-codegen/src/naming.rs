// Name conversion utilities for codegen: camel case word splitting and the
// snake_case names used for the R-facing API.

/// Known words used when none are configured.
pub const DEFAULT_WORDS: &[&str] = &["NaN", "NA"];

/// Split an identifier into words according to camel case rules.
///
/// Words start with a leading capital unless they are the first word in the
/// string. Underscores break words and are dropped, runs of digits form their
/// own words, and an acronym followed by a title-cased word is split before
/// the last capital of the acronym (`IMUsed` is `IM`, `Used`).
///
/// The empty string is returned unchanged as a single word.
pub fn split(s: &str) -> Vec<String> {
    if s.is_empty() {
        return vec![String::new()];
    }
    let mut words = Vec::new();
    let mut last = 0;
    let mut prev = '\0';
    for (i, curr) in s.char_indices() {
        if curr == '_' {
            if prev != curr && last != i {
                words.push(s[last..i].to_string());
            }
            last = i + 1;
        } else if curr.is_numeric() {
            if !prev.is_numeric() && last != i {
                words.push(s[last..i].to_string());
                last = i;
            }
        } else if curr.is_uppercase() {
            let next = s[i + curr.len_utf8()..].chars().next().unwrap_or('\0');
            let boundary = prev.is_lowercase()
                || prev.is_numeric()
                || (prev.is_uppercase() && next.is_lowercase());
            if boundary && last != i {
                words.push(s[last..i].to_string());
                last = i;
            }
        }
        prev = curr;
    }
    if last < s.len() {
        words.push(s[last..].to_string());
    }
    words
}

/// Byte-oriented form of [`split`]. Input that is not valid UTF-8 is not
/// split and is returned unchanged as a single word.
pub fn split_bytes(b: &[u8]) -> Vec<Vec<u8>> {
    match std::str::from_utf8(b) {
        Ok(s) => split(s).into_iter().map(String::into_bytes).collect(),
        Err(_) => vec![b.to_vec()],
    }
}

/// Camel case splitter with case-sensitive known words.
///
/// Known words are checked in the order given: when two known words overlap
/// in the input only the first in priority order is used, even if a later
/// word occurs earlier in the string. `Splitter::default().split` is
/// equivalent to [`split`].
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    known: Vec<String>,
}

impl Splitter {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Splitter { known: known.into_iter().map(Into::into).collect() }
    }

    pub fn known(&self) -> &[String] {
        &self.known
    }

    pub fn split(&self, s: &str) -> Vec<String> {
        if s.is_empty() || self.known.is_empty() {
            return split(s);
        }
        let mut words = Vec::new();
        for part in split_known(s, &self.known) {
            if self.known.iter().any(|w| w == part) {
                words.push(part.to_string());
            } else {
                words.extend(split(part));
            }
        }
        words
    }
}

/// Segment `s` at the first occurrence of the highest priority known word.
/// Text before the match may only contain lower priority words; text after
/// it is segmented with the full list again.
fn split_known<'a>(s: &'a str, words: &[String]) -> Vec<&'a str> {
    if s.is_empty() {
        return Vec::new();
    }
    let Some((w, rest)) = words.split_first() else {
        return vec![s];
    };
    // An empty known word matches everywhere and splits nothing.
    if w.is_empty() {
        return split_known(s, rest);
    }
    match s.find(w.as_str()) {
        None => split_known(s, rest),
        Some(i) => {
            let end = i + w.len();
            let mut parts = split_known(&s[..i], rest);
            parts.push(&s[i..end]);
            parts.extend(split_known(&s[end..], words));
            parts
        }
    }
}

/// Convert a Go identifier to the snake_case name exported to R.
pub fn snake(splitter: &Splitter, name: &str) -> String {
    splitter.split(name).join("_").to_lowercase()
}
