//! Corpus paragraphs, vocabularies and multi-hot encoding.
//!
//! Text format: paragraphs are separated by blank lines; words are
//! whitespace-delimited. If the first token of a paragraph contains a colon,
//! the part before the first colon is the paragraph label and the rest of the
//! token (if any) is its first word.

use std::fs;
use std::path::Path;

use hashbrown::HashMap;

use crate::error::{ConfigError, VocabularyError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Paragraph {
    pub label: Option<String>,
    pub words: Vec<String>,
}

impl Paragraph {
    /// Parse a single paragraph (line breaks are treated as spaces).
    pub fn parse(text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let mut para = Paragraph::default();
        if let Some(first) = tokens.next() {
            match first.split_once(':') {
                Some((label, rest)) => {
                    para.label = Some(label.to_string());
                    if !rest.is_empty() {
                        para.words.push(rest.to_string());
                    }
                }
                None => para.words.push(first.to_string()),
            }
        }
        para.words.extend(tokens.map(str::to_string));
        para
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Short display form used as a trial name.
    pub fn display(&self) -> String {
        match &self.label {
            Some(l) => format!("{l}: {}", self.words.join(" ")),
            None => self.words.join(" "),
        }
    }
}

/// Split text into paragraphs at blank lines. Empty paragraphs (e.g. a
/// label with no words) are kept; runs of blank lines are not.
pub fn parse_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut out = Vec::new();
    let mut buf = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !buf.trim().is_empty() {
                out.push(Paragraph::parse(&buf));
            }
            buf.clear();
        } else {
            buf.push_str(line);
            buf.push('\n');
        }
    }
    if !buf.trim().is_empty() {
        out.push(Paragraph::parse(&buf));
    }
    out
}

/// Read and concatenate paragraphs from each file in order.
pub fn read_corpus<P: AsRef<Path>>(files: &[P]) -> Result<Vec<Paragraph>, ConfigError> {
    if files.is_empty() {
        return Err(ConfigError::NoCorpusFiles);
    }
    let mut out = Vec::new();
    for f in files {
        let path = f.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let paras = parse_paragraphs(&text);
        tracing::debug!(path = %path.display(), paragraphs = paras.len(), "corpus file read");
        out.extend(paras);
    }
    Ok(out)
}

/// Bijective word <-> dense id mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    /// Ids follow first occurrence in `words`; duplicates are dropped.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        let mut v = Self::default();
        for w in words {
            v.insert(w.as_ref());
        }
        v
    }

    /// Union of every word in `paras`, sorted alphabetically and re-indexed.
    pub fn scan(paras: &[Paragraph]) -> Self {
        let mut all: Vec<&str> = paras
            .iter()
            .flat_map(|p| p.words.iter().map(String::as_str))
            .collect();
        all.sort_unstable();
        all.dedup();
        Self::from_words(&all)
    }

    fn insert(&mut self, w: &str) {
        if self.ids.contains_key(w) {
            return;
        }
        self.ids.insert(w.to_string(), self.words.len());
        self.words.push(w.to_string());
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.ids.get(word).copied()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Check every word; the error names all misses, in first-seen order.
    pub fn check_words<S: AsRef<str>>(&self, words: &[S]) -> Result<(), VocabularyError> {
        let mut missing: Vec<String> = Vec::new();
        for w in words {
            let w = w.as_ref();
            if self.id(w).is_none() && !missing.iter().any(|m| m == w) {
                missing.push(w.to_string());
            }
        }
        match VocabularyError::from_missing(missing) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Split `paras` into those fully covered by the vocabulary and an
    /// aggregated error for the rest.
    pub fn partition(&self, paras: Vec<Paragraph>) -> (Vec<Paragraph>, Option<VocabularyError>) {
        let mut ok = Vec::with_capacity(paras.len());
        let mut missing: Vec<String> = Vec::new();
        for p in paras {
            match self.check_words(&p.words) {
                Ok(()) => ok.push(p),
                Err(e) => {
                    for w in e.missing {
                        if !missing.contains(&w) {
                            missing.push(w);
                        }
                    }
                }
            }
        }
        (ok, VocabularyError::from_missing(missing))
    }

    /// Zero `out` and set one unit per distinct known word in `words`.
    /// Returns the number of units set. Unknown words are skipped.
    pub fn encode_words<S: AsRef<str>>(&self, words: &[S], out: &mut [f32]) -> usize {
        out.iter_mut().for_each(|x| *x = 0.0);
        let mut on = 0;
        for w in words {
            if let Some(i) = self.id(w.as_ref()) {
                if let Some(slot) = out.get_mut(i) {
                    if *slot == 0.0 {
                        *slot = 1.0;
                        on += 1;
                    }
                }
            }
        }
        on
    }

    pub fn encode(&self, para: &Paragraph, out: &mut [f32]) -> usize {
        self.encode_words(&para.words, out)
    }

    /// Words whose unit is above `threshold`, in id order.
    pub fn decode(&self, act: &[f32], threshold: f32) -> Vec<&str> {
        act.iter()
            .enumerate()
            .filter(|(_, &a)| a > threshold)
            .filter_map(|(i, _)| self.word(i))
            .collect()
    }
}
