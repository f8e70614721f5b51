//! OCR engine identities and the per-engine page registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::OcrPage;

/// Identity of the engine that produced a set of pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineId {
    /// Tesseract legacy recognizer (first recognition pass)
    Legacy,
    /// Tesseract LSTM recognizer (second pass, or the only pass)
    Lstm,
    /// Alias mirroring whichever recognition pass merged last
    Latest,
    /// Imported data or any other engine, by name
    User(String),
}

impl EngineId {
    pub fn user(name: impl Into<String>) -> Self {
        EngineId::User(name.into())
    }

    /// Display name, matching the labels used for imported data.
    pub fn name(&self) -> &str {
        match self {
            EngineId::Legacy => "Tesseract Legacy",
            EngineId::Lstm => "Tesseract LSTM",
            EngineId::Latest => "Tesseract Latest",
            EngineId::User(name) => name,
        }
    }

    /// Whether this is one of the two recognition passes mirrored by
    /// [`EngineId::Latest`].
    pub fn is_recognition_pass(&self) -> bool {
        matches!(self, EngineId::Legacy | EngineId::Lstm)
    }

    /// Order of the pass within one recognition run. The legacy pass always
    /// runs before the LSTM pass.
    pub(crate) fn pass_rank(&self) -> Option<u8> {
        match self {
            EngineId::Legacy => Some(0),
            EngineId::Lstm => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::UnknownEngine(s.to_string()));
        }
        Ok(match trimmed.to_lowercase().as_str() {
            "tesseract legacy" | "legacy" => EngineId::Legacy,
            "tesseract lstm" | "lstm" => EngineId::Lstm,
            "tesseract latest" | "latest" => EngineId::Latest,
            _ => EngineId::User(trimmed.to_string()),
        })
    }
}

/// Pages per engine, indexed by page number.
#[derive(Debug, Clone, Default)]
pub struct EngineStore {
    page_count: usize,
    engines: HashMap<EngineId, Vec<Option<OcrPage>>>,
    /// Pass rank of the page currently mirrored into `Latest`, per page.
    latest_rank: Vec<Option<u8>>,
}

impl EngineStore {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            engines: HashMap::new(),
            latest_rank: vec![None; page_count],
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Register `engine` with an empty page collection, replacing any
    /// existing one.
    pub(crate) fn init_engine(&mut self, engine: EngineId) {
        if engine == EngineId::Latest {
            self.latest_rank = vec![None; self.page_count];
        }
        self.engines.insert(engine, vec![None; self.page_count]);
    }

    /// Register `engine` unless it already exists.
    pub(crate) fn ensure_engine(&mut self, engine: &EngineId) {
        if !self.engines.contains_key(engine) {
            self.init_engine(engine.clone());
        }
    }

    pub fn contains(&self, engine: &EngineId) -> bool {
        self.engines.contains_key(engine)
    }

    pub fn engines(&self) -> impl Iterator<Item = &EngineId> {
        self.engines.keys()
    }

    /// Page `n` as produced by `engine`.
    pub fn page(&self, engine: &EngineId, n: usize) -> Option<&OcrPage> {
        self.engines.get(engine)?.get(n)?.as_ref()
    }

    /// All page slots for `engine`.
    pub fn pages(&self, engine: &EngineId) -> Option<&[Option<OcrPage>]> {
        self.engines.get(engine).map(|v| v.as_slice())
    }

    pub(crate) fn store(&mut self, engine: &EngineId, n: usize, page: OcrPage) -> Result<()> {
        if n >= self.page_count {
            return Err(Error::PageOutOfRange(n, self.page_count));
        }
        self.ensure_engine(engine);
        if let Some(slots) = self.engines.get_mut(engine) {
            slots[n] = Some(page);
        }
        Ok(())
    }

    /// Mirror a recognition-pass page into the `Latest` alias.
    ///
    /// Within one recognition run the alias holds the result of the highest
    /// pass merged so far: a later pass always replaces an earlier one and
    /// re-merging the same pass replaces it with the new copy. Arrival order
    /// between passes therefore does not change the final alias state.
    /// Returns whether the alias was updated.
    pub(crate) fn mirror_latest(&mut self, engine: &EngineId, n: usize, page: &OcrPage) -> bool {
        let Some(rank) = engine.pass_rank() else {
            return false;
        };
        if n >= self.page_count {
            return false;
        }
        if matches!(self.latest_rank[n], Some(current) if current > rank) {
            return false;
        }
        self.ensure_engine(&EngineId::Latest);
        if let Some(slots) = self.engines.get_mut(&EngineId::Latest) {
            slots[n] = Some(page.clone());
            self.latest_rank[n] = Some(rank);
        }
        true
    }

    /// Drop everything and resize for a newly loaded document.
    pub fn reset(&mut self, page_count: usize) {
        *self = Self::new(page_count);
    }
}
