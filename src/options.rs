//! Conversion and recognition options.

use crate::engine::EngineId;

/// Options for converting raw OCR data.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Honor italic markup/font names from the engine
    pub keep_italic: bool,

    /// The data was written by this library (hOCR carries extra attributes)
    pub scribe_mode: bool,
}

impl ConvertOptions {
    /// Create new convert options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Honor italic signals in the input.
    pub fn with_keep_italic(mut self, keep: bool) -> Self {
        self.keep_italic = keep;
        self
    }

    /// Mark the input as written by this library.
    pub fn scribe_mode(mut self) -> Self {
        self.scribe_mode = true;
        self
    }
}

/// Which recognition passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSelection {
    pub legacy: bool,
    pub lstm: bool,
}

impl PassSelection {
    pub fn new(legacy: bool, lstm: bool) -> Self {
        Self { legacy, lstm }
    }

    /// Both passes (legacy first).
    pub fn both() -> Self {
        Self::new(true, true)
    }

    pub fn legacy_only() -> Self {
        Self::new(true, false)
    }

    pub fn lstm_only() -> Self {
        Self::new(false, true)
    }

    pub fn is_empty(&self) -> bool {
        !self.legacy && !self.lstm
    }

    /// Engine for the first pass.
    pub fn pass_a(&self) -> Option<EngineId> {
        if self.legacy {
            Some(EngineId::Legacy)
        } else if self.lstm {
            Some(EngineId::Lstm)
        } else {
            None
        }
    }

    /// Engine for the second pass, only when both are requested.
    pub fn pass_b(&self) -> Option<EngineId> {
        if self.legacy && self.lstm {
            Some(EngineId::Lstm)
        } else {
            None
        }
    }

    /// Engine selected for display once recognition finishes.
    pub fn final_engine(&self) -> Option<EngineId> {
        if self.lstm {
            Some(EngineId::Lstm)
        } else if self.legacy {
            Some(EngineId::Legacy)
        } else {
            None
        }
    }
}

impl Default for PassSelection {
    fn default() -> Self {
        Self::both()
    }
}

/// Options for a recognition run.
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    /// Passes to run
    pub passes: PassSelection,

    /// Upscale images before recognition
    pub upscale: bool,

    /// Capture debug visualizations from the recognizer
    pub debug_vis: bool,

    /// Recognition languages (Tesseract codes)
    pub langs: Vec<String>,

    /// Use stock engine settings
    pub vanilla_mode: bool,

    /// Honor italic signals in the recognizer's output
    pub keep_italic: bool,
}

impl RecognizeOptions {
    /// Create new recognize options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passes(mut self, passes: PassSelection) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_upscale(mut self, upscale: bool) -> Self {
        self.upscale = upscale;
        self
    }

    pub fn with_debug_vis(mut self, debug_vis: bool) -> Self {
        self.debug_vis = debug_vis;
        self
    }

    pub fn with_langs<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.langs = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn vanilla(mut self) -> Self {
        self.vanilla_mode = true;
        self
    }

    pub fn with_keep_italic(mut self, keep: bool) -> Self {
        self.keep_italic = keep;
        self
    }
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            passes: PassSelection::both(),
            upscale: false,
            debug_vis: false,
            langs: vec!["eng".to_string()],
            vanilla_mode: false,
            keep_italic: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_selection() {
        let both = PassSelection::both();
        assert_eq!(both.pass_a(), Some(EngineId::Legacy));
        assert_eq!(both.pass_b(), Some(EngineId::Lstm));
        assert_eq!(both.final_engine(), Some(EngineId::Lstm));

        let lstm = PassSelection::lstm_only();
        assert_eq!(lstm.pass_a(), Some(EngineId::Lstm));
        assert_eq!(lstm.pass_b(), None);

        let legacy = PassSelection::legacy_only();
        assert_eq!(legacy.final_engine(), Some(EngineId::Legacy));

        assert!(PassSelection::new(false, false).is_empty());
        assert_eq!(PassSelection::new(false, false).pass_a(), None);
    }

    #[test]
    fn test_recognize_options_builder() {
        let options = RecognizeOptions::new()
            .with_passes(PassSelection::legacy_only())
            .with_debug_vis(true)
            .with_langs(["eng", "rus"])
            .vanilla();

        assert_eq!(options.passes, PassSelection::legacy_only());
        assert!(options.debug_vis);
        assert_eq!(options.langs, vec!["eng".to_string(), "rus".to_string()]);
        assert!(options.vanilla_mode);
        assert!(!options.upscale);
    }

    #[test]
    fn test_convert_options_builder() {
        let options = ConvertOptions::new().with_keep_italic(true).scribe_mode();
        assert!(options.keep_italic);
        assert!(options.scribe_mode);
        assert!(!ConvertOptions::default().keep_italic);
    }
}
