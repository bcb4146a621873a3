//! Backend option strings.
//!
//! Pipelines accept FFmpeg options as a single string of `key=value` pairs
//! separated by `:`, e.g. `"crf=18:preset=slow"`. Parsing follows FFmpeg's
//! token rules: a backslash escapes the next character and single quotes
//! protect a run of characters, so separators can appear inside values
//! (`"vf=scale\:640"`).

use std::ffi::CString;
use std::ptr;

use ffmpeg_next::{Dictionary, Error as FfmpegError};

use crate::error::PumpError;

/// Parsed backend options with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    entries: Vec<(String, String)>,
}

impl BackendOptions {
    /// An empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value:key=value` option string with FFmpeg's own
    /// dictionary parser.
    ///
    /// An empty string yields an empty option set. When a key repeats, the
    /// last value wins.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::InvalidOptions`] if a pair has no `=`, a key is
    /// empty, or the string contains a NUL byte.
    ///
    /// # Example
    ///
    /// ```
    /// use framepump::BackendOptions;
    ///
    /// let options = BackendOptions::parse("crf=18:preset=slow")?;
    /// assert_eq!(options.get("preset"), Some("slow"));
    /// # Ok::<(), framepump::PumpError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, PumpError> {
        let c_text = CString::new(text)
            .map_err(|_| PumpError::InvalidOptions(format!("NUL byte in {text:?}")))?;

        let mut raw = ptr::null_mut();
        let code = unsafe {
            ffmpeg_sys_next::av_dict_parse_string(
                &mut raw,
                c_text.as_ptr(),
                c"=".as_ptr(),
                c":".as_ptr(),
                0,
            )
        };
        // Owning the dictionary frees whatever was parsed before a failure.
        let dictionary = unsafe { Dictionary::own(raw) };
        if code < 0 {
            return Err(PumpError::InvalidOptions(format!(
                "{text:?}: {}",
                FfmpegError::from(code)
            )));
        }

        let entries = dictionary
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Ok(Self { entries })
    }

    /// Add or replace an option.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
        self
    }

    /// Look up the value of an option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no options are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build a fresh FFmpeg dictionary.
    ///
    /// Each FFmpeg open step consumes the entries it recognises, so every
    /// step gets its own copy.
    pub(crate) fn to_dictionary(&self) -> Dictionary<'static> {
        let mut dictionary = Dictionary::new();
        for (key, value) in &self.entries {
            dictionary.set(key, value);
        }
        dictionary
    }
}
