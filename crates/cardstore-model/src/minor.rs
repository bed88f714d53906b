//! Free-form and configuration content that is not an entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalogue::{self, LINE_LISTS};
use crate::error::{ModelError, Result};
use crate::value::Scalar;

/// A block of input lines the reader could not classify, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLines {
    pub comment: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinorAttributes {
    options: BTreeMap<String, Scalar>,
    lines: BTreeMap<String, Vec<String>>,
    pub is_enddata: bool,
    pub reject_lines: Vec<RejectedLines>,
    /// Unparsed cards as field lists; `None` is a blank field.
    pub reject_cards: Vec<Vec<Option<String>>>,
}

impl MinorAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a declared option. The value must have the option's declared kind.
    pub fn set_option(&mut self, name: &str, value: impl Into<Scalar>) -> Result<()> {
        let value = value.into();
        match catalogue::minor_option(name) {
            Some(kind) if kind.accepts(&value) => {
                self.options.insert(name.to_string(), value);
                Ok(())
            }
            _ => Err(ModelError::UnknownOption {
                name: name.to_string(),
            }),
        }
    }

    pub fn option(&self, name: &str) -> Option<&Scalar> {
        self.options.get(name)
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Replace one of the verbatim line lists.
    pub fn set_lines(&mut self, name: &str, lines: Vec<String>) -> Result<()> {
        if !LINE_LISTS.contains(&name) {
            return Err(ModelError::UnknownList {
                name: name.to_string(),
            });
        }
        if lines.is_empty() {
            self.lines.remove(name);
        } else {
            self.lines.insert(name.to_string(), lines);
        }
        Ok(())
    }

    pub fn lines(&self, name: &str) -> &[String] {
        self.lines.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn line_lists(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.lines.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
