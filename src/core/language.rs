use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    /// Single-letter form used in ourcommons.ca URLs.
    pub fn letter(self) -> &'static str {
        match self {
            Self::En => "E",
            Self::Fr => "F",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        if lowered.starts_with("fr") {
            Ok(Self::Fr)
        } else if lowered.starts_with("en") {
            Ok(Self::En)
        } else {
            Err(format!("unsupported language: {value}"))
        }
    }
}
