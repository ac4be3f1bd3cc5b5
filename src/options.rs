// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Environment variable holding the options as a TOML document.
pub const OPTIONS_VARIABLE: &str = "DNNL_OPTIONS";

/// What a call does when the backend has no plan for its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Report the error to the caller.
    #[default]
    Error,
    /// Compute the result in f32 instead.
    FullPrecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AccelOptions {
    #[serde(default = "AccelOptions::default_fallback")]
    pub fallback: FallbackPolicy,
    #[serde(default = "AccelOptions::default_threads")]
    #[validate(range(min = 1, max = 256))]
    pub threads: u32,
    #[serde(default = "AccelOptions::default_max_scratch_bytes")]
    #[validate(range(min = 1))]
    pub max_scratch_bytes: u64,
}

impl AccelOptions {
    fn default_fallback() -> FallbackPolicy {
        FallbackPolicy::Error
    }
    fn default_threads() -> u32 {
        1
    }
    fn default_max_scratch_bytes() -> u64 {
        1 << 30
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let options = toml::from_str::<Self>(s).map_err(|e| Error::Options(e.to_string()))?;
        options
            .validate()
            .map_err(|e| Error::Options(e.to_string()))?;
        Ok(options)
    }

    pub fn from_env() -> Result<Self, Error> {
        match std::env::var_os(OPTIONS_VARIABLE) {
            None => Ok(Self::default()),
            Some(value) => match value.to_str() {
                Some(s) => Self::parse(s),
                None => Err(Error::Options(format!("{OPTIONS_VARIABLE} is not UTF-8"))),
            },
        }
    }
}

impl Default for AccelOptions {
    fn default() -> Self {
        Self {
            fallback: Self::default_fallback(),
            threads: Self::default_threads(),
            max_scratch_bytes: Self::default_max_scratch_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(AccelOptions::parse(""), Ok(AccelOptions::default()));
    }

    #[test]
    fn fields_are_parsed() {
        let options = AccelOptions::parse(
            r#"
            fallback = "full_precision"
            threads = 8
            max_scratch_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(options.fallback, FallbackPolicy::FullPrecision);
        assert_eq!(options.threads, 8);
        assert_eq!(options.max_scratch_bytes, 4096);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        for s in [
            "threads = 0",
            "threads = 257",
            "max_scratch_bytes = 0",
            "fallback = \"never\"",
            "unknown = 1",
            "threads = ",
        ] {
            assert!(
                matches!(AccelOptions::parse(s), Err(Error::Options(_))),
                "accepted {s:?}"
            );
        }
    }
}
