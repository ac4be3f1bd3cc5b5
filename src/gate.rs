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

use std::ffi::{OsStr, OsString};
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable that switches the accelerated path on when it is
/// exactly `1`.
pub const ENABLE_VARIABLE: &str = "DNNL_ENABLE";

const UNKNOWN: u8 = 0;
const ENABLED: u8 = 1;
const DISABLED: u8 = 2;

/// Decides once whether the accelerated path is used.
///
/// The toggle is read on the first call to [`FeatureGate::is_enabled`] and
/// the decision never changes afterwards, even if the variable does.
pub struct FeatureGate {
    state: AtomicU8,
    source: fn() -> Option<OsString>,
}

impl FeatureGate {
    pub const fn new(source: fn() -> Option<OsString>) -> Self {
        Self {
            state: AtomicU8::new(UNKNOWN),
            source,
        }
    }

    pub const fn from_env() -> Self {
        fn read() -> Option<OsString> {
            std::env::var_os(ENABLE_VARIABLE)
        }
        Self::new(read)
    }

    pub fn is_enabled(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            ENABLED => true,
            DISABLED => false,
            _ => {
                let value = (self.source)();
                let decided = if value.as_deref() == Some(OsStr::new("1")) {
                    ENABLED
                } else {
                    DISABLED
                };
                match self.state.compare_exchange(
                    UNKNOWN,
                    decided,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => decided == ENABLED,
                    Err(current) => current == ENABLED,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn only_exactly_one_enables() {
        let cases: [(fn() -> Option<OsString>, bool); 5] = [
            (|| Some("1".into()), true),
            (|| Some("true".into()), false),
            (|| Some(" 1".into()), false),
            (|| Some("".into()), false),
            (|| None, false),
        ];
        for (source, expected) in cases {
            assert_eq!(FeatureGate::new(source).is_enabled(), expected);
        }
    }

    #[test]
    fn decision_is_cached() {
        static VALUE: AtomicBool = AtomicBool::new(true);
        fn source() -> Option<OsString> {
            VALUE.load(Ordering::Relaxed).then(|| "1".into())
        }
        let gate = FeatureGate::new(source);
        assert!(gate.is_enabled());
        VALUE.store(false, Ordering::Relaxed);
        for _ in 0..4 {
            assert!(gate.is_enabled());
        }
        assert!(!FeatureGate::new(source).is_enabled());
    }
}
