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

/// A CPU level that kernels can be compiled for.
pub struct Level {
    pub name: &'static str,
    pub arch: &'static str,
    pub features: &'static [&'static str],
}

pub const LEVELS: &[Level] = &[
    Level {
        name: "v4",
        arch: "x86_64",
        features: &[
            "avx512bw", "avx512cd", "avx512dq", "avx512vl", // simd
            "bmi1", "bmi2", "lzcnt", "movbe", "popcnt", // bit-operations
        ],
    },
    Level {
        name: "v3",
        arch: "x86_64",
        features: &[
            "avx2", "f16c", "fma", // simd
            "bmi1", "bmi2", "lzcnt", "movbe", "popcnt", // bit-operations
        ],
    },
    Level {
        name: "v2",
        arch: "x86_64",
        features: &[
            "sse4.2", // simd
            "popcnt", // bit-operations
        ],
    },
    Level {
        name: "a2",
        arch: "aarch64",
        features: &[
            "neon", // simd
        ],
    },
];

pub fn find(name: &str) -> &'static Level {
    LEVELS
        .iter()
        .find(|level| level.name == name)
        .unwrap_or_else(|| panic!("unknown cpu level `{name}`"))
}
