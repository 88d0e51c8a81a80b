//! Fuzz target for the input completeness scanner
//!
//! # Invariants
//!
//! - Never panics on any text
//! - Classifying the buffer equals classifying the joined text

#![no_main]

use arbitrary::Arbitrary;
use civ7_core::{InputAnalyzer, analyze, classify};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    lines: Vec<String>,
}

fuzz_target!(|input: Input| {
    let mut analyzer = InputAnalyzer::new();
    for line in &input.lines {
        analyzer.push_line(line.as_str());
    }

    let joined = input.lines.join("\n");
    assert_eq!(analyzer.text(), joined);
    assert_eq!(analyzer.classify(), classify(&joined));
    assert_eq!(analyzer.analyze(), analyze(&joined));
});
