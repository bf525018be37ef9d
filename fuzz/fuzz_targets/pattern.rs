//! Fuzz target for path template compilation.
//!
//! A template that compiles must match itself with every placeholder
//! replaced by a word value, yielding the placeholders in order.

#![no_main]

use libfuzzer_sys::fuzz_target;
use waymark_core::PathPattern;

fuzz_target!(|template: &str| {
    if template.len() > 1000 {
        return;
    }
    let Ok(pattern) = PathPattern::compile(template) else {
        return;
    };

    let mut concrete = pattern.path().to_string();
    for name in pattern.names() {
        concrete = concrete.replacen(&format!("{{{}}}", name), "v1", 1);
    }

    if let Some(params) = pattern.captures(&concrete) {
        assert_eq!(params.len(), pattern.names().len());
        assert!(params.iter().all(|(_, value)| value == "v1"));
    }
});
