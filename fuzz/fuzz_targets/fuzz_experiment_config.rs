//! Fuzz target for experiment configuration parsing.
//!
//! Parsing and validating arbitrary JSON must return errors, never panic.

#![no_main]

use clue_config::validate::validate_experiment;
use clue_config::ExperimentConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ExperimentConfig::from_json_str(text) {
        let _ = validate_experiment(&config);
        let _ = config.run_seed(config.panels.len(), config.runs);
    }
});
