//! Fuzz target for StateTable index conversion.
//!
//! Builds a layout from fuzzed domain sizes and checks that index and
//! assignment conversions agree for fuzzed indices.

#![no_main]

use arbitrary::Arbitrary;
use clue_common::Value;
use clue_core::{StateTable, TableLayout};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    cards: Vec<u8>,
    indices: Vec<u16>,
}

fuzz_target!(|input: Input| {
    let vars = input.cards.iter().take(6).enumerate().map(|(i, &card)| {
        let domain = (0..(card % 5) as i64).map(Value::Int).collect::<Vec<_>>();
        (format!("V{}", i), domain)
    });
    let Ok(layout) = TableLayout::new(vars) else {
        return;
    };
    let mut table = StateTable::new(layout.clone(), 0u32);
    for &raw in &input.indices {
        let index = raw as usize;
        match layout.assignment_at(index) {
            Ok(assignment) => {
                assert!(index < layout.size());
                assert_eq!(layout.index_of(&assignment).ok(), Some(index));
                if let Ok(cell) = table.get_mut(&assignment) {
                    *cell += 1;
                }
            }
            Err(_) => assert!(index >= layout.size()),
        }
    }
});
