//! Fuzz target for the frame loop.
//!
//! Whatever parses as tracks JSON is replayed through a default counter.
//! Positions may be huge or negative; the counter must not
//! panic and the inventory must stay equal to IN minus OUT.

#![no_main]

use libfuzzer_sys::fuzz_target;
use linecount::input::fuzz_replay_tracks_json;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(inventory) = fuzz_replay_tracks_json(data) else {
        return;
    };
    for row in inventory.classes {
        assert_eq!(row.inventory, row.in_count as i64 - row.out_count as i64);
    }
});
