//! Fuzz target for tracks JSON parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use linecount::input::tracks_json::from_tracks_json_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_tracks_json_slice(data);
});
