//! Fuzz target for tracks CSV parsing.
//!
//! Feeds arbitrary bytes to the tracks CSV reader, checking for panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use linecount::input::tracks_csv::from_tracks_csv_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_tracks_csv_slice(data);
});
