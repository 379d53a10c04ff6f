#![no_main]
use genius_core::builder::{BuildOptions, fragment_from_trace};
use genius_core::interpolate::interpolate;
use genius_core::{AnalysisResult, parse_trace};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(trace) = parse_trace(data) else {
        return;
    };
    let Ok(fragment) = fragment_from_trace(trace, BuildOptions::default()) else {
        return;
    };
    // Analysis lines may carry arbitrary keys, so decoding can still fail.
    let Ok(result) = AnalysisResult::from_fragment(fragment) else {
        return;
    };
    if let Some(map) = &result.progress {
        for q in [0.0, 0.25, 0.5, 1.0] {
            let _ = interpolate(map.points(), q);
        }
    }
});
