//! Fuzz target for model.json parsing.
//!
//! Parsing, validation and mixture construction must reject bad input with
//! an error, never a panic.

#![no_main]

use gm_config::{validate_model, ModelFile};
use gm_math::MixtureModel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(file) = serde_json::from_slice::<ModelFile>(data) else {
        return;
    };
    if validate_model(&file).is_err() {
        return;
    }
    let tolerance = file.tolerance();
    let _ = MixtureModel::with_tolerance(
        file.symbols,
        file.p_w_given_z,
        file.p_z_given_c,
        file.p_c,
        tolerance,
    );
});
