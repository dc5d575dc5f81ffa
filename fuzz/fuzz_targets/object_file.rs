#![no_main]

use libfuzzer_sys::fuzz_target;
use macroscope::File;

fuzz_target!(|data: &[u8]| {
    if let Ok(file) = File::from_mem(data.to_vec()) {
        if let Some(section) = file.macro_section() {
            for context in section.units().flatten() {
                let _ = context.measure_ops();
            }
        }
    }
});
