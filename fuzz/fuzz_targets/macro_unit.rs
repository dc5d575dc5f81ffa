#![no_main]

use libfuzzer_sys::fuzz_target;
use macroscope::{file::io::Endian, MacroConfig, MacroSection};

fuzz_target!(|data: &[u8]| {
    for endian in [Endian::Little, Endian::Big] {
        for config in [MacroConfig::strict(), MacroConfig::compatible()] {
            let section = MacroSection::new(data)
                .with_endian(endian)
                .with_config(config);
            for context in section.units().flatten() {
                let _ = context.header_fields();
                for operation in context.operations().flatten() {
                    for value in operation.values() {
                        let _ = value;
                    }
                }
            }
        }
    }
});
