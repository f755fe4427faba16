#![no_main]

use libfuzzer_sys::fuzz_target;
use classpatch::ClassFile;

fuzz_target!(|data: &[u8]| {
    let _ = ClassFile::parse(data.to_vec());
});
