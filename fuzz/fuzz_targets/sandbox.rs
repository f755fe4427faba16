#![no_main]

use libfuzzer_sys::fuzz_target;
use classpatch::{
    rewrite::RedirectionRequest,
    sandbox::{ExecutionLimits, Sandbox},
};

fuzz_target!(|data: &[u8]| {
    let limits = ExecutionLimits { max_instructions: 100_000, ..ExecutionLimits::default() };
    let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
    let _ = Sandbox::with_limits(limits).execute(data, &request);
});
