//! KISS fuzz target: unwrap must not panic on arbitrary bytes, and wrapping then
//! unwrapping arbitrary payloads must give them back.
//! Build with: cargo fuzz run kiss_unwrap_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use genproto::{FramingWrapper, KissWrapper};

    let _ = KissWrapper.unwrap(data);
    assert_eq!(KissWrapper.unwrap(&KissWrapper.wrap(data)), data);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run kiss_unwrap_fuzz");
}
