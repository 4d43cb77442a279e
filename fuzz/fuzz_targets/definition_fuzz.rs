//! Definition fuzz target: arbitrary text through the parser and schema loader.
//! Loading must not panic; any definition that loads must also encode a record
//! against an empty model.
//! Build with: cargo fuzz run definition_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use genproto::{BindingCache, Bindings, MemoryModel};

    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let def = match genproto::load_protocol_str(s) {
        Ok(d) => d,
        Err(_) => return,
    };
    let mut model = MemoryModel::new();
    let mut cache = BindingCache::new();
    let mut bindings = Bindings::new(&mut model, &mut cache);
    if let Some(schema) = &def.output {
        let _ = schema.codec().encode(schema.chunks(), &mut bindings);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run definition_fuzz");
}
