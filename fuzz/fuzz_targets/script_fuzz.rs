//! Compiler fuzz target: feed arbitrary bytes to the script compiler.
//! It must not panic; it should return Ok(main) or a CompileError, reporting
//! at most one diagnostic.
//! Build with: cargo fuzz run script_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let registry = bitscript::Registry::builtin();
    let mut diags: Vec<bitscript::Diagnostic> = Vec::new();
    let _ = bitscript::compile_reader("<fuzz>", data, &registry, &mut diags);
    assert!(diags.len() <= 1);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run script_fuzz");
}
