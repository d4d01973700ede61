//! Generates codecs for every schema under `schema/` into `OUT_DIR`.

use std::path::PathBuf;

const SCHEMAS: &[&str] = &[
    "scenarios",
    "keys",
    "counters",
    "limits",
    "records",
    "times",
    "stamps",
    "layout",
    "conversions",
    "omission",
    "bounded",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    println!("cargo:rerun-if-changed=schema");

    let mut config = packgen_codegen::Config::new();
    config.strict(true).emit_tests(true);
    for name in SCHEMAS {
        let input = PathBuf::from("schema").join(format!("{name}.rs"));
        println!("cargo:rerun-if-changed={}", input.display());
        config.compile(&input, &out_dir)?;
    }
    Ok(())
}
