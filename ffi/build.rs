use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string()));
    println!("cargo:rerun-if-changed=src");

    // Header generation is best effort; the library builds without it.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FLEETOPS_H")
        .generate()
    {
        Ok(bindings) => {
            let include = crate_dir.join("include");
            if let Err(e) = std::fs::create_dir_all(&include) {
                println!("cargo:warning=cannot create {}: {e}", include.display());
                return;
            }
            bindings.write_to_file(include.join("fleetops.h"));
        }
        Err(e) => println!("cargo:warning=cbindgen: {e}"),
    }
}
