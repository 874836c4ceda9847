use std::fs;
use std::path::PathBuf;

fn main() {
    let manifest_dir =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
    let version_path = manifest_dir
        .ancestors()
        .nth(2)
        .expect("crate lives under <root>/crates/")
        .join("VERSION");

    println!("cargo:rerun-if-changed={}", version_path.display());

    let version = fs::read_to_string(&version_path)
        .map(|raw| raw.trim().to_string())
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_path.display()));
    if version.is_empty() {
        panic!("{} must contain a non-empty version", version_path.display());
    }

    println!("cargo:rustc-env=GALLERY_GUARD_VERSION={version}");
}
