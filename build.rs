fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // The APFS role and container entry points live in a private framework.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
        println!("cargo:rustc-link-search=framework=/System/Library/PrivateFrameworks");
        println!("cargo:rustc-link-lib=framework=APFS");
    }
}
