//! Embeds the application icon into the Windows executables with `winres`.
//! Other targets, and checkouts without the icon, build without it.

use std::path::Path;

const ICON: &str = "assets/handson.ico";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={ICON}");

    let is_windows = std::env::var("CARGO_CFG_TARGET_OS")
        .map(|os| os == "windows")
        .unwrap_or(false);
    if !is_windows || !Path::new(ICON).exists() {
        return;
    }

    let mut res = winres::WindowsResource::new();
    res.set_icon(ICON);
    res.compile()
        .expect("Failed to compile Windows resources with winres");
}
