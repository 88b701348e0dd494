fn main() {
    println!(
        "cargo:rustc-env=APP_VERSION={}",
        std::env::var("CARGO_PKG_VERSION").unwrap_or_default()
    );

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let mut res = winres::WindowsResource::new();
    res.set("FileDescription", "DisplayBrightness");
    res.set("ProductName", "DisplayBrightness");
    if std::path::Path::new("icon.ico").exists() {
        res.set_icon("icon.ico");
    }
    if let Err(e) = res.compile() {
        println!("cargo:warning=resource compilation skipped: {}", e);
    }
}
