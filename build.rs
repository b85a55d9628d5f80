fn main() {
    // Cores call the log callback with C varargs, which Rust cannot define.
    println!("cargo:rerun-if-changed=csrc/jg_log.c");
    cc::Build::new()
        .file("csrc/jg_log.c")
        .warnings(true)
        .compile("jglog");
}
