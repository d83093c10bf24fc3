pub fn run(quiet: bool) {
    println!("{}", version_line(quiet));
}

fn version_line(quiet: bool) -> String {
    let version = env!("CARGO_PKG_VERSION");
    if quiet {
        version.to_string()
    } else {
        format!("{} {}", env!("CARGO_PKG_NAME"), version)
    }
}
