// CLASSIFICATION: COMMUNITY
// Filename: build.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-10-18

fn main() {
    use std::{env, fs, path::PathBuf};

    println!("cargo:rerun-if-env-changed=SOCKET_PAL_MAX_SOCKETS");

    let max_sockets = match env::var("SOCKET_PAL_MAX_SOCKETS") {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                println!("cargo:warning=invalid SOCKET_PAL_MAX_SOCKETS={raw:?}; using 16");
                16
            }
        },
        Err(_) => 16,
    };

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR set by cargo"));
    let limits = format!(
        "/// Number of sockets the registry can track at once.\n\
         pub const SOCKETS_MAX_COUNT: usize = {max_sockets};\n"
    );
    fs::write(out_dir.join("limits.rs"), limits).expect("write limits.rs");
}
