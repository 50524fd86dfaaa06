// Sipkip firmware - Build Script
//
// Stamps the version string and embeds the memory-resident clip table.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Directory scanned for `<name>.opus` + `<name>.opus_packets` pairs.
const CLIP_DIR: &str = "assets/clips";

fn main() {
    // ESP-IDF environment setup (MUST be first on the device target)
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    // Track partition file changes
    println!("cargo:rerun-if-changed=partitions.csv");

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING=Sipkip v{}-g{}", version, git_hash);

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let table = generate_clip_table(Path::new(CLIP_DIR));
    fs::write(out_dir.join("embedded_clips.rs"), table).expect("failed to write clip table");

    // Rebuild if clip assets change
    println!("cargo:rerun-if-changed={}", CLIP_DIR);

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// Emit `EMBEDDED_CLIPS`, one entry per clip that has its packets side-file.
fn generate_clip_table(dir: &Path) -> String {
    if !dir.is_dir() {
        println!(
            "cargo:warning={} not found; the image carries no embedded clips",
            dir.display()
        );
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter_map(|n| n.strip_suffix(".opus").map(str::to_string))
                .filter(|stem| dir.join(format!("{stem}.opus_packets")).is_file())
                .collect()
        })
        .unwrap_or_default();
    names.sort();

    let mut out = String::from("pub static EMBEDDED_CLIPS: &[Clip] = &[\n");
    for name in &names {
        let data = fs::canonicalize(dir.join(format!("{name}.opus"))).expect("clip path");
        let packets = fs::canonicalize(dir.join(format!("{name}.opus_packets"))).expect("packets path");
        let _ = writeln!(
            out,
            "    Clip {{ name: {:?}, data: include_bytes!({:?}), packets: include_bytes!({:?}) }},",
            name, data, packets
        );
    }
    out.push_str("];\n");
    out
}
