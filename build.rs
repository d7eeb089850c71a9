//! Warns early when a Windows build has no hint for locating FFmpeg.
//!
//! `ffmpeg-sys-next` does the actual discovery (pkg-config elsewhere).

const LOCATION_HINTS: [&str; 2] = ["FFMPEG_DIR", "VCPKG_ROOT"];

fn main() {
    for hint in LOCATION_HINTS {
        println!("cargo:rerun-if-env-changed={hint}");
    }

    let targets_windows = std::env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    let has_hint = LOCATION_HINTS
        .iter()
        .any(|hint| std::env::var_os(hint).is_some());

    if targets_windows && !has_hint {
        println!(
            "cargo:warning=framewalk needs FFmpeg development files; set FFMPEG_DIR or VCPKG_ROOT"
        );
    }
}
