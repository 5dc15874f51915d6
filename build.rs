use std::process::Command;

fn main() {
    let now = chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string();
    println!("cargo:rustc-env=MOVE_DRAG_BUILD_DATE={}", now);

    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=MOVE_DRAG_GIT_COMMIT={}", commit);

    println!("cargo:rerun-if-changed=.git/HEAD");
}
