//! Build script for tcm-diag
//!
//! Stamps the binary with the embedded knowledge base version and the usual
//! build identification (commit, UTC build time, profile).

use std::fs;
use std::process::Command;

const KNOWLEDGE_BASE_PATH: &str = "data/knowledge_base.toml";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", KNOWLEDGE_BASE_PATH);

    println!("cargo:rustc-env=BUILD_KNOWLEDGE_VERSION={}", knowledge_version());
    println!("cargo:rustc-env=GIT_HASH={}", git_hash());
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!(
        "cargo:rustc-env=BUILD_PROFILE={}",
        std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}

/// `version` key of the shipped knowledge base
fn knowledge_version() -> String {
    let version = fs::read_to_string(KNOWLEDGE_BASE_PATH)
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .and_then(|table| table.get("version")?.as_str().map(str::to_string));

    match version {
        Some(version) => version,
        None => {
            println!(
                "cargo:warning=could not read version from {}",
                KNOWLEDGE_BASE_PATH
            );
            "unknown".to_string()
        }
    }
}

fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
