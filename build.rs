use std::env;
use std::process::Command;
use time::OffsetDateTime;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let build_year = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .map(|dt| dt.year())
        .unwrap_or_else(|| OffsetDateTime::now_utc().year());
    println!("cargo:rustc-env=APP_BUILD_YEAR={build_year}");

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    // Tagged release: plain version. Otherwise: version-dev+<short hash>
    let tagged = git(&["describe", "--tags", "--exact-match"])
        .is_some_and(|tag| tag == format!("v{version}"));
    let display_version = if tagged {
        version
    } else {
        match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) => format!("{version}-dev+{hash}"),
            None => format!("{version}-dev"),
        }
    };

    println!("cargo:rustc-env=APP_VERSION_DISPLAY={display_version}");
}
