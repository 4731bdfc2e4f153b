//! Output mode shared by all subcommands.

use serde::Serialize;

pub const RULE: &str = "============================================================";

/// Set to `1` by `main` for `--json` and cleared otherwise.
pub const JSON_ENV: &str = "STEELQA_JSON";

/// `--json` was passed.
pub fn is_json() -> bool {
    json_flag(std::env::var(JSON_ENV).ok().as_deref())
}

fn json_flag(value: Option<&str>) -> bool {
    value == Some("1")
}

/// Pretty-print `value` to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Error: cannot encode JSON output: {e}"),
    }
}

/// Print a banner framed by horizontal rules.
pub fn banner(title: &str) {
    println!("{RULE}");
    println!("{title}");
    println!("{RULE}");
}
