//! Build script for strand-runtime
//!
//! Merges configuration defaults:
//! 1. Start with library defaults
//! 2. If STRAND_CONFIG_RS is set, parse that file's `pub const` lines
//! 3. User values win over defaults
//! 4. Write OUT_DIR/strand_defaults.rs
//!
//! The user file only needs the values it wants to change.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "CONTEXT_STACK_SIZE",
        rust_type: "usize",
        default_value: "256 * 1024",
    },
    ConfigParam {
        name: "THREAD_STACK_SIZE",
        rust_type: "usize",
        default_value: "0", // platform default
    },
    ConfigParam {
        name: "DEBUG_LOGGING",
        rust_type: "bool",
        default_value: "false",
    },
];

fn main() {
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => dir,
        Err(_) => panic!("OUT_DIR not set"),
    };
    let dest_path = Path::new(&out_dir).join("strand_defaults.rs");

    let mut config: HashMap<&'static str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("STRAND_CONFIG_RS").ok();
    if let Some(path) = &user_path {
        println!("cargo:rerun-if-changed={}", path);
        match fs::read_to_string(path) {
            Ok(content) => {
                merge_user_config(&content, &mut config);
                println!("cargo:warning=Using custom strand config: {}", path);
            }
            Err(e) => {
                println!("cargo:warning=Failed to read STRAND_CONFIG_RS ({}): {}", path, e);
            }
        }
    }
    println!("cargo:rerun-if-env-changed=STRAND_CONFIG_RS");

    let output = render(&config, user_path.is_some());
    if let Err(e) = fs::write(&dest_path, output) {
        panic!("failed to write {}: {}", dest_path.display(), e);
    }
}

/// Merge known `pub const NAME: TYPE = VALUE;` lines into `config`
fn merge_user_config(content: &str, config: &mut HashMap<&'static str, String>) {
    for line in content.lines().map(str::trim) {
        if line.starts_with("//") {
            continue;
        }
        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };
        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => println!("cargo:warning=Unknown strand config parameter: {}", name),
        }
    }
}

/// Split `pub const NAME: TYPE = VALUE;` into (NAME, VALUE)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();
    let (name, rest) = rest.split_once(':')?;
    let (_, value) = rest.split_once('=')?;
    let value = value.trim().trim_end_matches(';').trim();
    if value.is_empty() {
        return None;
    }
    Some((name.trim().to_string(), value.to_string()))
}

fn render(config: &HashMap<&'static str, String>, from_user: bool) -> String {
    let mut output = String::from("// Auto-generated by build.rs - do not edit\n");
    if from_user {
        output.push_str("// Library defaults merged with STRAND_CONFIG_RS\n");
    }
    output.push('\n');

    for param in CONFIG_PARAMS {
        let value = config
            .get(param.name)
            .map(String::as_str)
            .unwrap_or(param.default_value);
        output.push_str(&format!(
            "pub const {}: {} = {};\n",
            param.name, param.rust_type, value
        ));
    }
    output
}
