//! External tool availability checks.

use std::process::Command;

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check pdftoppm availability, returning a hint message if missing.
pub fn check_pdftoppm_hint() -> Option<String> {
    if check_binary("pdftoppm") {
        None
    } else {
        Some("pdftoppm not installed. Install with: apt install poppler-utils".to_string())
    }
}

/// Availability of every external tool the pipeline shells out to.
pub fn check_tools() -> Vec<(String, bool)> {
    ["tesseract", "pdftoppm"]
        .iter()
        .map(|tool| (tool.to_string(), check_binary(tool)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tools() {
        let tools = check_tools();
        assert_eq!(tools.len(), 2);
        for (tool, available) in tools {
            println!("{}: {}", tool, if available { "found" } else { "missing" });
        }
    }

    #[test]
    fn missing_binary() {
        assert!(!check_binary("definitely-not-a-real-binary-xyz"));
    }
}
