//! Colored console output for patch logs.

use owo_colors::OwoColorize;
use shinyrom::PatchLog;
use shinyrom::patch::{FAILURE_PREFIX, SUCCESS_PREFIX, WARNING_PREFIX};

pub fn print_log(log: &PatchLog) {
    for line in log.lines() {
        println!("{}", colorize(line));
    }
}

fn colorize(line: &str) -> String {
    if line.starts_with(SUCCESS_PREFIX) {
        line.green().to_string()
    } else if line.starts_with(WARNING_PREFIX) {
        line.yellow().to_string()
    } else if line.starts_with(FAILURE_PREFIX) {
        line.red().to_string()
    } else if line.starts_with("==") {
        line.bold().to_string()
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_lines_are_plain() {
        assert_eq!(colorize("[*] Opened NDS container"), "[*] Opened NDS container");
    }

    #[test]
    fn test_status_lines_keep_text() {
        for line in ["[+] BPEE patched", "[!] Skipped 0x10", "[-] Failed"] {
            let colored = colorize(line);
            assert_ne!(colored, line);
            assert!(colored.contains(line));
        }
    }
}
