use crate::{color, config::Config};

// Print a debug statement if in verbose mode
pub fn maybe_print(config: &Config, text: String) {
    if config.verbose.unwrap_or_default() {
        print(text)
    }
}

// Print a debug statement
pub fn print(text: String) {
    println!("{}", render(&text));
}

fn render(text: &str) -> String {
    color::debug_string(&format!("=== DEBUG ===\n{text}\n==="))
}
