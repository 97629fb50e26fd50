use colored::*;

// Colors are dropped under test so assertions can compare plain text
fn paint(str: &str, style: fn(String) -> ColoredString) -> String {
    if cfg!(test) {
        return normal_string(str);
    }

    style(String::from(str)).to_string()
}

pub fn green_string(str: &str) -> String {
    paint(str, |s| s.green())
}

pub fn red_string(str: &str) -> String {
    paint(str, |s| s.red())
}

pub fn cyan_string(str: &str) -> String {
    paint(str, |s| s.bright_cyan())
}

pub fn yellow_string(str: &str) -> String {
    paint(str, |s| s.yellow())
}

pub fn debug_string(str: &str) -> String {
    paint(str, |s| s.bright_blue().on_yellow())
}

pub fn normal_string(str: &str) -> String {
    String::from(str).normal().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn colors_are_plain_in_tests() {
        assert_eq!(green_string("✓"), "✓");
        assert_eq!(cyan_string("Europe/Paris"), "Europe/Paris");
        assert_eq!(debug_string("=== DEBUG ==="), "=== DEBUG ===");
    }
}
