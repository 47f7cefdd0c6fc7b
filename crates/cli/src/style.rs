//! Terminal styling for the publish and validate summaries.

use console::Style;

/// Line for a finished publish or a written config, prefixed with a green `✓`.
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Line for a skipped publish or a missing token, prefixed with a yellow `⚠`.
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Fatal error line printed before a non-zero exit.
pub fn fail(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Bold section title, e.g. `Configuration summary:`.
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Secondary detail under a summary line (asset sizes, replace counts).
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// `set` / `NOT SET` for secrets in summaries.
pub fn presence(value: Option<&str>) -> String {
    match value {
        Some(_) => Style::new().green().apply_to("set").to_string(),
        None => Style::new().red().apply_to("NOT SET").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_keep_message_and_marker() {
        assert!(success("Release 'nightly' created").contains("Release 'nightly' created"));
        assert!(success("x").contains('✓'));
        assert!(warn("Skipping publish").contains('⚠'));
        assert!(fail("Error: boom").contains("Error: boom"));
        assert!(dim("1 replaced, 0 stale removed").contains("1 replaced"));
        assert!(presence(None).contains("NOT SET"));
        assert!(!presence(Some("t")).contains("NOT"));
    }
}
