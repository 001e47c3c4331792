//! Strip the common leading-whitespace margin from a block of text.
//!
//! Migration SQL is often embedded in indented string literals; dedenting
//! before execution keeps driver-reported positions meaningful.

/// Remove the longest common leading-whitespace prefix from every line.
///
/// Tabs and spaces are treated as opaque characters: a tab margin and a
/// space margin have no common prefix. Lines containing only whitespace are
/// normalized to empty and do not participate in the margin computation.
pub(crate) fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.lines() {
        let rest = line.trim_start_matches([' ', '\t']);
        if rest.is_empty() {
            continue;
        }
        let indent = &line[..line.len() - rest.len()];
        match margin {
            None => margin = Some(indent),
            Some(m) if indent.starts_with(m) => {}
            Some(m) if m.starts_with(indent) => margin = Some(indent),
            Some(_) => {
                margin = Some("");
                break;
            }
        }
    }
    let margin = margin.unwrap_or("");

    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.trim_start_matches([' ', '\t']).is_empty() {
            continue;
        }
        out.push_str(line.strip_prefix(margin).unwrap_or(line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::dedent;

    #[test]
    fn strips_a_common_space_margin() {
        let text = "    CREATE TABLE teams (\n      id integer\n    );";
        assert_eq!(dedent(text), "CREATE TABLE teams (\n  id integer\n);");
    }

    #[test]
    fn strips_a_tab_margin() {
        assert_eq!(dedent("\tSELECT 1;\n\tSELECT 2;"), "SELECT 1;\nSELECT 2;");
    }

    #[test]
    fn keeps_text_without_a_margin() {
        assert_eq!(dedent("SELECT 1;\n  SELECT 2;"), "SELECT 1;\n  SELECT 2;");
    }

    #[test]
    fn mixed_tab_and_space_margins_cancel() {
        assert_eq!(dedent("\tSELECT 1;\n  SELECT 2;"), "\tSELECT 1;\n  SELECT 2;");
    }

    #[test]
    fn whitespace_only_lines_are_blanked() {
        let text = "  SELECT 1;\n   \t\n  SELECT 2;";
        assert_eq!(dedent(text), "SELECT 1;\n\nSELECT 2;");
    }

    #[test]
    fn narrower_indent_shrinks_the_margin() {
        let text = "    SELECT 1;\n  SELECT 2;";
        assert_eq!(dedent(text), "  SELECT 1;\nSELECT 2;");
    }
}
