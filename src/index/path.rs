/// Normalize a document path: runs of `\` or the legacy `!` separator become
/// a single `/`, and surrounding whitespace is trimmed.
pub fn fix_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_separator = false;
    for c in path.chars() {
        if c == '\\' || c == '!' {
            if !in_separator {
                out.push('/');
                in_separator = true;
            }
        } else {
            out.push(c);
            in_separator = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_slashes_untouched() {
        assert_eq!(fix_path("docs/2024/case.json"), "docs/2024/case.json");
    }

    #[test]
    fn test_legacy_separators() {
        assert_eq!(fix_path("docs\\2024\\case.json"), "docs/2024/case.json");
        assert_eq!(fix_path("docs!2024!case.json"), "docs/2024/case.json");
        assert_eq!(fix_path("docs\\!2024!!case.json"), "docs/2024/case.json");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(fix_path("  docs/case.json \n"), "docs/case.json");
    }
}
