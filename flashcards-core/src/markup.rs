use regex::Regex;
use std::sync::OnceLock;

struct Rules {
    sup_group: Regex,
    sup_char: Regex,
    sub_group: Regex,
    sub_char: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        sup_group: Regex::new(r"\^\{([^}]+)\}").expect("valid regex"),
        sup_char: Regex::new(r"\^(.)").expect("valid regex"),
        sub_group: Regex::new(r"_\{([^}]+)\}").expect("valid regex"),
        sub_char: Regex::new(r"_(.)").expect("valid regex"),
    })
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render card text as HTML with `^`/`_` markers turned into
/// superscript/subscript spans.
///
/// Escaping runs first so substitutions only ever see escaped text.
pub fn render(raw: &str) -> String {
    let r = rules();
    let html = escape_html(raw);
    let html = r
        .sup_group
        .replace_all(&html, r#"<sup class="superscript">$1</sup>"#);
    let html = r
        .sup_char
        .replace_all(&html, r#"<sup class="superscript">$1</sup>"#);
    let html = r
        .sub_group
        .replace_all(&html, r#"<sub class="subscript">$1</sub>"#);
    let html = r
        .sub_char
        .replace_all(&html, r#"<sub class="subscript">$1</sub>"#);
    html.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_char_superscript() {
        assert_eq!(render("x^2"), r#"x<sup class="superscript">2</sup>"#);
    }

    #[test]
    fn grouped_superscript() {
        assert!(render("x^{-5}").contains(r#"<sup class="superscript">-5</sup>"#));
    }

    #[test]
    fn subscripts() {
        assert_eq!(
            render("H_2O"),
            r#"H<sub class="subscript">2</sub>O"#
        );
        assert_eq!(
            render("a_{ij}"),
            r#"a<sub class="subscript">ij</sub>"#
        );
    }

    #[test]
    fn trailing_marker_is_literal() {
        assert_eq!(render("x^"), "x^");
        assert_eq!(render("y_"), "y_");
    }

    #[test]
    fn multiple_markers_convert_independently() {
        let out = render("e^x + x_1 + 10^{3}");
        assert_eq!(out.matches("<sup").count(), 2);
        assert_eq!(out.matches("<sub").count(), 1);
    }

    #[test]
    fn script_tags_are_escaped() {
        let out = render("a<script>alert(1)</script>^{<script>}");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }
}
