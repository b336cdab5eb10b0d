//! Markup rendering for script references.

/// MIME type emitted on every rendered script tag.
pub const SCRIPT_TYPE: &str = "text/javascript";

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attribute(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for ch in input.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

/// Render an external `<script>` element loading `src`.
pub fn script_tag(src: &str) -> String {
  format!(
    "<script type=\"{SCRIPT_TYPE}\" src=\"{}\"></script>",
    escape_attribute(src)
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_plain_urls_untouched() {
    assert_eq!(
      script_tag("/js/app.js"),
      r#"<script type="text/javascript" src="/js/app.js"></script>"#
    );
  }

  #[test]
  fn escapes_query_separators_and_quotes() {
    assert_eq!(
      script_tag("/app.js?a=1&b=\"2\""),
      r#"<script type="text/javascript" src="/app.js?a=1&amp;b=&quot;2&quot;"></script>"#
    );
  }

  #[test]
  fn escapes_markup_breakouts() {
    let escaped = escape_attribute("x'><script>");
    assert_eq!(escaped, "x&#39;&gt;&lt;script&gt;");
  }
}
