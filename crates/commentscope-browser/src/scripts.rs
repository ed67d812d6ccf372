//! JavaScript snippets evaluated in the page.
//!
//! Selectors are embedded as JSON string literals, never spliced raw. Every
//! snippet returns a concrete value so results can be read back by value.

use commentscope_core::page::ElementQuery;

/// `__queryAll(root, selector)`: CSS by default, XPath for `xpath=`, `//`,
/// `(//` and `./` prefixes
const QUERY_ALL: &str = r#"
const __queryAll = (root, selector) => {
  const isXPath = selector.startsWith('xpath=') || selector.startsWith('//')
    || selector.startsWith('(//') || selector.startsWith('./');
  if (isXPath) {
    const expr = selector.startsWith('xpath=') ? selector.slice(6) : selector;
    const snapshot = document.evaluate(expr, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    const nodes = [];
    for (let i = 0; i < snapshot.snapshotLength; i++) nodes.push(snapshot.snapshotItem(i));
    return nodes;
  }
  return Array.from(root.querySelectorAll(selector));
};
const __isVisible = (el) => !el.disabled && (el.offsetParent !== null || el.getClientRects().length > 0);
"#;

fn wrap(body: &str) -> String {
    format!("(() => {{\n{}\n{}\n}})()", QUERY_ALL, body)
}

fn literal(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

pub fn count(selector: &str) -> String {
    wrap(&format!(
        "return __queryAll(document, {}).length;",
        literal(selector)
    ))
}

pub fn click_first_visible(selector: &str) -> String {
    wrap(&format!(
        r#"const el = __queryAll(document, {}).find(__isVisible);
if (!el) return false;
el.scrollIntoView({{ block: 'center' }});
el.click();
return true;"#,
        literal(selector)
    ))
}

pub fn scroll_to_bottom() -> String {
    wrap("window.scrollTo(0, document.body.scrollHeight);\nreturn document.body.scrollHeight;")
}

pub fn extract(query: &ElementQuery) -> String {
    let spec = serde_json::to_value(query).unwrap_or_default();
    wrap(&format!(
        r#"const spec = {};
return __queryAll(document, spec.container).map((el) => {{
  const row = {{}};
  for (const field of spec.fields) {{
    const target = field.selector ? __queryAll(el, field.selector)[0] : el;
    if (!target) {{ row[field.name] = null; continue; }}
    const value = field.source.kind === 'text'
      ? (target.innerText ?? target.textContent)
      : target.getAttribute(field.source.name);
    row[field.name] = value == null ? null : String(value).trim();
  }}
  return row;
}});"#,
        spec
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_escaped() {
        let script = count(r#"a[href*="/in/"]"#);
        assert!(script.contains(r#"__queryAll(document, "a[href*=\"/in/\"]").length"#));
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn test_click_script_checks_visibility() {
        let script = click_first_visible("button.more");
        assert!(script.contains(r#".find(__isVisible)"#));
        assert!(script.contains("el.click();"));
    }

    #[test]
    fn test_extract_embeds_query_spec() {
        let query = ElementQuery::new("article").attr("id", None, "data-id");
        let script = extract(&query);
        assert!(script.contains(r#""container":"article""#));
        assert!(script.contains(r#""kind":"attribute""#));
    }
}
