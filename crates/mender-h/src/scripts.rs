//! Page-side scripts. Each builder returns a self-contained expression;
//! arguments are embedded as JSON literals.

use mender_common::protocol::ActionKind;

/// Installs `window.__mender`: a registry handing out stable numeric ids
/// for elements, held weakly so the page can still collect them.
const REGISTRY: &str = r#"
if (!window.__mender) {
  const ids = new WeakMap();
  const refs = new Map();
  let next = 1;
  window.__mender = {
    handle(el) {
      let id = ids.get(el);
      if (!id) {
        id = next++;
        ids.set(el, id);
        refs.set(id, new WeakRef(el));
      }
      return id;
    },
    get(id) {
      const ref = refs.get(id);
      const el = ref && ref.deref();
      return el && el.isConnected ? el : null;
    },
  };
}
"#;

fn json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn wrap(body: &str) -> String {
    format!("(() => {{ {} {} }})()", REGISTRY, body)
}

/// `[id, ...]` or `{ error }` for a bad selector.
pub fn query(selector: &str) -> String {
    wrap(&format!(
        r#"try {{
  return Array.from(document.querySelectorAll({sel})).map(el => window.__mender.handle(el));
}} catch (e) {{
  return {{ error: String(e && e.message || e) }};
}}"#,
        sel = json(selector)
    ))
}

/// `true`/`false`, or `null` when the handle is stale.
pub fn visibility(id: u32) -> String {
    wrap(&format!(
        r#"const el = window.__mender.get({id});
if (!el) return null;
if (el.tagName === 'INPUT' && (el.type || '').toLowerCase() === 'hidden') return false;
const style = window.getComputedStyle(el);
if (style.display === 'none' || style.visibility === 'hidden' || style.visibility === 'collapse') return false;
if (el.closest('[hidden]')) return false;
const rect = el.getBoundingClientRect();
return rect.width > 0 && rect.height > 0;"#,
        id = id
    ))
}

/// `{ ok: true }` or `{ error }`.
pub fn act(id: u32, kind: ActionKind, value: Option<&str>) -> String {
    wrap(&format!(
        r#"const el = window.__mender.get({id});
const kind = {kind};
const value = {value};
if (!el) return {{ error: 'stale' }};
if (el.disabled || el.getAttribute('aria-disabled') === 'true') return {{ error: 'element is disabled' }};
el.scrollIntoView({{ block: 'center', inline: 'center' }});
const fire = (name) => el.dispatchEvent(new Event(name, {{ bubbles: true }}));
switch (kind) {{
  case 'click':
    el.click();
    return {{ ok: true }};
  case 'fill': {{
    if (el.readOnly) return {{ error: 'element is read-only' }};
    el.focus();
    if (el.isContentEditable) {{
      el.textContent = value;
    }} else if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) {{
      const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
      Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, value);
    }} else {{
      return {{ error: 'element cannot be filled' }};
    }}
    fire('input');
    fire('change');
    return {{ ok: true }};
  }}
  case 'select': {{
    if (!(el instanceof HTMLSelectElement)) return {{ error: 'element is not a select' }};
    const opt = Array.from(el.options).find(o => o.value === value || o.text.trim() === value);
    if (!opt) return {{ error: 'no option ' + value }};
    el.value = opt.value;
    fire('input');
    fire('change');
    return {{ ok: true }};
  }}
  case 'check': {{
    const type = (el.type || '').toLowerCase();
    if (el instanceof HTMLInputElement && (type === 'checkbox' || type === 'radio')) {{
      if (!el.checked) el.click();
      return el.checked ? {{ ok: true }} : {{ error: 'element did not become checked' }};
    }}
    const role = el.getAttribute('role');
    if (['checkbox', 'radio', 'switch'].includes(role)) {{
      if (el.getAttribute('aria-checked') !== 'true') el.click();
      return {{ ok: true }};
    }}
    return {{ error: 'element is not checkable' }};
  }}
}}
return {{ error: 'unknown action ' + kind }};"#,
        id = id,
        kind = json(kind.as_str()),
        value = json(&value),
    ))
}

/// `{ tag, attributes, text, parent, nthOfType }` or `null` when stale.
pub fn describe(id: u32) -> String {
    wrap(&format!(
        r#"const el = window.__mender.get({id});
if (!el) return null;
const attributes = {{}};
for (const a of el.attributes) attributes[a.name] = a.value;
let nth = 1;
for (let s = el.previousElementSibling; s; s = s.previousElementSibling) {{
  if (s.tagName === el.tagName) nth++;
}}
const parent = el.parentElement ? window.__mender.handle(el.parentElement) : null;
return {{
  tag: el.tagName.toLowerCase(),
  attributes,
  text: (el.innerText || el.textContent || '').trim(),
  parent,
  nthOfType: nth,
}};"#,
        id = id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_embeds_selector_as_json() {
        let script = query(r#"input[name="a'b"]"#);
        assert!(script.contains(r#"querySelectorAll("input[name=\"a'b\"]")"#));
        assert!(script.starts_with("(() => {"));
    }

    #[test]
    fn test_act_embeds_kind_and_value() {
        let script = act(7, ActionKind::Fill, Some("x@y.com"));
        assert!(script.contains("window.__mender.get(7)"));
        assert!(script.contains(r#"const kind = "fill";"#));
        assert!(script.contains(r#"const value = "x@y.com";"#));

        let script = act(7, ActionKind::Click, None);
        assert!(script.contains("const value = null;"));
    }
}
