use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute used to hand an element resolved in-page back to CDP.
pub const TARGET_ATTR: &str = "data-dbd-target";

/// A way of finding an element on the live page.
///
/// Patterns are JavaScript regular expressions, matched case-insensitively
/// as substrings, so `Role { name: "Accept" }` also hits "Accept all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    Css { selector: String },
    Role { role: String, name: String },
    Text { pattern: String },
    Label { pattern: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(pattern: impl Into<String>) -> Self {
        Locator::Text {
            pattern: pattern.into(),
        }
    }

    pub fn label(pattern: impl Into<String>) -> Self {
        Locator::Label {
            pattern: pattern.into(),
        }
    }

    /// Locator for literal text, with regex metacharacters escaped.
    pub fn literal_text(text: &str) -> Self {
        Locator::text(regex::escape(text))
    }

    fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Expression evaluating to whether the first match exists and is visible.
    pub fn visible_script(&self) -> String {
        format!(
            "(() => {{ {RESOLVER} const el = __dbdResolve({})[0]; return __dbdVisible(el); }})()",
            self.to_json()
        )
    }

    /// Expression that tags the first visible match with [`TARGET_ATTR`].
    pub fn mark_script(&self) -> String {
        format!(
            "(() => {{ {RESOLVER} \
             document.querySelectorAll('[{TARGET_ATTR}]').forEach(e => e.removeAttribute('{TARGET_ATTR}')); \
             const el = __dbdResolve({})[0]; \
             if (!__dbdVisible(el)) return false; \
             el.setAttribute('{TARGET_ATTR}', '1'); \
             el.scrollIntoView({{ block: 'center' }}); \
             return true; }})()",
            self.to_json()
        )
    }

    /// Expression that tags the first link (or the first match itself) below
    /// the first match of this locator.
    pub fn mark_link_within_script(&self) -> String {
        format!(
            "(() => {{ {RESOLVER} \
             document.querySelectorAll('[{TARGET_ATTR}]').forEach(e => e.removeAttribute('{TARGET_ATTR}')); \
             const root = __dbdResolve({})[0]; \
             if (!root) return false; \
             const link = root.matches('a, [role=\"link\"]') ? root : root.querySelector('a, [role=\"link\"]'); \
             if (!__dbdVisible(link)) return false; \
             link.setAttribute('{TARGET_ATTR}', '1'); \
             link.scrollIntoView({{ block: 'center' }}); \
             return true; }})()",
            self.to_json()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => write!(f, "css={selector}"),
            Locator::Role { role, name } => write!(f, "role={role}[name~/{name}/i]"),
            Locator::Text { pattern } => write!(f, "text~/{pattern}/i"),
            Locator::Label { pattern } => write!(f, "label~/{pattern}/i"),
        }
    }
}

/// In-page resolver shared by every locator script.
const RESOLVER: &str = r#"
const __dbdVisible = (el) => {
  if (!el || !el.isConnected) return false;
  const s = window.getComputedStyle(el);
  if (s.visibility === 'hidden' || s.display === 'none') return false;
  return el.getClientRects().length > 0;
};
const __dbdRe = (p) => { try { return new RegExp(p, 'i'); } catch (_) { return null; } };
const __dbdAll = (sel, root) => { try { return Array.from((root || document).querySelectorAll(sel)); } catch (_) { return []; } };
const __dbdName = (el) => (el.getAttribute('aria-label') || el.innerText || el.textContent || el.value || '').trim();
const __dbdRoles = {
  button: 'button, [role="button"], input[type="button"], input[type="submit"]',
  link: 'a[href], [role="link"]',
  tab: '[role="tab"]',
  option: 'option, [role="option"]',
};
const __dbdResolve = (loc) => {
  if (!loc) return [];
  switch (loc.kind) {
    case 'css':
      return __dbdAll(loc.selector);
    case 'role': {
      const re = __dbdRe(loc.name);
      if (!re) return [];
      return __dbdAll(__dbdRoles[loc.role] || `[role="${loc.role}"]`).filter(el => re.test(__dbdName(el)));
    }
    case 'text': {
      const re = __dbdRe(loc.pattern);
      if (!re || !document.body) return [];
      const out = [];
      const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
      let n;
      while ((n = walker.nextNode())) {
        const p = n.parentElement;
        if (p && re.test(n.textContent || '') && !out.includes(p)
            && p.tagName !== 'SCRIPT' && p.tagName !== 'STYLE') out.push(p);
      }
      return out;
    }
    case 'label': {
      const re = __dbdRe(loc.pattern);
      if (!re) return [];
      const out = [];
      for (const lab of __dbdAll('label')) {
        if (!re.test(lab.textContent || '')) continue;
        const c = lab.control || (lab.htmlFor && document.getElementById(lab.htmlFor));
        if (c) out.push(c);
      }
      for (const el of __dbdAll('input[aria-label], textarea[aria-label]')) {
        if (re.test(el.getAttribute('aria-label') || '') && !out.includes(el)) out.push(el);
      }
      return out;
    }
  }
  return [];
};
"#;
