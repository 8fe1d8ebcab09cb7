//! The in-page extraction script.
//!
//! Evaluated atomically in the page after the stability window. It gathers
//! every interactive candidate, applies geometry and computed-style
//! filtering in-page (cheap, no round trips), and returns one JSON string
//! in the shape [`crate::payload::RawPage`] deserializes.

/// Maximum characters of visible text the script emits per element before
/// truncating with `"..."`.
pub const SCRIPT_TEXT_LIMIT: usize = 100;

/// How far outside the viewport (in px) an element may sit before it is
/// dropped from the candidate set.
pub const VIEWPORT_SLACK_PX: f64 = 100.0;

pub const PAGE_EXTRACT_SCRIPT: &str = r#"
(() => {
  const TEXT_LIMIT = 100;
  const VIEWPORT_SLACK = 100;
  const INTERACTIVE_ROLES = [
    'button', 'link', 'checkbox', 'radio', 'textbox', 'combobox', 'listbox',
    'option', 'menuitem', 'tab', 'switch', 'slider', 'spinbutton', 'searchbox'
  ];

  const selectors = [
    'a[href]',
    'button',
    'input:not([type="hidden"])',
    'select',
    'textarea',
    INTERACTIVE_ROLES.map(r => '[role="' + r + '"]').join(','),
    '[tabindex]',
    '[onclick]',
    'summary',
    'details',
    'label[for]'
  ].join(',');

  const truncate = (s) => {
    s = (s || '').replace(/\s+/g, ' ').trim();
    return s.length > TEXT_LIMIT ? s.slice(0, TEXT_LIMIT) + '...' : s;
  };

  const cssPath = (el) => {
    if (el.id) return '#' + el.id;
    let path = el.tagName.toLowerCase();
    if (el.name) path += '[name="' + el.name + '"]';
    else if (el.classList.length > 0) path += '.' + el.classList[0];
    if (el.type) path += '[type="' + el.type + '"]';
    return path;
  };

  const viewportW = window.innerWidth;
  const viewportH = window.innerHeight;
  const seen = new Set();
  const out = [];

  for (const el of document.querySelectorAll(selectors)) {
    if (seen.has(el)) continue;
    seen.add(el);

    const tabindex = el.getAttribute('tabindex');
    if (tabindex !== null && parseInt(tabindex, 10) < 0 &&
        !el.matches('a[href],button,input,select,textarea,[onclick]')) {
      continue;
    }

    const rect = el.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) continue;
    if (rect.right < -VIEWPORT_SLACK || rect.bottom < -VIEWPORT_SLACK ||
        rect.left > viewportW + VIEWPORT_SLACK ||
        rect.top > viewportH + VIEWPORT_SLACK) {
      continue;
    }

    const style = window.getComputedStyle(el);
    const styleOk = style.display !== 'none' &&
      style.visibility !== 'hidden' &&
      parseFloat(style.opacity || '1') >= 0.1 &&
      style.pointerEvents !== 'none';
    if (!styleOk) continue;

    out.push({
      tag: el.tagName.toLowerCase(),
      role: el.getAttribute('role') || '',
      text: truncate(el.innerText || el.textContent || ''),
      inputType: el.tagName === 'INPUT' ? (el.type || 'text') : null,
      href: el.getAttribute('href'),
      placeholder: el.getAttribute('placeholder'),
      value: ('value' in el) ? String(el.value).slice(0, 200) : null,
      ariaLabel: el.getAttribute('aria-label'),
      bounds: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
      visible: true,
      enabled: !el.disabled,
      focusable: el.tabIndex >= 0,
      interactive: true,
      selector: cssPath(el),
      backendNodeId: null
    });
  }

  return JSON.stringify({
    url: window.location.href,
    title: document.title,
    scroll: {
      pixelsFromTop: Math.round(window.scrollY),
      totalHeight: Math.round(document.documentElement.scrollHeight),
      viewportHeight: viewportH
    },
    elements: out
  });
})()
"#;
