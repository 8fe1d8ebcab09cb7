//! Tag-to-role inference tables.
//!
//! The DOM extraction is authoritative for structure; when a node carries no
//! explicit role the fixed table below supplies one, and the listing format
//! omits roles the tag already implies.

/// ARIA roles treated as interactive during extraction and fusion.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "textbox",
    "combobox",
    "listbox",
    "option",
    "menuitem",
    "tab",
    "switch",
    "slider",
    "spinbutton",
    "searchbox",
];

/// Infer a role from tag (and input type) when the page declares none.
pub fn infer_role(tag: &str, input_type: Option<&str>) -> &'static str {
    match tag {
        "a" => "link",
        "button" => "button",
        "select" => "combobox",
        "textarea" => "textbox",
        "input" => match input_type.unwrap_or("text") {
            "checkbox" => "checkbox",
            "radio" => "radio",
            "button" | "submit" | "reset" | "image" => "button",
            _ => "textbox",
        },
        "summary" | "details" => "button",
        "label" => "button",
        _ => "generic",
    }
}

/// The role a tag implies on its own; listings omit these.
pub fn implied_role(tag: &str) -> Option<&'static str> {
    match tag {
        "a" => Some("link"),
        "button" => Some("button"),
        "input" => Some("textbox"),
        "select" => Some("combobox"),
        "textarea" => Some("textbox"),
        _ => None,
    }
}

/// Whether a role string names an interactive widget.
pub fn is_interactive_role(role: &str) -> bool {
    INTERACTIVE_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_input_roles_by_type() {
        assert_eq!(infer_role("input", Some("checkbox")), "checkbox");
        assert_eq!(infer_role("input", Some("radio")), "radio");
        assert_eq!(infer_role("input", Some("submit")), "button");
        assert_eq!(infer_role("input", Some("email")), "textbox");
        assert_eq!(infer_role("input", None), "textbox");
    }

    #[test]
    fn infers_tag_roles() {
        assert_eq!(infer_role("a", None), "link");
        assert_eq!(infer_role("button", None), "button");
        assert_eq!(infer_role("select", None), "combobox");
        assert_eq!(infer_role("textarea", None), "textbox");
        assert_eq!(infer_role("div", None), "generic");
    }

    #[test]
    fn implied_roles_match_listing_omission_rules() {
        assert_eq!(implied_role("a"), Some("link"));
        assert_eq!(implied_role("input"), Some("textbox"));
        assert_eq!(implied_role("div"), None);
    }

    #[test]
    fn interactive_role_membership() {
        assert!(is_interactive_role("button"));
        assert!(is_interactive_role("searchbox"));
        assert!(!is_interactive_role("presentation"));
    }
}
