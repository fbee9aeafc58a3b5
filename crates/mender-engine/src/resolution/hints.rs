//! Static knowledge about how common form fields are usually named.

use crate::selector::{attr_selector, id_selector, is_css_identifier, quote};
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Spelling variants folded onto one canonical purpose key.
    static ref ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for alias in ["e_mail", "mail", "email_address", "emailaddress", "user_email"] {
            m.insert(alias, "email");
        }
        for alias in ["pass", "passwd", "pwd", "current_password"] {
            m.insert(alias, "password");
        }
        for alias in ["user", "user_name", "login_name", "userid", "user_id"] {
            m.insert(alias, "username");
        }
        for alias in ["signin", "sign_in", "log_in", "logon"] {
            m.insert(alias, "login");
        }
        for alias in ["query", "q", "search_box", "searchbox", "find"] {
            m.insert(alias, "search");
        }
        for alias in ["send", "submit_button", "continue"] {
            m.insert(alias, "submit");
        }
        for alias in ["firstname", "fname", "given_name", "givenname"] {
            m.insert(alias, "first_name");
        }
        for alias in ["lastname", "lname", "surname", "family_name", "familyname"] {
            m.insert(alias, "last_name");
        }
        for alias in ["full_name", "fullname"] {
            m.insert(alias, "name");
        }
        for alias in ["telephone", "tel", "mobile", "phone_number", "phonenumber"] {
            m.insert(alias, "phone");
        }
        for alias in ["street", "address1", "address_line1", "street_address"] {
            m.insert(alias, "address");
        }
        for alias in ["town"] {
            m.insert(alias, "city");
        }
        for alias in ["zipcode", "zip_code", "postal_code", "postcode", "postalcode"] {
            m.insert(alias, "zip");
        }
        for alias in ["comment", "comments", "msg", "body"] {
            m.insert(alias, "message");
        }
        for alias in ["organization", "organisation", "company_name"] {
            m.insert(alias, "company");
        }
        for alias in ["password_confirm", "confirm", "repeat_password", "password2", "password_confirmation"] {
            m.insert(alias, "confirm_password");
        }
        m
    };

    /// Purpose -> ids commonly given to that field.
    static ref SEMANTIC_IDS: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("email", &["email", "user_email", "login-email", "emailAddress", "email-address", "userEmail", "login_email"]);
        m.insert("password", &["password", "user_password", "login-password", "pass", "passwd", "userPassword"]);
        m.insert("username", &["username", "user_name", "login", "user", "userName", "login-username"]);
        m.insert("search", &["search", "q", "query", "search-input", "searchInput", "search_query"]);
        m.insert("submit", &["submit", "submit-button", "submitBtn", "btn-submit", "send"]);
        m.insert("login", &["login", "login-button", "loginBtn", "signin", "sign-in", "btn-login"]);
        m.insert("first_name", &["first_name", "firstName", "first-name", "fname", "given-name"]);
        m.insert("last_name", &["last_name", "lastName", "last-name", "lname", "family-name"]);
        m.insert("name", &["name", "full_name", "fullName", "full-name"]);
        m.insert("phone", &["phone", "telephone", "tel", "phoneNumber", "phone_number", "mobile"]);
        m.insert("address", &["address", "street", "address1", "street-address", "addressLine1"]);
        m.insert("city", &["city", "town", "locality"]);
        m.insert("zip", &["zip", "zipcode", "postal_code", "postalCode", "postcode"]);
        m.insert("country", &["country", "country_code", "countryCode", "country-select"]);
        m.insert("message", &["message", "comment", "comments", "msg", "body"]);
        m.insert("company", &["company", "organization", "company_name", "companyName"]);
        m.insert("confirm_password", &["confirm_password", "confirmPassword", "password_confirm", "password-confirm", "password2"]);
        m
    };

    /// Intent -> alternative selectors tried while healing, most specific first.
    static ref SYNONYMS: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("email", &[
            r#"input[type="email"]"#,
            "#email",
            r#"input[name="email"]"#,
            r#"input[autocomplete="email"]"#,
            r#"input[autocomplete="username"][type="email"]"#,
            r#"input[name*="email" i]"#,
            r#"input[id*="email" i]"#,
            r#"input[placeholder*="email" i]"#,
        ]);
        m.insert("password", &[
            r#"input[type="password"]"#,
            "#password",
            r#"input[name="password"]"#,
            r#"input[autocomplete="current-password"]"#,
            r#"input[name*="pass" i]"#,
            r#"input[id*="pass" i]"#,
        ]);
        m.insert("username", &[
            "#username",
            r#"input[name="username"]"#,
            r#"input[autocomplete="username"]"#,
            r#"input[name*="user" i]"#,
            r#"input[id*="user" i]"#,
            r#"input[placeholder*="user" i]"#,
        ]);
        m.insert("search", &[
            r#"input[type="search"]"#,
            r#"[role="searchbox"]"#,
            r#"input[name="q"]"#,
            r#"input[name*="search" i]"#,
            r#"input[placeholder*="search" i]"#,
            r#"input[aria-label*="search" i]"#,
        ]);
        m.insert("submit", &[
            r#"button[type="submit"]"#,
            r#"input[type="submit"]"#,
            r#"form button:not([type="button"]):not([type="reset"])"#,
            r#"[role="button"][aria-label*="submit" i]"#,
        ]);
        m.insert("login", &[
            r#"button[type="submit"]"#,
            r#"input[type="submit"]"#,
            r#"button:has-text("log in")"#,
            r#"button:has-text("sign in")"#,
            r#"button:has-text("login")"#,
            r#"a:has-text("sign in")"#,
        ]);
        m.insert("phone", &[
            r#"input[type="tel"]"#,
            r#"input[autocomplete="tel"]"#,
            r#"input[name*="phone" i]"#,
            r#"input[id*="phone" i]"#,
        ]);
        m.insert("first_name", &[
            r#"input[autocomplete="given-name"]"#,
            r#"input[name*="first" i]"#,
            r#"input[id*="first" i]"#,
        ]);
        m.insert("last_name", &[
            r#"input[autocomplete="family-name"]"#,
            r#"input[name*="last" i]"#,
            r#"input[id*="last" i]"#,
        ]);
        m.insert("zip", &[
            r#"input[autocomplete="postal-code"]"#,
            r#"input[name*="zip" i]"#,
            r#"input[name*="postal" i]"#,
        ]);
        m.insert("country", &[
            r#"select[autocomplete="country"]"#,
            r#"select[name*="country" i]"#,
            r#"select[id*="country" i]"#,
        ]);
        m.insert("message", &[
            "textarea",
            r#"textarea[name*="message" i]"#,
            r#"textarea[name*="comment" i]"#,
        ]);
        m
    };
}

/// Fold a free-form hint onto a lookup key: lowercase, separators to `_`,
/// known aliases collapsed.
pub fn canonical_key(hint: &str) -> String {
    let key: String = hint
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let key = key
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    ALIASES
        .get(key.as_str())
        .map(|k| k.to_string())
        .unwrap_or(key)
}

/// `#id` selectors likely to belong to the field named by `purpose`.
pub fn semantic_ids(purpose: &str) -> Vec<String> {
    let key = canonical_key(purpose);
    if key.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<String> = SEMANTIC_IDS
        .get(key.as_str())
        .map(|ids| ids.iter().map(|id| id_selector(id)).collect())
        .unwrap_or_default();

    for raw in [purpose.trim(), key.as_str()] {
        if is_css_identifier(raw) {
            let sel = id_selector(raw);
            if !out.contains(&sel) {
                out.push(sel);
            }
        }
    }
    out
}

/// Healing alternatives for an action hint. Unknown hints get a generic
/// attribute-based list built from the hint itself.
pub fn synonyms(hint: &str) -> Vec<String> {
    let key = canonical_key(hint);
    if key.is_empty() {
        return Vec::new();
    }
    if let Some(list) = SYNONYMS.get(key.as_str()) {
        return list.iter().map(|s| s.to_string()).collect();
    }

    let mut out = Vec::new();
    if is_css_identifier(&key) {
        out.push(id_selector(&key));
    }
    for attr in ["name", "data-testid"] {
        out.push(attr_selector("", attr, &key));
    }
    let needle = quote(hint.trim());
    out.push(format!("[aria-label={} i]", needle));
    out.push(format!("[placeholder*={} i]", needle));
    out.push(format!("[id*={} i]", quote(&key)));
    out.push(format!("[name*={} i]", quote(&key)));
    out
}

/// Whether the key has a dedicated entry in the id table.
pub fn is_known_purpose(hint: &str) -> bool {
    SEMANTIC_IDS.contains_key(canonical_key(hint).as_str())
}

/// Words worth a substring match: the canonical key plus each word of at
/// least three characters.
pub fn keywords(hint: &str) -> Vec<String> {
    let key = canonical_key(hint);
    let mut out = Vec::new();
    if key.is_empty() {
        return out;
    }
    for word in std::iter::once(key.as_str()).chain(key.split('_')) {
        if word.chars().count() >= 3 && !out.iter().any(|w: &String| w == word) {
            out.push(word.to_string());
        }
    }
    out
}
