/// Company-form tokens dropped from the end of a payee name.
const LEGAL_SUFFIXES: &[&str] = &["SA", "SAS", "SARL", "PLC", "LTD", "GMBH"];

/// Upper-cases the first letter of every run of letters and lower-cases the
/// rest. Any non-letter starts a new run, so `M&S` stays `M&S` and
/// `ROMAIN.S` becomes `Romain.S`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the text has no lower-case letter.
pub fn is_upper(s: &str) -> bool {
    !s.chars().any(char::is_lowercase)
}

/// Drops trailing company-form tokens (`SA`, `PLC`…) as long as a name remains.
pub fn strip_legal_suffix(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1].trim_end_matches('.');
        if !LEGAL_SUFFIXES.iter().any(|sfx| sfx.eq_ignore_ascii_case(last)) {
            break;
        }
        tokens.pop();
    }
    tokens.join(" ")
}

/// `Some(trimmed)` unless the text is blank.
pub fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
