use crate::action::Action;

/// Tag appended to every type string the library derives on its own.
pub const LIBRARY_TAG: &str = "@SMD";

/// Type of the action a store dispatches once on construction.
pub const INIT: &str = "@@SMD/INIT";

/// Anything that names an action type: an action itself or a bare type string.
pub trait ActionKind {
    fn action_kind(&self) -> &str;
}

impl ActionKind for str {
    fn action_kind(&self) -> &str {
        self
    }
}

impl ActionKind for String {
    fn action_kind(&self) -> &str {
        self
    }
}

impl ActionKind for Action {
    fn action_kind(&self) -> &str {
        self.kind()
    }
}

/// Type of the action dispatched when the given wrapped action finished.
///
/// ```
/// assert_eq!(smd::completed("COUNTER_INCREMENT"), "COUNTER_INCREMENT@SMD/COMPLETED");
/// ```
pub fn completed<K: ActionKind + ?Sized>(action: &K) -> String {
    format!("{}{LIBRARY_TAG}/COMPLETED", action.action_kind())
}

/// Type of the action dispatched when the given wrapped action failed.
pub fn error<K: ActionKind + ?Sized>(action: &K) -> String {
    format!("{}{LIBRARY_TAG}/ERROR", action.action_kind())
}

pub(crate) fn reserved(prefix: &str, name: &str) -> String {
    format!("{prefix}{LIBRARY_TAG}/{name}")
}

/// Converts a human readable name into SCREAMING_SNAKE_CASE.
///
/// Words are split on anything that is not alphanumeric, on a lower case
/// letter or digit followed by an upper case letter, and before the last
/// capital of an upper case run that is followed by a lower case letter.
/// Returns `None` when the name has no word characters at all.
pub fn screaming_snake(name: &str) -> Option<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let boundary = c.is_uppercase()
                && (prev.is_lowercase()
                    || prev.is_numeric()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_uppercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}
