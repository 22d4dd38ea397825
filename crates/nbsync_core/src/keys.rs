//! Key naming for keystroke events and `specialKeys` mappings.

/// A key pressed in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Function key `F1`..`F12`.
    F(u8),
    Char(char),
}

/// Modifier state accompanying a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
    };

    fn any(self) -> bool {
        self.ctrl || self.shift || self.alt
    }
}

/// Wire name of a key: modifier letters `C`, `S`, `M` (in that order) and a
/// dash, then `F1`..`F12`, the printable ASCII character itself, or `X` for
/// anything else.
pub fn key_name(key: Key, mods: Modifiers) -> String {
    let base = match key {
        Key::F(n @ 1..=12) => format!("F{}", n),
        Key::Char(ch @ ' '..='~') => ch.to_string(),
        _ => "X".to_string(),
    };

    let mut name = String::with_capacity(base.len() + 4);
    if mods.ctrl {
        name.push('C');
    }
    if mods.shift {
        name.push('S');
    }
    if mods.alt {
        name.push('M');
    }
    if mods.any() {
        name.push('-');
    }
    name.push_str(&base);
    name
}

/// Split a `specialKeys` argument into host key names.
///
/// Each blank-separated token may carry a modifier prefix before a dash; the
/// prefix letters `A`, `M`, `C`, `S` each become `<letter>-`, other letters
/// are dropped. `"C-F2 SF3 CS-F4"` becomes `C-F2`, `SF3`, `C-S-F4`.
pub fn special_key_names(keys: &str) -> Vec<String> {
    keys.split(' ')
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('-') {
            Some((prefix, key)) => {
                let mut name = String::new();
                for letter in prefix.chars().filter(|c| matches!(c, 'A' | 'M' | 'C' | 'S')) {
                    name.push(letter);
                    name.push('-');
                }
                name.push_str(key);
                name
            }
            None => token.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_keys_are_named_directly() {
        assert_eq!(key_name(Key::F(5), Modifiers::NONE), "F5");
        assert_eq!(key_name(Key::Char('a'), Modifiers::NONE), "a");
        assert_eq!(key_name(Key::Char('\u{7f}'), Modifiers::NONE), "X");
        assert_eq!(key_name(Key::F(13), Modifiers::NONE), "X");
    }

    #[test]
    fn modifiers_prefix_in_fixed_order() {
        let all = Modifiers {
            ctrl: true,
            shift: true,
            alt: true,
        };
        assert_eq!(key_name(Key::F(2), all), "CSM-F2");
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        assert_eq!(key_name(Key::F(12), shift), "S-F12");
    }

    #[test]
    fn special_keys_normalise_modifier_prefixes() {
        assert_eq!(
            special_key_names("C-F2  SF3 CS-F4 AX-k"),
            vec!["C-F2", "SF3", "C-S-F4", "A-k"]
        );
        assert!(special_key_names("").is_empty());
    }
}
