use crate::Modifiers;

// Central list of recognized keys and their portable codes. The macro
// keeps the enum, code lookup, and name lookup in one place.
macro_rules! keys {
    ( $( $name:ident = $code:literal ),* $(,)? ) => {
        /// A recognized key, identified by a portable numeric code.
        ///
        /// Covers the modifier keys (generic plus left/right variants),
        /// letters, digits, function keys, and a small extended set of
        /// editing and navigation keys. Platform raw codes are mapped
        /// to and from this space by a [`crate::KeyMap`].
        #[repr(u16)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub enum Key {
            $(
                #[allow(missing_docs)]
                $name = $code,
            )*
        }

        impl Key {
            /// Look up a key by its portable numeric code.
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$name), )*
                    _ => None,
                }
            }

            /// The canonical variant name, e.g. `"PageUp"`.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name), )*
                }
            }

            /// Case-insensitive lookup by variant name.
            pub fn from_name(s: &str) -> Option<Self> {
                $(
                    if s.eq_ignore_ascii_case(stringify!($name)) {
                        return Some(Self::$name);
                    }
                )*
                None
            }
        }
    };
}

keys! {
    // Modifier keys. Generic and left/right variants are distinct keys
    // on the wire but collapse to one modifier bit for matching.
    Meta = 0x01,
    MetaLeft = 0x02,
    MetaRight = 0x03,
    Ctrl = 0x04,
    CtrlLeft = 0x05,
    CtrlRight = 0x06,
    Alt = 0x07,
    AltLeft = 0x08,
    AltRight = 0x09,
    Shift = 0x0A,
    ShiftLeft = 0x0B,
    ShiftRight = 0x0C,

    // Editing and navigation.
    Backspace = 0x10,
    Tab = 0x11,
    Return = 0x12,
    Escape = 0x13,
    Space = 0x14,
    ForwardDelete = 0x15,
    Insert = 0x16,
    Home = 0x17,
    End = 0x18,
    PageUp = 0x19,
    PageDown = 0x1A,
    LeftArrow = 0x1B,
    RightArrow = 0x1C,
    UpArrow = 0x1D,
    DownArrow = 0x1E,

    // Digits use their ASCII codes.
    Digit0 = 0x30,
    Digit1 = 0x31,
    Digit2 = 0x32,
    Digit3 = 0x33,
    Digit4 = 0x34,
    Digit5 = 0x35,
    Digit6 = 0x36,
    Digit7 = 0x37,
    Digit8 = 0x38,
    Digit9 = 0x39,

    // Letters use their uppercase ASCII codes.
    A = 0x41,
    B = 0x42,
    C = 0x43,
    D = 0x44,
    E = 0x45,
    F = 0x46,
    G = 0x47,
    H = 0x48,
    I = 0x49,
    J = 0x4A,
    K = 0x4B,
    L = 0x4C,
    M = 0x4D,
    N = 0x4E,
    O = 0x4F,
    P = 0x50,
    Q = 0x51,
    R = 0x52,
    S = 0x53,
    T = 0x54,
    U = 0x55,
    V = 0x56,
    W = 0x57,
    X = 0x58,
    Y = 0x59,
    Z = 0x5A,

    F1 = 0x70,
    F2 = 0x71,
    F3 = 0x72,
    F4 = 0x73,
    F5 = 0x74,
    F6 = 0x75,
    F7 = 0x76,
    F8 = 0x77,
    F9 = 0x78,
    F10 = 0x79,
    F11 = 0x7A,
    F12 = 0x7B,
}

impl Key {
    /// The portable numeric code for this key.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// The modifier bit this key contributes while held, if it is a
    /// modifier key. Left, right, and generic variants of a family all
    /// map to the same bit.
    pub fn modifier_bit(self) -> Option<Modifiers> {
        match self {
            Self::Meta | Self::MetaLeft | Self::MetaRight => Some(Modifiers::META),
            Self::Ctrl | Self::CtrlLeft | Self::CtrlRight => Some(Modifiers::CTRL),
            Self::Alt | Self::AltLeft | Self::AltRight => Some(Modifiers::ALT),
            Self::Shift | Self::ShiftLeft | Self::ShiftRight => Some(Modifiers::SHIFT),
            _ => None,
        }
    }

    /// True for any modifier key variant.
    pub fn is_modifier(self) -> bool {
        self.modifier_bit().is_some()
    }

    /// Parses a key specification into a `Key`.
    ///
    /// First tries a case-insensitive variant name, then single-character
    /// shorthand for letters and digits, then common alias words
    /// (e.g. cmd/win/opt/esc/pgup).
    pub fn from_spec(s: &str) -> Option<Self> {
        if let Some(k) = Self::from_name(s) {
            return Some(k);
        }
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Self::from_code(c.to_ascii_uppercase() as u16);
            }
            if c == ' ' {
                return Some(Self::Space);
            }
        }
        match s.to_ascii_lowercase().as_str() {
            "cmd" | "win" | "super" => Some(Self::Meta),
            "control" => Some(Self::Ctrl),
            "opt" | "option" => Some(Self::Alt),
            "enter" | "ret" => Some(Self::Return),
            "esc" => Some(Self::Escape),
            "del" => Some(Self::ForwardDelete),
            "left" => Some(Self::LeftArrow),
            "right" => Some(Self::RightArrow),
            "up" => Some(Self::UpArrow),
            "down" => Some(Self::DownArrow),
            "pgup" => Some(Self::PageUp),
            "pgdn" => Some(Self::PageDown),
            _ => None,
        }
    }

    /// Returns the key specification string for this key: the bare
    /// character for letters and digits, otherwise the lowercased
    /// variant name. `from_spec` accepts every emitted form.
    pub fn to_spec(self) -> String {
        let code = self.code();
        match code {
            0x30..=0x39 => char::from(code as u8).to_string(),
            0x41..=0x5A => char::from(code as u8).to_ascii_lowercase().to_string(),
            _ => self.name().to_ascii_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for key in [
            Key::Meta,
            Key::ShiftRight,
            Key::Space,
            Key::Digit0,
            Key::J,
            Key::F12,
            Key::PageDown,
        ] {
            assert_eq!(Key::from_code(key.code()), Some(key));
        }
        assert_eq!(Key::from_code(0), None);
        assert_eq!(Key::from_code(0xFFFF), None);
    }

    #[test]
    fn modifier_variants_normalize() {
        for key in [Key::Meta, Key::MetaLeft, Key::MetaRight] {
            assert_eq!(key.modifier_bit(), Some(Modifiers::META));
        }
        for key in [Key::Shift, Key::ShiftLeft, Key::ShiftRight] {
            assert_eq!(key.modifier_bit(), Some(Modifiers::SHIFT));
        }
        assert_eq!(Key::J.modifier_bit(), None);
        assert!(Key::CtrlLeft.is_modifier());
        assert!(!Key::Escape.is_modifier());
    }

    #[test]
    fn spec_parsing() {
        assert_eq!(Key::from_spec("j"), Some(Key::J));
        assert_eq!(Key::from_spec("J"), Some(Key::J));
        assert_eq!(Key::from_spec("5"), Some(Key::Digit5));
        assert_eq!(Key::from_spec("f11"), Some(Key::F11));
        assert_eq!(Key::from_spec("pageup"), Some(Key::PageUp));
        assert_eq!(Key::from_spec("pgup"), Some(Key::PageUp));
        assert_eq!(Key::from_spec("cmd"), Some(Key::Meta));
        assert_eq!(Key::from_spec("win"), Some(Key::Meta));
        assert_eq!(Key::from_spec("opt"), Some(Key::Alt));
        assert_eq!(Key::from_spec("esc"), Some(Key::Escape));
        assert_eq!(Key::from_spec(" "), Some(Key::Space));
        assert_eq!(Key::from_spec("bogus"), None);
    }

    #[test]
    fn spec_emission_roundtrips() {
        for key in [Key::J, Key::Digit7, Key::Space, Key::Return, Key::F3, Key::UpArrow] {
            let spec = key.to_spec();
            assert_eq!(Key::from_spec(&spec), Some(key), "spec {spec}");
        }
    }
}
