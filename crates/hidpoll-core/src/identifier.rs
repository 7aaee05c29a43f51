// Hidpoll Identifiers
// Stable semantic tags naming the axes, buttons, and keys of a controller

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Semantic class of an [`Identifier`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IdentifierKind {
    Axis,
    Button,
    Key,
}

/// Immutable tag naming a control.
///
/// Two identifiers are equal when both their kind and their code match. The
/// code is a small integer indexing the read-only name table of its kind, so
/// identifiers are cheap to copy and hash and can be used as lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Identifier {
    kind: IdentifierKind,
    code: u16,
}

impl Identifier {
    pub const fn new(kind: IdentifierKind, code: u16) -> Self {
        Self { kind, code }
    }

    pub const fn axis(code: u16) -> Self {
        Self::new(IdentifierKind::Axis, code)
    }

    pub const fn button(code: u16) -> Self {
        Self::new(IdentifierKind::Button, code)
    }

    pub const fn key(code: u16) -> Self {
        Self::new(IdentifierKind::Key, code)
    }

    pub fn kind(self) -> IdentifierKind {
        self.kind
    }

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.code
    }

    /// Get the display name of this identifier.
    ///
    /// Codes outside the built-in tables are still valid identifiers (backends
    /// may report controls we have no name for) and are named "Unknown".
    pub fn name(self) -> &'static str {
        self.table_name().unwrap_or("Unknown")
    }

    fn table_name(self) -> Option<&'static str> {
        name_tables()
            .for_kind(self.kind)
            .get(self.code as usize)
            .copied()
            .flatten()
    }

    pub fn is_axis(self) -> bool {
        self.kind == IdentifierKind::Axis
    }

    pub fn is_button(self) -> bool {
        self.kind == IdentifierKind::Button
    }

    pub fn is_key(self) -> bool {
        self.kind == IdentifierKind::Key
    }
}

/// `kind:name`, or `kind:code` for codes without a table name, so the
/// text always parses back to the same identifier.
impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table_name() {
            Some(name) => write!(f, "{}:{}", self.kind, name),
            None => write!(f, "{}:{}", self.kind, self.code),
        }
    }
}

/// Errors that can occur when parsing a textual identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierParseError {
    #[error("missing ':' separator in identifier '{0}'")]
    MissingSeparator(String),

    #[error("unknown identifier kind '{0}'")]
    UnknownKind(String),

    #[error("unknown {kind} name '{name}'")]
    UnknownName { kind: IdentifierKind, name: String },
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;

    /// Parse `kind:name` or `kind:code`, e.g. `axis:x`, `button:3`, `key:Escape`.
    ///
    /// Names are matched case-insensitively. A numeric suffix is taken as a
    /// raw code only when no entry of that kind carries it as a name (button
    /// `3` is the button named "3").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| IdentifierParseError::MissingSeparator(s.to_string()))?;
        let kind = IdentifierKind::from_str(kind.trim())
            .map_err(|_| IdentifierParseError::UnknownKind(kind.to_string()))?;
        let name = name.trim();

        if let Some(code) = name_tables().code_of(kind, name) {
            return Ok(Identifier::new(kind, code));
        }
        name.parse::<u16>()
            .map(|code| Identifier::new(kind, code))
            .map_err(|_| IdentifierParseError::UnknownName {
                kind,
                name: name.to_string(),
            })
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Read-only name tables, indexed by code
struct NameTables {
    axes: Vec<Option<&'static str>>,
    buttons: Vec<Option<&'static str>>,
    keys: Vec<Option<&'static str>>,
}

impl NameTables {
    fn build() -> Self {
        Self {
            axes: index_by_code(axis::NAMES),
            buttons: index_by_code(button::NAMES),
            keys: index_by_code(key::NAMES),
        }
    }

    fn for_kind(&self, kind: IdentifierKind) -> &[Option<&'static str>] {
        match kind {
            IdentifierKind::Axis => &self.axes,
            IdentifierKind::Button => &self.buttons,
            IdentifierKind::Key => &self.keys,
        }
    }

    fn code_of(&self, kind: IdentifierKind, name: &str) -> Option<u16> {
        self.for_kind(kind)
            .iter()
            .position(|entry| entry.is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|index| index as u16)
    }
}

fn index_by_code(entries: &[(u16, &'static str)]) -> Vec<Option<&'static str>> {
    let len = entries
        .iter()
        .map(|(code, _)| *code as usize + 1)
        .max()
        .unwrap_or(0);
    let mut names = vec![None; len];
    for &(code, name) in entries {
        names[code as usize] = Some(name);
    }
    names
}

fn name_tables() -> &'static NameTables {
    static TABLES: OnceLock<NameTables> = OnceLock::new();
    TABLES.get_or_init(NameTables::build)
}

/// Declare identifier constants together with their name table
macro_rules! identifier_table {
    ($ctor:ident { $($konst:ident = $code:expr => $name:expr),* $(,)? }) => {
        $(pub const $konst: Identifier = Identifier::$ctor($code);)*

        pub(crate) const NAMES: &[(u16, &str)] = &[$(($code, $name)),*];
    };
}

/// Axis identifiers
pub mod axis {
    use super::Identifier;

    identifier_table!(axis {
        X = 0 => "x",
        Y = 1 => "y",
        Z = 2 => "z",
        RX = 3 => "rx",
        RY = 4 => "ry",
        RZ = 5 => "rz",
        SLIDER = 6 => "slider",
        SLIDER_VELOCITY = 7 => "slider-velocity",
        X_VELOCITY = 8 => "x-velocity",
        Y_VELOCITY = 9 => "y-velocity",
        Z_VELOCITY = 10 => "z-velocity",
        X_FORCE = 11 => "x-force",
        Y_FORCE = 12 => "y-force",
        Z_FORCE = 13 => "z-force",
        POV = 14 => "pov",
        UNKNOWN = 15 => "unknown",
    });
}

/// Button identifiers
///
/// Numbered buttons come first so that `button:N` names button `N` for the
/// usual 0-31 range reported by generic joysticks.
pub mod button {
    use super::Identifier;

    identifier_table!(button {
        _0 = 0 => "0", _1 = 1 => "1", _2 = 2 => "2", _3 = 3 => "3",
        _4 = 4 => "4", _5 = 5 => "5", _6 = 6 => "6", _7 = 7 => "7",
        _8 = 8 => "8", _9 = 9 => "9", _10 = 10 => "10", _11 = 11 => "11",
        _12 = 12 => "12", _13 = 13 => "13", _14 = 14 => "14", _15 = 15 => "15",
        _16 = 16 => "16", _17 = 17 => "17", _18 = 18 => "18", _19 = 19 => "19",
        _20 = 20 => "20", _21 = 21 => "21", _22 = 22 => "22", _23 = 23 => "23",
        _24 = 24 => "24", _25 = 25 => "25", _26 = 26 => "26", _27 = 27 => "27",
        _28 = 28 => "28", _29 = 29 => "29", _30 = 30 => "30", _31 = 31 => "31",
        TRIGGER = 32 => "Trigger",
        THUMB = 33 => "Thumb",
        THUMB2 = 34 => "Thumb 2",
        TOP = 35 => "Top",
        TOP2 = 36 => "Top 2",
        PINKIE = 37 => "Pinkie",
        BASE = 38 => "Base",
        BASE2 = 39 => "Base 2",
        BASE3 = 40 => "Base 3",
        BASE4 = 41 => "Base 4",
        BASE5 = 42 => "Base 5",
        BASE6 = 43 => "Base 6",
        DEAD = 44 => "Dead",
        A = 45 => "A",
        B = 46 => "B",
        C = 47 => "C",
        X = 48 => "X",
        Y = 49 => "Y",
        Z = 50 => "Z",
        LEFT_THUMB = 51 => "Left Thumb",
        RIGHT_THUMB = 52 => "Right Thumb",
        LEFT_THUMB2 = 53 => "Left Thumb 2",
        RIGHT_THUMB2 = 54 => "Right Thumb 2",
        SELECT = 55 => "Select",
        START = 56 => "Start",
        MODE = 57 => "Mode",
        LEFT_THUMB3 = 58 => "Left Thumb 3",
        RIGHT_THUMB3 = 59 => "Right Thumb 3",
        LEFT = 60 => "Left",
        RIGHT = 61 => "Right",
        MIDDLE = 62 => "Middle",
        SIDE = 63 => "Side",
        EXTRA = 64 => "Extra",
        FORWARD = 65 => "Forward",
        BACK = 66 => "Back",
        UNKNOWN = 67 => "Unknown",
    });
}

/// Keyboard key identifiers
pub mod key {
    use super::Identifier;

    identifier_table!(key {
        ESCAPE = 0 => "Escape",
        _1 = 1 => "1",
        _2 = 2 => "2",
        _3 = 3 => "3",
        _4 = 4 => "4",
        _5 = 5 => "5",
        _6 = 6 => "6",
        _7 = 7 => "7",
        _8 = 8 => "8",
        _9 = 9 => "9",
        _0 = 10 => "0",
        MINUS = 11 => "Minus",
        EQUALS = 12 => "Equals",
        BACK = 13 => "Back",
        TAB = 14 => "Tab",
        Q = 15 => "Q",
        W = 16 => "W",
        E = 17 => "E",
        R = 18 => "R",
        T = 19 => "T",
        Y = 20 => "Y",
        U = 21 => "U",
        I = 22 => "I",
        O = 23 => "O",
        P = 24 => "P",
        LBRACKET = 25 => "LBracket",
        RBRACKET = 26 => "RBracket",
        RETURN = 27 => "Return",
        LCONTROL = 28 => "LControl",
        A = 29 => "A",
        S = 30 => "S",
        D = 31 => "D",
        F = 32 => "F",
        G = 33 => "G",
        H = 34 => "H",
        J = 35 => "J",
        K = 36 => "K",
        L = 37 => "L",
        SEMICOLON = 38 => "Semicolon",
        APOSTROPHE = 39 => "Apostrophe",
        GRAVE = 40 => "Grave",
        LSHIFT = 41 => "LShift",
        BACKSLASH = 42 => "Backslash",
        Z = 43 => "Z",
        X = 44 => "X",
        C = 45 => "C",
        V = 46 => "V",
        B = 47 => "B",
        N = 48 => "N",
        M = 49 => "M",
        COMMA = 50 => "Comma",
        PERIOD = 51 => "Period",
        SLASH = 52 => "Slash",
        RSHIFT = 53 => "RShift",
        MULTIPLY = 54 => "Multiply",
        LALT = 55 => "LAlt",
        SPACE = 56 => "Space",
        CAPITAL = 57 => "Capital",
        F1 = 58 => "F1",
        F2 = 59 => "F2",
        F3 = 60 => "F3",
        F4 = 61 => "F4",
        F5 = 62 => "F5",
        F6 = 63 => "F6",
        F7 = 64 => "F7",
        F8 = 65 => "F8",
        F9 = 66 => "F9",
        F10 = 67 => "F10",
        F11 = 68 => "F11",
        F12 = 69 => "F12",
        NUMLOCK = 70 => "NumLock",
        SCROLL = 71 => "Scroll",
        NUM0 = 72 => "Num0",
        NUM1 = 73 => "Num1",
        NUM2 = 74 => "Num2",
        NUM3 = 75 => "Num3",
        NUM4 = 76 => "Num4",
        NUM5 = 77 => "Num5",
        NUM6 = 78 => "Num6",
        NUM7 = 79 => "Num7",
        NUM8 = 80 => "Num8",
        NUM9 = 81 => "Num9",
        SUBTRACT = 82 => "Subtract",
        ADD = 83 => "Add",
        DECIMAL = 84 => "Decimal",
        NUMPADENTER = 85 => "NumpadEnter",
        RCONTROL = 86 => "RControl",
        DIVIDE = 87 => "Divide",
        SYSRQ = 88 => "SysRq",
        RALT = 89 => "RAlt",
        PAUSE = 90 => "Pause",
        HOME = 91 => "Home",
        UP = 92 => "Up",
        PAGEUP = 93 => "PageUp",
        LEFT = 94 => "Left",
        RIGHT = 95 => "Right",
        END = 96 => "End",
        DOWN = 97 => "Down",
        PAGEDOWN = 98 => "PageDown",
        INSERT = 99 => "Insert",
        DELETE = 100 => "Delete",
        LWIN = 101 => "LWin",
        RWIN = 102 => "RWin",
        APPS = 103 => "Apps",
        POWER = 104 => "Power",
        SLEEP = 105 => "Sleep",
        UNKNOWN = 106 => "Unknown",
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality_by_kind_and_code() {
        assert_eq!(axis::X, Identifier::axis(0));
        assert_ne!(axis::X, Identifier::button(0));
        assert_ne!(axis::X, Identifier::key(0));
    }

    #[test]
    fn test_identifier_names() {
        assert_eq!(axis::RZ.name(), "rz");
        assert_eq!(axis::POV.name(), "pov");
        assert_eq!(button::TRIGGER.name(), "Trigger");
        assert_eq!(button::_7.name(), "7");
        assert_eq!(key::ESCAPE.name(), "Escape");
        assert_eq!(key::A.name(), "A");
    }

    #[test]
    fn test_identifier_name_out_of_table() {
        assert_eq!(Identifier::axis(900).name(), "Unknown");
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(axis::X.to_string(), "axis:x");
        assert_eq!(key::SPACE.to_string(), "key:Space");
        assert_eq!(button::LEFT_THUMB.to_string(), "button:Left Thumb");
    }

    #[test]
    fn test_identifier_from_str() {
        assert_eq!("axis:x".parse::<Identifier>().unwrap(), axis::X);
        assert_eq!("AXIS:RX".parse::<Identifier>().unwrap(), axis::RX);
        assert_eq!("button:3".parse::<Identifier>().unwrap(), button::_3);
        assert_eq!("button:trigger".parse::<Identifier>().unwrap(), button::TRIGGER);
        assert_eq!("key:escape".parse::<Identifier>().unwrap(), key::ESCAPE);
        assert_eq!("key:F12".parse::<Identifier>().unwrap(), key::F12);
    }

    #[test]
    fn test_identifier_from_str_raw_code() {
        assert_eq!(
            "axis:300".parse::<Identifier>().unwrap(),
            Identifier::axis(300)
        );
    }

    #[test]
    fn test_identifier_from_str_errors() {
        assert_eq!(
            "x".parse::<Identifier>(),
            Err(IdentifierParseError::MissingSeparator("x".to_string()))
        );
        assert_eq!(
            "hat:x".parse::<Identifier>(),
            Err(IdentifierParseError::UnknownKind("hat".to_string()))
        );
        assert!(matches!(
            "key:not-a-key".parse::<Identifier>(),
            Err(IdentifierParseError::UnknownName { kind: IdentifierKind::Key, .. })
        ));
    }

    #[test]
    fn test_identifier_display_parses_back() {
        for id in [axis::SLIDER_VELOCITY, button::RIGHT_THUMB2, key::NUMPADENTER] {
            assert_eq!(id.to_string().parse::<Identifier>().unwrap(), id);
        }
    }

    #[test]
    fn test_unnamed_code_display_parses_back() {
        let id = Identifier::axis(300);
        assert_eq!(id.to_string(), "axis:300");
        assert_eq!(id.name(), "Unknown");

        for id in [Identifier::axis(300), Identifier::button(900), Identifier::key(4000)] {
            assert_eq!(Identifier::try_from(String::from(id)).unwrap(), id);
        }
    }

    #[test]
    fn test_every_code_display_parses_back() {
        // Numeric names must never shadow an unnamed code
        for kind in [IdentifierKind::Axis, IdentifierKind::Button, IdentifierKind::Key] {
            for code in 0..=200 {
                let id = Identifier::new(kind, code);
                assert_eq!(id.to_string().parse::<Identifier>().unwrap(), id);
            }
        }
    }

    #[test]
    fn test_name_tables_have_unique_codes() {
        for names in [axis::NAMES, button::NAMES, key::NAMES] {
            let mut codes: Vec<u16> = names.iter().map(|(code, _)| *code).collect();
            codes.sort_unstable();
            codes.dedup();
            assert_eq!(codes.len(), names.len());
        }
    }
}
