use crate::Key;

/// Translation between portable key codes and a platform's raw codes.
///
/// One implementation exists per platform, selected when the manager is
/// constructed. Matching logic never sees raw codes; events are mapped
/// through this trait at the edge.
pub trait KeyMap: Send + Sync {
    /// The platform code for `key`, if the platform can represent it.
    fn to_native(&self, key: Key) -> Option<i32>;
    /// The portable key for a raw platform `code`, if recognized.
    fn from_native(&self, code: i32) -> Option<Key>;
}

/// Key map for platforms (and tests) whose raw codes already are the
/// portable codes.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityKeyMap;

impl KeyMap for IdentityKeyMap {
    fn to_native(&self, key: Key) -> Option<i32> {
        Some(i32::from(key.code()))
    }

    fn from_native(&self, code: i32) -> Option<Key> {
        u16::try_from(code).ok().and_then(Key::from_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_roundtrip() {
        let map = IdentityKeyMap;
        for key in [Key::Ctrl, Key::J, Key::F7] {
            let native = map.to_native(key).expect("native code");
            assert_eq!(map.from_native(native), Some(key));
        }
        assert_eq!(map.from_native(-1), None);
        assert_eq!(map.from_native(0), None);
    }
}
