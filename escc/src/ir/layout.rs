//! Class layout registry (`spec.md §3`, "Class layout"): field offsets and
//! mangled member names.
//!
//! Every field occupies 8 bytes regardless of declared width (`spec.md §4`
//! invariant: "8-byte fields"), and a class's total size floors at 64 bytes
//! even when it declares fewer than 8 fields, matching
//! `ESC/src/compiler/backend/layout.c`'s `CLASS_MIN_SIZE`.

use std::collections::HashMap;

const FIELD_SIZE: usize = 8;
const CLASS_MIN_SIZE: usize = 64;

/// Field offset table for one class.
#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub name: String,
    pub field_offsets: HashMap<String, usize>,
    pub total_size: usize,
}

impl ClassLayout {
    pub fn new(name: impl Into<String>, field_names: &[String]) -> Self {
        let mut field_offsets = HashMap::new();
        for (i, field) in field_names.iter().enumerate() {
            field_offsets.insert(field.clone(), i * FIELD_SIZE);
        }
        let total_size = (field_names.len() * FIELD_SIZE).max(CLASS_MIN_SIZE);
        Self {
            name: name.into(),
            field_offsets,
            total_size,
        }
    }

    pub fn offset_of(&self, field: &str) -> Option<usize> {
        self.field_offsets.get(field).copied()
    }
}

/// Mangle a member name the way the backend expects linked symbols to read:
/// `Class__member` (`spec.md §6`).
pub fn mangle_member(class_name: &str, member: &str) -> String {
    format!("{class_name}__{member}")
}

pub fn mangle_constructor(class_name: &str) -> String {
    mangle_member(class_name, "constructor")
}

pub fn mangle_destructor(class_name: &str) -> String {
    mangle_member(class_name, "destructor")
}

/// Registry of every class's layout, built once after the declarations pass.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<String, ClassLayout>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, field_names: &[String]) {
        let name = name.into();
        let layout = ClassLayout::new(name.clone(), field_names);
        self.layouts.insert(name, layout);
    }

    pub fn get(&self, name: &str) -> Option<&ClassLayout> {
        self.layouts.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_class_floors_at_64_bytes() {
        let layout = ClassLayout::new("Point", &["x".to_string(), "y".to_string()]);
        assert_eq!(layout.total_size, 64);
        assert_eq!(layout.offset_of("x"), Some(0));
        assert_eq!(layout.offset_of("y"), Some(8));
    }

    #[test]
    fn large_class_grows_past_the_floor() {
        let fields: Vec<String> = (0..10).map(|i| format!("f{i}")).collect();
        let layout = ClassLayout::new("Big", &fields);
        assert_eq!(layout.total_size, 80);
    }

    #[test]
    fn member_mangling_matches_expected_format() {
        assert_eq!(mangle_member("Point", "x"), "Point__x");
        assert_eq!(mangle_constructor("Point"), "Point__constructor");
        assert_eq!(mangle_destructor("Point"), "Point__destructor");
    }
}
