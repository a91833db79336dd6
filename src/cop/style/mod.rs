pub mod redundant_regexp_character_class;

use super::registry::CopRegistry;

pub fn register_all(registry: &mut CopRegistry) {
    registry.register(Box::new(
        redundant_regexp_character_class::RedundantRegexpCharacterClass,
    ));
}
