pub mod mixed_regexp_capture_types;

use super::registry::CopRegistry;

pub fn register_all(registry: &mut CopRegistry) {
    registry.register(Box::new(mixed_regexp_capture_types::MixedRegexpCaptureTypes));
}
