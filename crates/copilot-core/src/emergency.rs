//! Emergency classification for assistant replies.
//!
//! The backend prefixes replies with a fixed marker when it detects IMCI
//! danger signs. There is no structured severity field, so the client
//! classifies by substring. Keep every use of the marker behind these
//! functions so the heuristic can change in one place.

use crate::state::{ChatMessage, ChatRole};

/// Literal the backend puts at the start of danger-sign replies.
pub const EMERGENCY_MARKER: &str = "⚠️ DANGER SIGNS DETECTED";

/// True if `content` carries the emergency marker.
pub fn is_emergency(content: &str) -> bool {
    content.contains(EMERGENCY_MARKER)
}

/// True for assistant turns carrying the marker. User turns never qualify.
pub fn is_emergency_turn(message: &ChatMessage) -> bool {
    message.role == ChatRole::Assistant && is_emergency(&message.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_anywhere_in_reply() {
        assert!(is_emergency("⚠️ DANGER SIGNS DETECTED: refer now"));
        assert!(is_emergency("Assessment:\n⚠️ DANGER SIGNS DETECTED: convulsions"));
    }

    #[test]
    fn test_plain_reply_is_not_emergency() {
        assert!(!is_emergency("Assessment: no pneumonia, cough or cold"));
        assert!(!is_emergency("danger signs detected"));
    }

    #[test]
    fn test_user_turn_never_emergency() {
        let typed = ChatMessage::user("⚠️ DANGER SIGNS DETECTED");
        assert!(!is_emergency_turn(&typed));
        let reply = ChatMessage::assistant("⚠️ DANGER SIGNS DETECTED: stridor");
        assert!(is_emergency_turn(&reply));
    }

    #[test]
    fn test_classification_is_repeatable() {
        let reply = ChatMessage::assistant("⚠️ DANGER SIGNS DETECTED: lethargic");
        assert_eq!(is_emergency_turn(&reply), is_emergency_turn(&reply));
    }
}
