//! Message-type whitelist.
//!
//! Only the kinds listed here reach a handler. Routing is a closed match on
//! `MessageKind`; the requested string never selects code by name.

/// A whitelisted message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    SingleCommand,
    CropScheduleUpdate,
}

/// Message types a device may send, in their wire spelling.
pub const WHITELIST: [&str; 2] = [
    MessageKind::SingleCommand.as_str(),
    MessageKind::CropScheduleUpdate.as_str(),
];

impl MessageKind {
    pub const ALL: [MessageKind; 2] = [MessageKind::SingleCommand, MessageKind::CropScheduleUpdate];

    /// Resolve an already-lowercased requested command.
    pub fn from_requested(requested: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == requested)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::SingleCommand => "single_command",
            MessageKind::CropScheduleUpdate => "crop_schedule_update",
        }
    }
}

pub fn is_whitelisted(requested: &str) -> bool {
    MessageKind::from_requested(requested).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_whitelisted_kinds() {
        assert_eq!(MessageKind::from_requested("single_command"), Some(MessageKind::SingleCommand));
        assert_eq!(
            MessageKind::from_requested("crop_schedule_update"),
            Some(MessageKind::CropScheduleUpdate)
        );
        for k in MessageKind::ALL {
            assert_eq!(MessageKind::from_requested(k.as_str()), Some(k));
        }
    }

    #[test]
    fn whitelist_lists_every_kind() {
        assert_eq!(WHITELIST.len(), MessageKind::ALL.len());
        for s in WHITELIST {
            assert!(is_whitelisted(s), "{s}");
        }
        assert!(!is_whitelisted("error"));
    }

    #[test]
    fn rejects_everything_else() {
        for s in ["", "error", "handle_message", "send_confirmation", "Single_Command", "whitelist"] {
            assert_eq!(MessageKind::from_requested(s), None, "requested={s}");
        }
    }
}
