//! Property-based tests for events and the client protocol

use proptest::prelude::*;
use shopdesk::shared::{ClientMessage, EventKind, RealtimeEvent, Role};

fn kind_strategy() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        Just(EventKind::Transaction),
        Just(EventKind::Inventory),
        Just(EventKind::Notification),
        Just(EventKind::UserStatus),
    ]
}

proptest! {
    #[test]
    fn test_server_message_type_matches_kind(kind in kind_strategy(), id in "[a-z0-9-]{1,16}") {
        let event = RealtimeEvent::new(kind, serde_json::json!({"id": id.clone()}));
        let message = event.to_server_message();
        prop_assert_eq!(message.message_type(), kind.message_type());

        let json = serde_json::to_value(&message).unwrap();
        prop_assert_eq!(&json["type"], kind.message_type());
        prop_assert_eq!(&json["data"]["id"], &serde_json::Value::String(id));
    }

    #[test]
    fn test_notification_needs_a_target(
        user in proptest::option::of("[a-z0-9]{1,8}"),
        role in proptest::option::of("[a-z]{1,8}"),
    ) {
        let has_target = user.is_some() || role.is_some();
        let event = RealtimeEvent::notification(
            serde_json::json!({"title": "Repair ready"}),
            user,
            role.map(Role::from),
        );
        prop_assert_eq!(event.validate().is_ok(), has_target);
    }

    #[test]
    fn test_non_notification_events_always_validate(kind in kind_strategy()) {
        prop_assume!(kind != EventKind::Notification);
        prop_assert!(RealtimeEvent::new(kind, serde_json::Value::Null).validate().is_ok());
    }

    #[test]
    fn test_client_frames_never_panic(text in ".{0,64}") {
        let _ = ClientMessage::from_json(&text);
    }

    #[test]
    fn test_role_survives_serde(name in "[A-Za-z]{1,10}") {
        let role = Role::from(name);
        let json = serde_json::to_string(&role).unwrap();
        let back: Role = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, role);
    }
}
