use flowforge::message::Message;

#[test]
fn message_construction_via_new_sets_role_and_content() {
    let msg = Message::new("user", "hello");
    assert_eq!(msg.role, "user");
    assert_eq!(msg.content, "hello");
    assert!(msg.id.is_none());
}

#[test]
fn convenience_constructors() {
    let user_msg = Message::user("Hello");
    assert_eq!(user_msg.role, Message::USER);
    assert_eq!(user_msg.content, "Hello");

    let assistant_msg = Message::assistant("Hi there!");
    assert_eq!(assistant_msg.role, Message::ASSISTANT);
    assert_eq!(assistant_msg.content, "Hi there!");

    let system_msg = Message::system("You are helpful");
    assert_eq!(system_msg.role, Message::SYSTEM);
    assert_eq!(system_msg.content, "You are helpful");

    let custom_msg = Message::new("function", "Result: 42");
    assert_eq!(custom_msg.role, "function");
    assert_eq!(custom_msg.content, "Result: 42");
}

#[test]
fn with_id_attaches_a_stable_id() {
    let msg = Message::assistant("Hi there!").with_id("m-1");
    assert_eq!(msg.id.as_deref(), Some("m-1"));
}

#[test]
fn role_checking() {
    let user_msg = Message::user("Hello");
    assert!(user_msg.has_role(Message::USER));
    assert!(!user_msg.has_role(Message::ASSISTANT));
}

#[test]
fn serialization_round_trip() {
    let original = Message::user("Test message").with_id("m-2");
    let json = serde_json::to_string(&original).expect("serialization failed");
    assert!(json.contains("\"id\":\"m-2\""));
    let deserialized: Message = serde_json::from_str(&json).expect("deserialization failed");
    assert_eq!(original, deserialized);
}

#[test]
fn omitted_id_is_skipped_in_serialized_output() {
    let msg = Message::user("no id here");
    let json = serde_json::to_string(&msg).unwrap();
    assert!(!json.contains("\"id\""));
}
