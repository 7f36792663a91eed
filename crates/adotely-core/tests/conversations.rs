mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use adotely_core::chat::{self, MessagePreview};
use adotely_core::conversations::{conversation_key, eligible_partners, list_conversations};
use adotely_core::typing::{watch_typing, TypingConfig, TypingIndicator};
use adotely_core::{Disposition, ErrorKind, MatchService};
use adotely_types::models::Role;
use adotely_types::{paths, RealtimeStore};
use serde_json::Value;

use common::Harness;

#[test]
fn test_gate_opens_only_on_match() {
    let h = Harness::new();
    let shelter = h.register("Abrigo Sol", Role::Shelter);
    let adopter = h.register("Davi", Role::Adopter);
    let pet = h.add_pet(&shelter, "Pipoca");
    let matcher = MatchService::new(h.backend.docs.clone());

    matcher
        .record_disposition(&adopter.id, &pet, Disposition::Liked)
        .unwrap();
    assert!(eligible_partners(&*h.backend.docs, &adopter).unwrap().is_empty());
    assert!(eligible_partners(&*h.backend.docs, &shelter).unwrap().is_empty());

    matcher.approve_match(&shelter.id, &adopter.id, &pet).unwrap();
    assert_eq!(eligible_partners(&*h.backend.docs, &adopter).unwrap(), vec![shelter.id.clone()]);
    assert_eq!(eligible_partners(&*h.backend.docs, &shelter).unwrap(), vec![adopter.id.clone()]);
}

#[test]
fn test_partners_are_deduplicated() {
    let h = Harness::new();
    let shelter = h.register("Abrigo Sol", Role::Shelter);
    let adopter = h.register("Davi", Role::Adopter);
    let first = h.add_pet(&shelter, "Pipoca");
    let second = h.add_pet(&shelter, "Paçoca");
    let matcher = MatchService::new(h.backend.docs.clone());

    for pet in [&first, &second] {
        matcher
            .record_disposition(&adopter.id, pet, Disposition::Liked)
            .unwrap();
        matcher.approve_match(&shelter.id, &adopter.id, pet).unwrap();
    }
    assert_eq!(eligible_partners(&*h.backend.docs, &adopter).unwrap(), vec![shelter.id]);
}

#[test]
fn test_conversation_list_shows_last_message() {
    let h = Harness::new();
    let shelter = h.register("Abrigo Sol", Role::Shelter);
    let adopter = h.register("Davi", Role::Adopter);
    let pet = h.add_pet(&shelter, "Pipoca");
    let matcher = MatchService::new(h.backend.docs.clone());
    matcher
        .record_disposition(&adopter.id, &pet, Disposition::Liked)
        .unwrap();
    matcher.approve_match(&shelter.id, &adopter.id, &pet).unwrap();

    let list = list_conversations(&h.backend, &adopter).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].partner.name, "Abrigo Sol");
    assert_eq!(list[0].key, conversation_key(&shelter.id, &adopter.id));
    assert_eq!(list[0].last_message, None);

    chat::send_message(&h.backend, &adopter.id, &shelter.id, "Oi! A Pipoca ainda está disponível?", None)
        .unwrap();
    let list = list_conversations(&h.backend, &shelter).unwrap();
    assert_eq!(
        list[0].last_message,
        Some(MessagePreview::Text("Oi! A Pipoca ainda está disponível?".into()))
    );

    chat::send_message(&h.backend, &shelter.id, &adopter.id, "", Some(&[0xff, 0xd8][..])).unwrap();
    let list = list_conversations(&h.backend, &adopter).unwrap();
    assert_eq!(list[0].last_message, Some(MessagePreview::Image));
}

#[test]
fn test_messages_arrive_in_order() {
    let h = Harness::new();
    let key = conversation_key("u1", "u2");
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = seen.clone();
    let _sub = chat::watch_messages(&*h.backend.realtime, &key, move |messages| {
        *sink.lock().unwrap() = messages.into_iter().map(|m| m.text).collect();
    })
    .unwrap();

    chat::send_message(&h.backend, "u1", "u2", "primeira", None).unwrap();
    chat::send_message(&h.backend, "u2", "u1", "segunda", None).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["primeira", "segunda"]);

    let stored = chat::load_messages(&*h.backend.realtime, &key).unwrap();
    assert_eq!(stored[0].from, "u1");
    assert_eq!(stored[1].to, "u1");
    assert!(!stored[0].read);
}

#[test]
fn test_empty_message_is_rejected() {
    let h = Harness::new();
    let err = chat::send_message(&h.backend, "u1", "u2", "   ", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(chat::load_messages(&*h.backend.realtime, "u1-u2").unwrap().is_empty());
}

fn typing_flag(h: &Harness, key: &str, user: &str) -> Option<Value> {
    RealtimeStore::get_once(&*h.db, &paths::typing(key, user)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_typing_flag_is_debounced_and_expires() {
    let h = Harness::new();
    let key = conversation_key("u1", "u2");
    let mut indicator = TypingIndicator::new(h.backend.realtime.clone(), &key, "u1", TypingConfig::default());

    indicator.input_changed("o");
    tokio::time::sleep(Duration::from_millis(100)).await;
    indicator.input_changed("oi");
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(typing_flag(&h, &key, "u1"), None);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(typing_flag(&h, &key, "u1"), Some(Value::Bool(true)));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(typing_flag(&h, &key, "u1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_typing_flag_cleared_on_send_and_drop() {
    let h = Harness::new();
    let key = conversation_key("u1", "u2");
    let states: Arc<Mutex<Vec<bool>>> = Arc::default();
    let sink = states.clone();
    let _watch = watch_typing(&*h.backend.realtime, &key, "u1", move |typing| {
        sink.lock().unwrap().push(typing)
    })
    .unwrap();

    let mut indicator = TypingIndicator::new(h.backend.realtime.clone(), &key, "u1", TypingConfig::default());
    indicator.input_changed("olá");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(typing_flag(&h, &key, "u1"), Some(Value::Bool(true)));

    indicator.message_sent();
    assert_eq!(typing_flag(&h, &key, "u1"), None);

    indicator.input_changed("de novo");
    tokio::time::sleep(Duration::from_millis(400)).await;
    drop(indicator);
    assert_eq!(typing_flag(&h, &key, "u1"), None);

    let states = states.lock().unwrap();
    assert_eq!(states.first(), Some(&false));
    assert_eq!(states.last(), Some(&false));
    assert!(states.contains(&true));
}
