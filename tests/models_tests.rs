use scribe::core::models::{Content, Media, MediaKind, Message};

#[test]
fn test_text_message_from_json_line() {
    let line = r#"{"id":"m1","timestamp":"2026-01-05T09:00:00Z","sender":"Ana","group_key":"ops","content":{"type":"text","text":"@bot summary"}}"#;
    let message: Message = serde_json::from_str(line).unwrap();

    assert_eq!(message.id, "m1");
    assert_eq!(message.group_key, "ops");
    assert_eq!(message.timestamp.to_rfc3339(), "2026-01-05T09:00:00+00:00");
    assert_eq!(message.content.as_text(), Some("@bot summary"));
    assert!(!message.content.is_media());
}

#[test]
fn test_media_bytes_are_base64() {
    let line = r#"{"id":"m2","timestamp":"2026-01-05T09:01:00Z","sender":"Ben","group_key":"ops","content":{"type":"file","data":"JVBERi0xLjc=","mime_type":"application/pdf","file_name":"plan.pdf"}}"#;
    let message: Message = serde_json::from_str(line).unwrap();

    let (kind, media) = message.content.as_media().unwrap();
    assert_eq!(kind, MediaKind::File);
    assert_eq!(media.data, b"%PDF-1.7");
    assert_eq!(media.file_name.as_deref(), Some("plan.pdf"));
    assert_eq!(message.content.description(), "[file: plan.pdf]");

    let json = serde_json::to_string(&message.content).unwrap();
    assert!(json.contains(r#""data":"JVBERi0xLjc=""#));
    assert!(json.contains(r#""type":"file""#));
}

#[test]
fn test_bad_base64_is_rejected() {
    let line = r#"{"type":"image","data":"not base64!!"}"#;
    assert!(serde_json::from_str::<Content>(line).is_err());
}

#[test]
fn test_media_new_fills_mime() {
    let media = Media::new(MediaKind::File, b"hello".to_vec(), "", Some("notes.txt".to_string()));
    assert_eq!(media.mime_type, "text/plain");

    let media = Media::new(MediaKind::Audio, vec![1, 2, 3], "", None);
    assert_eq!(media.mime_type, "audio/amr");

    let media = Media::new(MediaKind::Image, vec![], " image/png ", None);
    assert_eq!(media.mime_type, "image/png");
}

#[test]
fn test_descriptions() {
    let empty = |kind| Content::media(kind, Media::new(kind, vec![], "", None));
    assert_eq!(empty(MediaKind::Image).description(), "[image]");
    assert_eq!(empty(MediaKind::Video).description(), "[video]");
    assert_eq!(empty(MediaKind::Audio).description(), "[voice]");
    assert_eq!(empty(MediaKind::File).description(), "[file]");
    assert!(!empty(MediaKind::Image).is_media());
    assert_eq!(Content::text("hi").description(), "hi");
}
