use super::template_store::InMemoryTemplateStore;
use super::text_target::BufferTarget;
use super::trigger_listener::TriggerListener;
use crate::domain::{StoredTemplate, Template, TemplateStore, TextTarget, TriggerNotifier};
use crate::engine::DeletePolicy;
use async_trait::async_trait;
use std::sync::Arc;

fn template(trigger: &str) -> Template {
    Template::parse(&format!(r#"{{"_meta": {{"trigger": "{}"}}, "title": "$input"}}"#, trigger)).unwrap()
}

async fn listener_with(triggers: &[&str]) -> TriggerListener {
    let templates = triggers
        .iter()
        .map(|t| (t.trim_start_matches('/').to_string(), template(t)))
        .collect();
    let store = Arc::new(InMemoryTemplateStore::with_templates(templates));
    let mut listener = TriggerListener::new(store, DeletePolicy::default());
    listener.refresh().await;
    listener
}

#[tokio::test]
async fn test_space_after_trigger_opens_form() {
    let mut listener = listener_with(&["/scene"]).await;
    let target = BufferTarget::new("write a /scene");

    let session = listener.on_key(' ', &target).await.unwrap();
    assert_eq!(session.trigger(), "/scene");
    assert!(listener.sessions().is_open());
}

#[tokio::test]
async fn test_other_keys_are_ignored() {
    let mut listener = listener_with(&["/scene"]).await;
    let target = BufferTarget::new("/scene");
    assert!(listener.on_key('x', &target).await.is_none());
    assert!(listener.on_key('\n', &target).await.is_none());
    assert!(!listener.sessions().is_open());
}

#[tokio::test]
async fn test_match_uses_text_before_cursor() {
    let mut listener = listener_with(&["/scene"]).await;
    let target = BufferTarget::new("/scene tail").with_cursor(6);
    assert!(listener.on_key('\t', &target).await.is_some());

    let target = BufferTarget::new("/scene tail");
    assert!(listener.on_key('\t', &target).await.is_none());
}

#[tokio::test]
async fn test_notifier_replaces_trigger_list() {
    let store = Arc::new(InMemoryTemplateStore::with_templates(vec![
        ("a".into(), template("/a")),
        ("b".into(), template("/b")),
    ]));
    let notifier = TriggerNotifier::new(vec!["/a".into()]);
    let mut listener = TriggerListener::new(store, DeletePolicy::default()).with_updates(notifier.subscribe());
    assert_eq!(listener.triggers(), ["/a".to_string()]);

    let target = BufferTarget::new("/b");
    assert!(listener.on_key(' ', &target).await.is_none());

    notifier.publish(vec!["/b".into()]);
    assert!(listener.on_key(' ', &target).await.is_some());
    assert_eq!(listener.triggers(), ["/b".to_string()]);
}

struct FailingStore;

#[async_trait]
impl TemplateStore for FailingStore {
    async fn get(&self, _id: &str) -> anyhow::Result<Option<StoredTemplate>> {
        Err(anyhow::anyhow!("offline"))
    }
    async fn get_by_trigger(&self, _trigger: &str) -> anyhow::Result<Option<Template>> {
        Err(anyhow::anyhow!("offline"))
    }
    async fn get_all(&self) -> anyhow::Result<Vec<StoredTemplate>> {
        Err(anyhow::anyhow!("offline"))
    }
    async fn get_all_triggers(&self) -> anyhow::Result<Vec<String>> {
        Err(anyhow::anyhow!("offline"))
    }
    async fn put(&self, _id: Option<String>, _template: Template) -> anyhow::Result<StoredTemplate> {
        Err(anyhow::anyhow!("offline"))
    }
    async fn delete(&self, _id: &str) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("offline"))
    }
}

#[tokio::test]
async fn test_failing_store_degrades_quietly() {
    let mut listener = TriggerListener::new(Arc::new(FailingStore), DeletePolicy::default());
    listener.set_triggers(vec!["/s".into()]);
    listener.refresh().await;
    assert!(listener.triggers().is_empty());

    listener.set_triggers(vec!["/s".into()]);
    let target = BufferTarget::new("/s");
    assert!(listener.on_key(' ', &target).await.is_none());
    assert!(!listener.sessions().is_open());
}

#[tokio::test]
async fn test_open_then_submit_through_listener() {
    let mut listener = listener_with(&["/t"]).await;
    let mut target = BufferTarget::new("hey /t");
    listener.on_key(' ', &target).await.unwrap().set_value("title", "Hi").unwrap();
    listener.sessions_mut().submit(&mut target).unwrap();
    assert_eq!(target.read_value(), "hey {\n  \"title\": \"Hi\"\n}");
}
