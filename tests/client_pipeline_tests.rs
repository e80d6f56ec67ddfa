mod test_utils;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use site_cms::{
    client::{
        AdminSession, ClientConfig, ClientError, ContentService, EntityDraft, FieldValue, Notice,
        Notifier, PendingUpload, Scope,
    },
    entities::resource::ResourceKind,
};
use test_utils::*;

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

fn client_for(app: &TestApp, token: &str) -> (ContentService, Arc<RecordingNotifier>) {
    let config = ClientConfig {
        api_origin: Some(app.address.clone()),
        page_origin: app.address.clone(),
        is_development: false,
        ..ClientConfig::default()
    };
    let notifier = Arc::new(RecordingNotifier::default());
    let session = Arc::new(AdminSession::with_token(token));
    let service = ContentService::new(&config, session, notifier.clone()).unwrap();
    (service, notifier)
}

#[actix_rt::test]
async fn create_resolve_and_download_an_uploaded_asset() {
    let app = TestApp::spawn().await;
    let (service, notifier) = client_for(&app, &app.admin_token);

    let draft = EntityDraft::new()
        .with("title", "Best Agency")
        .with("featured", true)
        .with("tags", FieldValue::list(["award", "", "design"]));
    let upload = PendingUpload::new("badge.png", PNG.to_vec());

    let created = service
        .create(ResourceKind::Achievements, &draft, &[upload])
        .await
        .unwrap();

    assert_eq!(created["tags"], json!(["award", "design"]));
    let url = created["images"][0]["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/uploads/images/", app.address)), "unresolved: {}", url);

    let (bytes, content_type) = service.api().fetch_asset(url).await.unwrap();
    assert_eq!(bytes, PNG);
    assert_eq!(content_type.as_deref(), Some("image/png"));

    assert_eq!(
        notifier.notices(),
        vec![Notice::Success("Achievement created successfully".into())]
    );
}

#[actix_rt::test]
async fn mutations_invalidate_every_cached_view_of_the_collection() {
    let app = TestApp::spawn().await;
    let (service, notifier) = client_for(&app, &app.admin_token);
    let kind = ResourceKind::Achievements;

    let created = service
        .create(
            kind,
            &EntityDraft::new().with("title", "Award"),
            &[PendingUpload::new("a.png", PNG.to_vec())],
        )
        .await
        .unwrap();
    let id = created["_id"].as_str().unwrap().to_string();

    assert_eq!(service.list(kind, Scope::Admin).await.unwrap().len(), 1);
    assert_eq!(service.list(kind, Scope::Public).await.unwrap().len(), 1);
    service.get(kind, Scope::Admin, &id).await.unwrap();

    let cache = service.coordinator().cache();
    let admin_key = ContentService::list_key(kind, Scope::Admin);
    let public_key = ContentService::list_key(kind, Scope::Public);
    assert!(cache.get_fresh(&admin_key).is_some());
    // Discard anything queued by the create so the update's keys stand alone.
    service.coordinator().take_refetch_queue();

    let mut draft = EntityDraft::from_entity(created.as_object().unwrap());
    draft.set("title", "Award 2024");
    draft.set("active", false);
    let updated = service.update(kind, &id, &draft, &[]).await.unwrap();

    assert_eq!(updated["title"], "Award 2024");
    assert_eq!(updated["images"], created["images"]);
    assert!(cache.peek(&admin_key).is_none());
    assert!(cache.peek(&public_key).is_none());
    assert!(cache.peek(&ContentService::item_key(kind, Scope::Admin, &id)).is_none());

    // The retained image survived the round trip through resolved URLs.
    let url = updated["images"][0]["url"].as_str().unwrap();
    assert!(service.api().fetch_asset(url).await.is_ok());

    assert_eq!(service.refetch_invalidated().await, 3);
    let admin = cache.get_fresh(&admin_key).unwrap();
    assert_eq!(admin[0]["title"], "Award 2024");
    assert_eq!(cache.get_fresh(&public_key).unwrap(), json!([]));

    assert_eq!(
        notifier.notices(),
        vec![
            Notice::Success("Achievement created successfully".into()),
            Notice::Success("Achievement updated successfully".into()),
        ]
    );
}

#[actix_rt::test]
async fn server_validation_messages_reach_the_operator() {
    let app = TestApp::spawn().await;
    let (service, notifier) = client_for(&app, &app.admin_token);

    let result = service
        .create(ResourceKind::Services, &EntityDraft::new().with("title", "Cloud"), &[])
        .await;

    let message = match result {
        Err(ClientError::ServerValidation { status: 400, message }) => message,
        other => panic!("expected a validation error, got {:?}", other),
    };
    assert!(message.contains("description"));
    assert_eq!(notifier.notices(), vec![Notice::Error(message)]);
}

#[actix_rt::test]
async fn rejected_tokens_end_the_session_quietly() {
    let app = TestApp::spawn().await;
    let (service, notifier) = client_for(&app, "expired-token");

    let result = service
        .toggle_service("00000000-0000-0000-0000-000000000000")
        .await;

    assert_eq!(result, Err(ClientError::AuthExpired));
    assert!(service.session().login_required());
    assert!(!service.session().is_authenticated());
    assert!(notifier.notices().is_empty());
}

#[actix_rt::test]
async fn toggling_a_service_refreshes_its_lists() {
    let app = TestApp::spawn().await;
    let (service, _) = client_for(&app, &app.admin_token);
    let kind = ResourceKind::Services;

    let created = service
        .create(
            kind,
            &EntityDraft::new()
                .with("title", "Cloud")
                .with("description", "Managed hosting")
                .with("features", FieldValue::list(["backups", "tls"])),
            &[],
        )
        .await
        .unwrap();
    let id = created["_id"].as_str().unwrap();

    assert_eq!(service.list(kind, Scope::Public).await.unwrap().len(), 1);

    let toggled = service.toggle_service(id).await.unwrap();
    assert_eq!(toggled["active"], false);

    assert!(service.list(kind, Scope::Public).await.unwrap().is_empty());
    assert_eq!(service.list(kind, Scope::Admin).await.unwrap().len(), 1);

    service
        .update(kind, id, &EntityDraft::new().with("features", FieldValue::Clear), &[])
        .await
        .unwrap();
    let admin = service.list(kind, Scope::Admin).await.unwrap();
    assert_eq!(admin[0]["features"], json!([]));
}
