mod test_utils;

use reqwest::{
    multipart::{Form, Part},
    StatusCode,
};
use serde_json::{json, Value};
use test_utils::*;

fn png_part(name: &str) -> Part {
    Part::bytes(PNG.to_vec())
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap()
}

async fn create_json(app: &TestApp, resource: &str, body: Value) -> Value {
    let response = app
        .client
        .post(app.url(&format!("api/{}", resource)))
        .bearer_auth(&app.admin_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json::<Value>().await.unwrap()["data"].clone()
}

#[actix_rt::test]
async fn home_lists_resources() {
    let app = TestApp::spawn().await;

    let body: Value = app.client.get(&app.address).send().await.unwrap().json().await.unwrap();

    assert_eq!(body["status"], "Ok");
    assert!(body["resources"].as_array().unwrap().contains(&json!("achievements")));
}

#[actix_rt::test]
async fn mutations_require_an_admin_token() {
    let app = TestApp::spawn().await;
    let service = json!({ "title": "Cloud", "description": "Hosting" });

    let anonymous = app.client.post(app.url("api/services")).json(&service).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let body: Value = anonymous.json().await.unwrap();
    assert_eq!(body["success"], false);

    let visitor = app
        .client
        .post(app.url("api/services"))
        .bearer_auth(&app.visitor_token)
        .json(&service)
        .send()
        .await
        .unwrap();
    assert_eq!(visitor.status(), StatusCode::FORBIDDEN);

    let garbage = app
        .client
        .delete(app.url("api/services/00000000-0000-0000-0000-000000000000"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn multipart_create_stores_files_and_serves_them() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .text("title", "Best Agency 2024")
        .text("featured", "true")
        .text("order", "2")
        .text("tags[0]", "award")
        .text("tags[1]", "design")
        .part("images", png_part("first.png"))
        .part("images", png_part("second.png"));

    let response = app
        .client
        .post(app.url("api/achievements"))
        .bearer_auth(&app.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = response.json::<Value>().await.unwrap()["data"].clone();
    assert_eq!(created["featured"], true);
    assert_eq!(created["order"], 2);
    assert_eq!(created["tags"], json!(["award", "design"]));

    let images = created["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["name"], "first.png");
    assert_eq!(images[1]["name"], "second.png");

    let url = images[0]["url"].as_str().unwrap();
    assert!(url.starts_with("uploads/images/"));

    let file = app.client.get(app.url(url)).send().await.unwrap();
    assert_eq!(file.status(), StatusCode::OK);
    assert_eq!(file.headers()["content-type"], "image/png");
    assert_eq!(file.bytes().await.unwrap().as_ref(), PNG);
}

#[actix_rt::test]
async fn update_keeps_retained_assets_appends_uploads_and_removes_dropped_files() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .text("title", "Portfolio")
        .part("images", png_part("a.png"))
        .part("images", png_part("b.png"));
    let created: Value = app
        .client
        .post(app.url("api/projects"))
        .bearer_auth(&app.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project = &created["data"];
    let id = project["_id"].as_str().unwrap();
    let kept = project["images"][1]["url"].as_str().unwrap().to_string();
    let dropped = project["images"][0]["url"].as_str().unwrap().to_string();

    let form = Form::new()
        .text("client", "ACME")
        .text("images[0][url]", kept.clone())
        .text("images[0][name]", "b.png")
        .part("images", png_part("c.png"));
    let response = app
        .client
        .put(app.url(&format!("api/projects/{}", id)))
        .bearer_auth(&app.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = response.json::<Value>().await.unwrap()["data"].clone();
    assert_eq!(updated["title"], "Portfolio");
    assert_eq!(updated["client"], "ACME");
    let images = updated["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["url"], kept.as_str());
    assert_eq!(images[1]["name"], "c.png");

    let gone = app.client.get(app.url(&dropped)).send().await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let still_there = app.client.get(app.url(&kept)).send().await.unwrap();
    assert_eq!(still_there.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn empty_bracket_tombstone_clears_a_list() {
    let app = TestApp::spawn().await;
    let project = create_json(&app, "projects", json!({ "title": "Site", "technologies": ["rust", "actix"] })).await;
    let id = project["_id"].as_str().unwrap();

    let untouched: Value = app
        .client
        .put(app.url(&format!("api/projects/{}", id)))
        .bearer_auth(&app.admin_token)
        .multipart(Form::new().text("client", "ACME"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(untouched["data"]["technologies"], json!(["rust", "actix"]));

    let cleared: Value = app
        .client
        .put(app.url(&format!("api/projects/{}", id)))
        .bearer_auth(&app.admin_token)
        .multipart(Form::new().text("technologies[]", ""))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["data"]["technologies"], json!([]));
}

#[actix_rt::test]
async fn list_shapes_and_filters() {
    let app = TestApp::spawn().await;
    create_json(&app, "achievements", json!({ "title": "One", "order": 1 })).await;
    create_json(&app, "achievements", json!({ "title": "Two", "order": 2, "active": false })).await;
    create_json(&app, "team", json!({ "name": "Ada", "position": "CTO", "socialLinks": { "github": "ada" } })).await;

    let achievements: Value = app
        .client
        .get(app.url("api/achievements?page=1&limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(achievements["success"], true);
    assert_eq!(achievements["data"]["achievements"].as_array().unwrap().len(), 2);
    assert_eq!(achievements["data"]["pagination"]["total"], 2);

    let active: Value = app
        .client
        .get(app.url("api/achievements?active=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = active["data"]["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["One"]);

    let team: Value = app.client.get(app.url("api/team")).send().await.unwrap().json().await.unwrap();
    assert_eq!(team["data"][0]["socialLinks"]["github"], "ada");

    let bad_limit = app.client.get(app.url("api/team?limit=0")).send().await.unwrap();
    assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn missing_required_fields_are_rejected_with_a_message() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("api/services"))
        .bearer_auth(&app.admin_token)
        .multipart(Form::new().text("description", "No title"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("title"));
}

#[actix_rt::test]
async fn services_toggle_between_active_and_inactive() {
    let app = TestApp::spawn().await;
    let service = create_json(&app, "services", json!({ "title": "Cloud", "description": "Hosting" })).await;
    let id = service["_id"].as_str().unwrap();
    assert_eq!(service["active"], true);

    let toggled: Value = app
        .client
        .patch(app.url(&format!("api/services/{}/toggle", id)))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["data"]["active"], false);

    let anonymous = app
        .client
        .patch(app.url(&format!("api/services/{}/toggle", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn contact_messages_are_public_to_send_and_private_to_read() {
    let app = TestApp::spawn().await;
    let message = json!({ "name": "Grace", "email": "grace@example.com", "message": "Let's work together" });

    let sent = app.client.post(app.url("api/contact")).json(&message).send().await.unwrap();
    assert_eq!(sent.status(), StatusCode::CREATED);

    let invalid = app
        .client
        .post(app.url("api/contact"))
        .json(&json!({ "name": "G", "email": "nope", "message": "Hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let anonymous = app.client.get(app.url("api/contact")).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let inbox: Value = app
        .client
        .get(app.url("api/contact"))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox["data"].as_array().unwrap().len(), 1);
    assert_eq!(inbox["data"][0]["read"], false);
}

#[actix_rt::test]
async fn delete_removes_the_entity_and_its_files() {
    let app = TestApp::spawn().await;
    let form = Form::new()
        .text("name", "Ada")
        .text("position", "CTO")
        .part("image", png_part("ada.png"));
    let created: Value = app
        .client
        .post(app.url("api/team"))
        .bearer_auth(&app.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["data"]["_id"].as_str().unwrap();
    let image = created["data"]["image"].as_str().unwrap();

    let deleted = app
        .client
        .delete(app.url(&format!("api/team/{}", id)))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);

    let fetched = app.client.get(app.url(&format!("api/team/{}", id))).send().await.unwrap();
    assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
    let file = app.client.get(app.url(image)).send().await.unwrap();
    assert_eq!(file.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn unknown_resources_and_bad_ids_are_rejected() {
    let app = TestApp::spawn().await;

    let unknown = app.client.get(app.url("api/blog")).send().await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let bad_id = app.client.get(app.url("api/services/not-a-uuid")).send().await.unwrap();
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);

    let traversal = app.client.get(app.url("uploads/images/..%2F..%2Fsecret")).send().await.unwrap();
    assert!(traversal.status().is_client_error());
}

#[actix_rt::test]
async fn non_image_uploads_are_refused() {
    let app = TestApp::spawn().await;
    let form = Form::new()
        .text("title", "Cloud")
        .text("description", "Hosting")
        .part("image", Part::bytes(b"#!/bin/sh".to_vec()).file_name("run.sh"));

    let response = app
        .client
        .post(app.url("api/services"))
        .bearer_auth(&app.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[actix_rt::test]
async fn absolute_asset_urls_are_not_stored() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("api/projects"))
        .bearer_auth(&app.admin_token)
        .json(&json!({ "title": "X", "images": [{ "url": "https://example.com/uploads/images/a.png" }] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "images");

    let listed: Value = app.client.get(app.url("api/projects")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed["data"], json!([]));
}

#[actix_rt::test]
async fn deleting_a_document_keeps_files_another_one_owns() {
    let app = TestApp::spawn().await;
    let form = Form::new().text("title", "A").part("images", png_part("a.png"));
    let owner: Value = app
        .client
        .post(app.url("api/projects"))
        .bearer_auth(&app.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let path = owner["data"]["images"][0]["url"].as_str().unwrap().to_string();

    let claimant = create_json(&app, "projects", json!({ "title": "B", "images": [{ "url": path.clone() }] })).await;
    assert_eq!(claimant["images"], json!([]));

    let response = app
        .client
        .delete(app.url(&format!("api/projects/{}", claimant["_id"].as_str().unwrap())))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let file = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(file.status(), StatusCode::OK);
}
