use jsonwebtoken::{DecodingKey, decode};
use std::sync::Arc;
use tokio::net::TcpListener;
use trailwalks::{
    AppConfig, AppState, MockImageStore, MockRepository, create_router,
    auth::{Claims, create_jwt_token, token_validation},
    handlers::MAX_IMAGE_BYTES,
    models::{DifficultyDto, RegionDto, WalkDto},
    repository::RepositoryState,
    storage::ImageStoreState,
};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub config: AppConfig,
}

/// Boots the full router on a random port, backed by the in-memory mocks.
/// No database or disk is touched, so the whole suite runs anywhere.
async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(MockRepository::new())).await
}

async fn spawn_app_with(repo: RepositoryState) -> TestApp {
    let config = AppConfig::default();
    let images = Arc::new(MockImageStore::new()) as ImageStoreState;

    let state = AppState {
        repo,
        images,
        config: config.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, config }
}

/// Mints a token directly with the test config; tokens are self-contained so
/// no matching user row needs to exist for the gates to accept them.
fn token_with_roles(app: &TestApp, roles: &[&str]) -> String {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    create_jwt_token("tester@test.com", &roles, &app.config).unwrap()
}

async fn create_region(
    client: &reqwest::Client,
    app: &TestApp,
    token: &str,
    code: &str,
    name: &str,
) -> RegionDto {
    let response = client
        .post(format!("{}/api/regions", app.address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "code": code, "name": name, "region_image_url": null }))
        .send()
        .await
        .expect("region create failed");
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

async fn create_walk(
    client: &reqwest::Client,
    app: &TestApp,
    token: &str,
    name: &str,
    length_in_km: f64,
    region_id: Uuid,
    difficulty_id: Uuid,
) -> WalkDto {
    let response = client
        .post(format!("{}/api/walks", app.address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": name,
            "description": "A scenic track",
            "length_in_km": length_in_km,
            "walk_image_url": null,
            "difficulty_id": difficulty_id,
            "region_id": region_id,
        }))
        .send()
        .await
        .expect("walk create failed");
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

// --- Health & Access Control ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // No token at all.
    let response = client
        .get(format!("{}/api/walks", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Garbage token.
    let response = client
        .get(format!("{}/api/walks", app.address))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_reader_token_cannot_write() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let reader = token_with_roles(&app, &["Reader"]);

    // Reads are allowed.
    let response = client
        .get(format!("{}/api/regions", app.address))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Mutations are not: authenticated but lacking the Writer role.
    let response = client
        .post(format!("{}/api/regions", app.address))
        .bearer_auth(&reader)
        .json(&serde_json::json!({ "code": "AKL", "name": "Auckland", "region_image_url": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_writer_token_can_read() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let response = client
        .get(format!("{}/api/walks", app.address))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

// --- Auth Flows ---

#[tokio::test]
async fn test_register_and_login_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": "hiker@test.com",
            "password": "secret-pass",
            "roles": ["Reader", "Writer"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "User was registered! Please login."
    );

    let response = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "username": "hiker@test.com",
            "password": "secret-pass",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["jwtToken"].as_str().expect("jwtToken missing");

    // The issued token carries Writer, so a mutation goes through.
    let response = client
        .post(format!("{}/api/regions", app.address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "code": "BOP", "name": "Bay of Plenty", "region_image_url": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_login_token_roles_follow_registration_order() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Registered with Writer before Reader; the claim order must match.
    client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": "ordered@test.com",
            "password": "secret-pass",
            "roles": ["Writer", "Reader"],
        }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "username": "ordered@test.com",
            "password": "secret-pass",
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["jwtToken"].as_str().unwrap();

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(app.config.jwt_secret.as_bytes()),
        &token_validation(&app.config),
    )
    .unwrap();
    assert_eq!(decoded.claims.roles, vec!["Writer", "Reader"]);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": "known@test.com",
            "password": "secret-pass",
            "roles": ["Reader"],
        }))
        .send()
        .await
        .unwrap();

    // Unknown username.
    let unknown = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "username": "ghost@test.com", "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    let unknown_status = unknown.status();
    let unknown_body = unknown.text().await.unwrap();

    // Known username, wrong password.
    let wrong = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "username": "known@test.com", "password": "wrong-pass" }))
        .send()
        .await
        .unwrap();
    let wrong_status = wrong.status();
    let wrong_body = wrong.text().await.unwrap();

    assert_eq!(unknown_status, 400);
    assert_eq!(wrong_status, 400);
    assert_eq!(unknown_body, wrong_body);
    assert_eq!(unknown_body, "Username or password incorrect");
}

#[tokio::test]
async fn test_registration_with_unknown_role_leaves_no_identity() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": "pending@test.com",
            "password": "secret-pass",
            "roles": ["Reader", "Admin"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Something went wrong");

    // The failed registration must not have created the user at all.
    let response = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "username": "pending@test.com", "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_duplicate_registration_fails_generically() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "username": "repeat@test.com",
        "password": "secret-pass",
        "roles": ["Reader"],
    });

    let first = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
    assert_eq!(second.text().await.unwrap(), "Something went wrong");
}

#[tokio::test]
async fn test_register_rejects_weak_input() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Not an email, password too short: both complaints in one response.
    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({ "username": "nobody", "password": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"password"));
}

// --- Region CRUD ---

#[tokio::test]
async fn test_region_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let created = create_region(&client, &app, &writer, "AKL", "Auckland").await;

    // Read back by id.
    let response = client
        .get(format!("{}/api/regions/{}", app.address, created.id))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let fetched: RegionDto = response.json().await.unwrap();
    assert_eq!(fetched.code, "AKL");

    // Update.
    let response = client
        .put(format!("{}/api/regions/{}", app.address, created.id))
        .bearer_auth(&writer)
        .json(&serde_json::json!({ "code": "AKL", "name": "Tamaki Makaurau", "region_image_url": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: RegionDto = response.json().await.unwrap();
    assert_eq!(updated.name, "Tamaki Makaurau");

    // Delete echoes the deleted representation.
    let response = client
        .delete(format!("{}/api/regions/{}", app.address, created.id))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let deleted: RegionDto = response.json().await.unwrap();
    assert_eq!(deleted.id, created.id);

    // Gone.
    let response = client
        .get(format!("{}/api/regions/{}", app.address, created.id))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_region_validation_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let response = client
        .post(format!("{}/api/regions", app.address))
        .bearer_auth(&writer)
        .json(&serde_json::json!({ "code": "A", "name": "", "region_image_url": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"code"));
    assert!(fields.contains(&"name"));
}

// --- Walk CRUD & Listing ---

#[tokio::test]
async fn test_walk_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let region = create_region(&client, &app, &writer, "WGN", "Wellington").await;
    let difficulties: Vec<DifficultyDto> = client
        .get(format!("{}/api/difficulties", app.address))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let easy = difficulties.iter().find(|d| d.name == "Easy").unwrap();

    let walk = create_walk(&client, &app, &writer, "Harbour Loop", 5.5, region.id, easy.id).await;
    assert_eq!(walk.region.code, "WGN");
    assert_eq!(walk.difficulty.name, "Easy");

    // Single read resolves relations the same way.
    let response = client
        .get(format!("{}/api/walks/{}", app.address, walk.id))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let fetched: WalkDto = response.json().await.unwrap();
    assert_eq!(fetched.region.name, "Wellington");

    // Update.
    let response = client
        .put(format!("{}/api/walks/{}", app.address, walk.id))
        .bearer_auth(&writer)
        .json(&serde_json::json!({
            "name": "Harbour Loop Extended",
            "description": "A longer scenic track",
            "length_in_km": 7.0,
            "walk_image_url": null,
            "difficulty_id": easy.id,
            "region_id": region.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: WalkDto = response.json().await.unwrap();
    assert_eq!(updated.length_in_km, 7.0);

    // Delete echoes the joined representation, then the walk is gone.
    let response = client
        .delete(format!("{}/api/walks/{}", app.address, walk.id))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = client
        .get(format!("{}/api/walks/{}", app.address, walk.id))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_walk_listing_pipeline() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let region = create_region(&client, &app, &writer, "CAN", "Canterbury").await;
    let difficulties: Vec<DifficultyDto> = client
        .get(format!("{}/api/difficulties", app.address))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let medium = difficulties.iter().find(|d| d.name == "Medium").unwrap();

    create_walk(&client, &app, &writer, "Alpine Crossing", 12.0, region.id, medium.id).await;
    create_walk(&client, &app, &writer, "Beach Loop", 3.5, region.id, medium.id).await;
    create_walk(&client, &app, &writer, "Canyon Track", 8.0, region.id, medium.id).await;

    // Filter: recognition and matching are both case-insensitive.
    let walks: Vec<WalkDto> = client
        .get(format!(
            "{}/api/walks?filterOn=name&filterQuery=LOOP",
            app.address
        ))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(walks.len(), 1);
    assert_eq!(walks[0].name, "Beach Loop");

    // Sort by length, descending.
    let walks: Vec<WalkDto> = client
        .get(format!(
            "{}/api/walks?sortBy=Length&isAscending=false",
            app.address
        ))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = walks.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Alpine Crossing", "Canyon Track", "Beach Loop"]);

    // Pagination over the name-sorted view.
    let walks: Vec<WalkDto> = client
        .get(format!(
            "{}/api/walks?sortBy=Name&pageNumber=2&pageSize=1",
            app.address
        ))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(walks.len(), 1);
    assert_eq!(walks[0].name, "Beach Loop");

    // Unrecognized selectors degrade silently: everything comes back.
    let walks: Vec<WalkDto> = client
        .get(format!(
            "{}/api/walks?filterOn=bogus&filterQuery=zzz&sortBy=unknown",
            app.address
        ))
        .bearer_auth(&writer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(walks.len(), 3);
}

// --- Failure Surfaces ---

#[tokio::test]
async fn test_store_failure_returns_correlated_500() {
    let app = spawn_app_with(Arc::new(MockRepository::new_failing())).await;
    let client = reqwest::Client::new();
    let reader = token_with_roles(&app, &["Reader"]);

    let response = client
        .get(format!("{}/api/regions", app.address))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await.unwrap();
    // Correlation id plus a generic message; no internal detail leaks.
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    assert_eq!(
        body["error_message"],
        "Something went wrong, we are looking into resolving this."
    );
}

// --- Image Upload ---

#[tokio::test]
async fn test_image_upload_happy_path() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; 256]).file_name("summit-photo.PNG"),
        )
        .text("fileName", "summit-photo")
        .text("fileDescription", "View from the top");

    let response = client
        .post(format!("{}/api/images/upload", app.address))
        .bearer_auth(&writer)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    // Extension is normalized to lowercase before the allow-list check.
    assert_eq!(body["file_extension"], ".png");
    assert_eq!(body["file_size_in_bytes"], 256);
    assert!(
        body["file_path"]
            .as_str()
            .unwrap()
            .ends_with("/images/summit-photo.png")
    );
}

#[tokio::test]
async fn test_image_upload_accepts_multi_megabyte_file() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    // Well past the 2 MB default body limit axum would otherwise enforce,
    // well under the 10 MB cap.
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; 3 * 1024 * 1024]).file_name("panorama.jpg"),
        )
        .text("fileName", "panorama");

    let response = client
        .post(format!("{}/api/images/upload", app.address))
        .bearer_auth(&writer)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["file_size_in_bytes"], 3 * 1024 * 1024);
}

#[tokio::test]
async fn test_image_upload_size_cap_boundary() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    // Exactly at the cap is accepted.
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; MAX_IMAGE_BYTES]).file_name("at-cap.jpg"),
        )
        .text("fileName", "at-cap");
    let response = client
        .post(format!("{}/api/images/upload", app.address))
        .bearer_auth(&writer)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // One byte over gets the field-level size message, not a parse failure.
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; MAX_IMAGE_BYTES + 1])
                .file_name("over-cap.jpg"),
        )
        .text("fileName", "over-cap");
    let response = client
        .post(format!("{}/api/images/upload", app.address))
        .bearer_auth(&writer)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    let messages: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(
        messages.contains(&"File size more than 10MB, please upload a smaller size file"),
        "got {:?}",
        messages
    );
}

#[tokio::test]
async fn test_image_upload_rejects_bad_extension() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; 16]).file_name("clip.gif"),
        )
        .text("fileName", "clip");

    let response = client
        .post(format!("{}/api/images/upload", app.address))
        .bearer_auth(&writer)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_image_upload_requires_file_and_name() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let writer = token_with_roles(&app, &["Writer"]);

    // File present, target name missing.
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![0u8; 16]).file_name("photo.jpg"),
    );

    let response = client
        .post(format!("{}/api/images/upload", app.address))
        .bearer_auth(&writer)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"fileName"));
}
