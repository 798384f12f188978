#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use fitcheck::{
        password::{Argon2Scheme, PasswordScheme},
        routes,
        state::{AppConfig, AppState, StorageConfig},
        store::{MemoryStore, Store},
        user::NewIdentity,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn config() -> AppConfig {
        AppConfig {
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            port: 0,
            session_secret: b"router-test-secret".to_vec(),
            database_url: None,
            storage: StorageConfig {
                upload_url: "http://storage.test".to_string(),
                public_url: "http://storage.test/objects".to_string(),
                signing_key: b"router-test-storage".to_vec(),
            },
        }
    }

    fn app() -> (Router, MemoryStore) {
        let store = MemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), &config());
        (routes::routes(state), store)
    }

    struct Reply {
        status: StatusCode,
        cookie: Option<String>,
        body: Value,
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Reply {
            status,
            cookie,
            body,
        }
    }

    async fn register(app: &Router, email: &str, username: &str) -> (String, Value) {
        let reply = call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": email, "username": username, "password": "correct-horse"})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        (reply.cookie.expect("session cookie"), reply.body["data"].clone())
    }

    #[tokio::test]
    async fn register_then_read_me() {
        let (app, _) = app();
        let (cookie, session) = register(&app, "A@X.com", "ada").await;
        assert_eq!(session["username"], "ada");

        let me = call(&app, Method::GET, "/api/me", Some(&cookie), None).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["status"], "ok");
        assert_eq!(me.body["data"]["email"], "a@x.com");
        assert!(me.body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (app, _) = app();
        register(&app, "a@x.com", "ada").await;

        let reply = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "b@x.com", "username": "ada", "password": "correct-horse"})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.body["error"]["kind"], "conflict");
    }

    #[tokio::test]
    async fn login_distinguishes_failures_only_by_message() {
        let (app, _) = app();
        register(&app, "a@x.com", "ada").await;

        let wrong = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.body["error"]["kind"], "authentication");
        assert_eq!(wrong.body["error"]["message"], "credential mismatch");

        let unknown = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "nobody@x.com", "password": "correct-horse"})),
        )
        .await;
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.body["error"]["message"], "no such user");

        let ok = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "correct-horse"})),
        )
        .await;
        assert_eq!(ok.status, StatusCode::OK);
        assert!(ok.cookie.is_some());
    }

    #[tokio::test]
    async fn unknown_fields_are_a_validation_error() {
        let (app, _) = app();
        let (cookie, _) = register(&app, "a@x.com", "ada").await;

        let reply = call(
            &app,
            Method::PATCH,
            "/api/me",
            Some(&cookie),
            Some(json!({"tagline": "hi", "admin": true})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"]["kind"], "validation");
        assert_eq!(reply.body["error"]["field"], "body");
    }

    #[tokio::test]
    async fn signed_out_requests_are_rejected() {
        let (app, _) = app();

        let reply = call(&app, Method::GET, "/api/me", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body["error"]["kind"], "unauthenticated");

        let session = call(&app, Method::GET, "/api/auth/session", None, None).await;
        assert_eq!(session.status, StatusCode::OK);
        assert_eq!(session.body["data"], Value::Null);

        let forged = call(
            &app,
            Method::GET,
            "/api/me",
            Some("fitcheck_session=not-a-token"),
            None,
        )
        .await;
        assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn like_toggles_and_self_like_is_forbidden() {
        let (app, _) = app();
        let (ada_cookie, ada) = register(&app, "a@x.com", "ada").await;
        let (bea_cookie, _) = register(&app, "b@x.com", "bea").await;
        let ada_id = ada["user_id"].as_str().unwrap().to_string();

        let like = call(
            &app,
            Method::POST,
            &format!("/api/likes/{ada_id}"),
            Some(&bea_cookie),
            None,
        )
        .await;
        assert_eq!(like.body["data"], json!({"liked": true, "count": 1}));

        let profile = call(&app, Method::GET, "/api/profiles/ada", Some(&bea_cookie), None).await;
        assert_eq!(profile.body["data"]["likes"], json!({"liked": true, "count": 1}));
        assert_eq!(profile.body["data"]["is_owner"], false);

        let unlike = call(
            &app,
            Method::POST,
            &format!("/api/likes/{ada_id}"),
            Some(&bea_cookie),
            None,
        )
        .await;
        assert_eq!(unlike.body["data"], json!({"liked": false, "count": 0}));

        let own = call(
            &app,
            Method::POST,
            &format!("/api/likes/{ada_id}"),
            Some(&ada_cookie),
            None,
        )
        .await;
        assert_eq!(own.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn duplicate_links_are_allowed_and_classified() {
        let (app, _) = app();
        let (cookie, _) = register(&app, "a@x.com", "ada").await;

        for _ in 0..2 {
            let reply = call(
                &app,
                Method::POST,
                "/api/me/links",
                Some(&cookie),
                Some(json!({"url": "https://www.instagram.com/ada"})),
            )
            .await;
            assert_eq!(reply.status, StatusCode::OK);
            assert_eq!(reply.body["data"]["type"], "instagram");
        }

        let bad = call(
            &app,
            Method::POST,
            "/api/me/links",
            Some(&cookie),
            Some(json!({"url": "javascript:alert(1)"})),
        )
        .await;
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.body["error"]["field"], "url");

        let me = call(&app, Method::GET, "/api/me", Some(&cookie), None).await;
        assert_eq!(me.body["data"]["links"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn posts_are_deleted_by_author_or_admin_only() {
        let (app, store) = app();
        let (ada_cookie, _) = register(&app, "a@x.com", "ada").await;
        let (bea_cookie, _) = register(&app, "b@x.com", "bea").await;

        store
            .create_identity(NewIdentity {
                username: "root".to_string(),
                email: "root@x.com".to_string(),
                password_hash: Some(Argon2Scheme.hash("admin-password").unwrap()),
                admin: true,
            })
            .await
            .unwrap();
        let admin = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "root@x.com", "password": "admin-password"})),
        )
        .await;
        let admin_cookie = admin.cookie.unwrap();

        let mut post_ids = vec![];
        for caption in ["one", "two"] {
            let created = call(
                &app,
                Method::POST,
                "/api/posts",
                Some(&ada_cookie),
                Some(json!({"caption": caption})),
            )
            .await;
            assert_eq!(created.status, StatusCode::OK);
            assert!(created.body["data"]["upload"]["url"]
                .as_str()
                .unwrap()
                .starts_with("http://storage.test/uploads/posts/"));
            post_ids.push(created.body["data"]["post"]["id"].as_str().unwrap().to_string());
        }

        let by_bea = call(
            &app,
            Method::DELETE,
            &format!("/api/posts/{}", post_ids[0]),
            Some(&bea_cookie),
            None,
        )
        .await;
        assert_eq!(by_bea.status, StatusCode::FORBIDDEN);

        let bea_as_admin = call(
            &app,
            Method::DELETE,
            &format!("/api/admin/posts/{}", post_ids[0]),
            Some(&bea_cookie),
            None,
        )
        .await;
        assert_eq!(bea_as_admin.status, StatusCode::FORBIDDEN);

        let by_admin = call(
            &app,
            Method::DELETE,
            &format!("/api/admin/posts/{}", post_ids[0]),
            Some(&admin_cookie),
            None,
        )
        .await;
        assert_eq!(by_admin.status, StatusCode::OK);

        let by_author = call(
            &app,
            Method::DELETE,
            &format!("/api/posts/{}", post_ids[1]),
            Some(&ada_cookie),
            None,
        )
        .await;
        assert_eq!(by_author.status, StatusCode::OK);

        let profile = call(&app, Method::GET, "/api/profiles/ada", None, None).await;
        assert_eq!(profile.body["data"]["posts"], json!([]));
    }

    #[tokio::test]
    async fn avatar_changes_only_once_the_upload_is_confirmed() {
        let (app, _) = app();
        let (cookie, _) = register(&app, "a@x.com", "ada").await;

        let target = call(&app, Method::POST, "/api/me/image", Some(&cookie), None).await;
        let key = target.body["data"]["key"].as_str().unwrap().to_string();
        let public_url = target.body["data"]["public_url"].as_str().unwrap().to_string();
        assert!(public_url.starts_with("http://storage.test/objects/avatars/"));

        let pending = call(&app, Method::GET, "/api/profiles/ada", None, None).await;
        assert_eq!(pending.body["data"]["image"], Value::Null);

        let confirmed = call(
            &app,
            Method::PUT,
            "/api/me/image",
            Some(&cookie),
            Some(json!({ "key": key })),
        )
        .await;
        assert_eq!(confirmed.status, StatusCode::OK);
        assert_eq!(confirmed.body["data"]["image"], public_url);

        let profile = call(&app, Method::GET, "/api/profiles/ada", None, None).await;
        assert_eq!(profile.body["data"]["image"], public_url);

        let cleared = call(&app, Method::DELETE, "/api/me/image", Some(&cookie), None).await;
        assert_eq!(cleared.body["data"]["image"], Value::Null);
    }

    #[tokio::test]
    async fn confirming_someone_elses_avatar_is_forbidden() {
        let (app, _) = app();
        let (ada, _) = register(&app, "a@x.com", "ada").await;
        let (bea, _) = register(&app, "b@x.com", "bea").await;

        let target = call(&app, Method::POST, "/api/me/image", Some(&ada), None).await;
        let key = target.body["data"]["key"].as_str().unwrap().to_string();

        let stolen = call(
            &app,
            Method::PUT,
            "/api/me/image",
            Some(&bea),
            Some(json!({ "key": key })),
        )
        .await;
        assert_eq!(stolen.status, StatusCode::FORBIDDEN);

        let post_key = call(
            &app,
            Method::PUT,
            "/api/me/image",
            Some(&ada),
            Some(json!({ "key": "posts/whatever" })),
        )
        .await;
        assert_eq!(post_key.status, StatusCode::FORBIDDEN);

        let profile = call(&app, Method::GET, "/api/profiles/bea", None, None).await;
        assert_eq!(profile.body["data"]["image"], Value::Null);
    }

    #[tokio::test]
    async fn page_sign_out_only_accepts_post() {
        let (app, _) = app();
        let (cookie, _) = register(&app, "a@x.com", "ada").await;

        let by_link = call(&app, Method::GET, "/logout", Some(&cookie), None).await;
        assert_eq!(by_link.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(by_link.cookie, None);

        let by_form = call(&app, Method::POST, "/logout", Some(&cookie), None).await;
        assert_eq!(by_form.status, StatusCode::SEE_OTHER);
        assert_eq!(by_form.cookie.as_deref(), Some("fitcheck_session="));
    }

    #[tokio::test]
    async fn pages_render_and_gate() {
        let (app, _) = app();

        let login = call(&app, Method::GET, "/login", None, None).await;
        assert_eq!(login.status, StatusCode::OK);

        let settings = call(&app, Method::GET, "/settings", None, None).await;
        assert_eq!(settings.status, StatusCode::SEE_OTHER);

        let missing = call(&app, Method::GET, "/u/nobody", None, None).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let health = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(health.body["status"], "ok");
    }
}
