//! Drives the real app and the storage fixture over HTTP with the client controller.

use std::net::SocketAddr;
use std::sync::Arc;

use fitcheck::{
    api_types::ErrorKind,
    client::{
        ClientContext, ClientError, HttpRpc, HttpUploader, PendingAction, ProfileController,
        ProfileForm, RpcError, StagedUpload, SubmitOutcome,
    },
    profile::LikeState,
    routes,
    state::{AppConfig, AppState, StorageConfig},
    storage::UploadSigner,
    store::MemoryStore,
    validation::RegisterRequest,
};
use fixtures::{spawn_server, storage_router, StorageState};

const STORAGE_KEY: &[u8] = b"flow-storage-key";

const PNG_HEADER: [u8; 16] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

struct Stack {
    app: SocketAddr,
    storage: StorageState,
}

async fn start_stack() -> Stack {
    start_stack_with_storage_key(STORAGE_KEY).await
}

/// The storage fixture verifies uploads with `storage_key`; the app always signs with [`STORAGE_KEY`]
async fn start_stack_with_storage_key(storage_key: &[u8]) -> Stack {
    let storage = StorageState::new(UploadSigner::new(storage_key, "", "http://unused"));
    let storage_addr = spawn_server(storage_router(storage.clone())).await.unwrap();

    let config = AppConfig {
        domain: "localhost".to_string(),
        protocol: "http".to_string(),
        port: 0,
        session_secret: b"flow-session-secret".to_vec(),
        database_url: None,
        storage: StorageConfig {
            upload_url: format!("http://{storage_addr}"),
            public_url: format!("http://{storage_addr}/objects"),
            signing_key: STORAGE_KEY.to_vec(),
        },
    };
    let state = AppState::new(Arc::new(MemoryStore::new()), &config);
    let app = spawn_server(routes::routes(state)).await.unwrap();

    Stack { app, storage }
}

fn controller(stack: &Stack) -> ProfileController<HttpRpc, HttpUploader> {
    ProfileController::new(
        HttpRpc::new(&format!("http://{}", stack.app)).unwrap(),
        HttpUploader::new(),
        ClientContext::new("/"),
    )
}

fn registration(email: &str, username: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        username: username.to_string(),
        password: "correct-horse".to_string(),
    }
}

#[tokio::test]
async fn avatar_and_tagline_are_saved_then_the_page_navigates() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();
    assert_eq!(ada.context().location(), "/u/ada");

    let form = ProfileForm {
        username: String::new(),
        tagline: "fits only".to_string(),
        staged: Some(StagedUpload::from_bytes(PNG_HEADER.to_vec()).unwrap()),
    };
    let outcome = ada.submit_profile(&form).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Navigated("/u/ada".to_string()));
    assert_eq!(stack.storage.object_count(), 1);

    let profile = ada.load_profile("ada").await.unwrap();
    assert!(profile.is_owner);
    assert_eq!(profile.tagline.as_deref(), Some("fits only"));

    let image = profile.image.expect("avatar url is set");
    let response = reqwest::get(&image).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
}

#[tokio::test]
async fn rejected_upload_leaves_the_avatar_untouched() {
    let stack = start_stack_with_storage_key(b"some-other-key").await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();

    let form = ProfileForm {
        username: "ada_two".to_string(),
        tagline: String::new(),
        staged: Some(StagedUpload::from_bytes(PNG_HEADER.to_vec()).unwrap()),
    };
    let result = ada.submit_profile(&form).await;

    assert!(matches!(result, Err(ClientError::Rpc(RpcError::Upload(_)))));
    assert_eq!(stack.storage.object_count(), 0);
    assert_eq!(ada.context().location(), "/u/ada");

    let me = ada.load_me().await.unwrap();
    assert_eq!(me.username, "ada");
    assert_eq!(me.image, None);

    let profile = ada.load_profile("ada").await.unwrap();
    assert_eq!(profile.image, None);
    assert_eq!(
        ada.context().session().map(|session| session.image),
        Some(None)
    );
}

#[tokio::test]
async fn rename_moves_the_canonical_url() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();

    let form = ProfileForm {
        username: "ada_two".to_string(),
        ..Default::default()
    };
    let outcome = ada.submit_profile(&form).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Navigated("/u/ada_two".to_string()));
    assert_eq!(
        ada.context().session().map(|session| session.username),
        Some("ada_two".to_string())
    );
    assert!(ada.load_profile("ada").await.is_err());
}

#[tokio::test]
async fn likes_toggle_between_two_users() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();
    let bea = controller(&stack);
    bea.register(registration("b@x.com", "bea")).await.unwrap();

    let before = bea.load_profile("ada").await.unwrap();
    assert_eq!(before.likes, LikeState { liked: false, count: 0 });

    let liked = bea.like_profile("ada").await.unwrap();
    assert_eq!(liked, LikeState { liked: true, count: 1 });

    let unliked = bea.like_profile("ada").await.unwrap();
    assert_eq!(unliked, LikeState { liked: false, count: 0 });

    // Liking yourself is refused and the optimistic flip is undone
    ada.load_profile("ada").await.unwrap();
    let own = ada.like_profile("ada").await;
    assert!(matches!(
        own,
        Err(ClientError::Rpc(RpcError::Server {
            kind: ErrorKind::Forbidden,
            ..
        }))
    ));
    let after = ada.load_profile("ada").await.unwrap();
    assert_eq!(after.likes, LikeState { liked: false, count: 0 });
}

#[tokio::test]
async fn duplicate_links_are_kept_in_order() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();

    let first = ada.add_link("https://twitter.com/ada").await.unwrap();
    let second = ada.add_link("https://twitter.com/ada").await.unwrap();
    assert_ne!(first.id, second.id);

    let me = ada.load_me().await.unwrap();
    let ids: Vec<_> = me.links.iter().map(|link| link.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    ada.delete_link(first.id).await.unwrap();
    let me = ada.load_me().await.unwrap();
    assert_eq!(me.links.len(), 1);
}

#[tokio::test]
async fn sign_in_checks_the_password() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();
    ada.sign_out().await.unwrap();
    assert!(ada.context().session().is_none());

    let wrong = ada.sign_in("a@x.com", "wrong-password").await;
    assert!(matches!(
        wrong,
        Err(ClientError::Rpc(RpcError::Server {
            kind: ErrorKind::Authentication,
            ..
        }))
    ));

    let session = ada.sign_in("A@X.com", "correct-horse").await.unwrap();
    assert_eq!(session.username, "ada");
    assert_eq!(ada.resume_session().await.unwrap(), Some(session));
}

#[tokio::test]
async fn deleted_account_signs_out_and_frees_the_username() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();

    ada.request(PendingAction::DeleteAccount);
    ada.confirm().await.unwrap();
    assert!(ada.context().session().is_none());
    assert_eq!(ada.resume_session().await.unwrap(), None);

    let again = controller(&stack);
    again
        .register(registration("a@x.com", "ada"))
        .await
        .unwrap();
}

#[tokio::test]
async fn only_authors_delete_posts() {
    let stack = start_stack().await;
    let ada = controller(&stack);
    ada.register(registration("a@x.com", "ada")).await.unwrap();
    let bea = controller(&stack);
    bea.register(registration("b@x.com", "bea")).await.unwrap();

    let staged = StagedUpload::from_bytes(PNG_HEADER.to_vec()).unwrap();
    let post = ada
        .publish_post(Some("monday fit".to_string()), &staged)
        .await
        .unwrap();
    assert_eq!(stack.storage.object_count(), 1);

    bea.request(PendingAction::DeletePost(post.id));
    let denied = bea.confirm().await;
    assert!(matches!(
        denied,
        Err(ClientError::Rpc(RpcError::Server {
            kind: ErrorKind::Forbidden,
            ..
        }))
    ));
    bea.report_post(post.id).await.unwrap();

    ada.request(PendingAction::DeletePost(post.id));
    ada.confirm().await.unwrap();
    assert!(ada.load_profile("ada").await.unwrap().posts.is_empty());
}
