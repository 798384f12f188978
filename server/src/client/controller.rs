use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use super::cache::{QueryData, QueryKey};
use super::context::{ClientContext, PendingAction, ToastLevel};
use super::optimistic::OptimisticUpdate;
use super::rpc::{Rpc, RpcError};
use super::upload::{ObjectUploader, StagedUpload};
use crate::profile::{LikeState, Post, ProfileLink, ProfileView};
use crate::session::Session;
use crate::user::{profile_path, MeView};
use crate::validation::{
    AddLinkRequest, ConfirmImageRequest, CreatePostRequest, EditProfileRequest, LoginRequest,
    RegisterRequest, Validate, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("another change is still being saved")]
    Busy,
    #[error("you need to sign in first")]
    NotSignedIn,
    #[error("{0} is not loaded")]
    NotLoaded(&'static str),
    #[error("there is nothing to confirm")]
    NothingToConfirm,
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Values currently entered in the profile edit form
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub username: String,
    pub tagline: String,
    pub staged: Option<StagedUpload>,
}

impl ProfileForm {
    /// The fields that are filled in and differ from what is stored
    pub fn changes(&self, username: &str, tagline: Option<&str>) -> EditProfileRequest {
        let entered_username = self.username.trim();
        let entered_tagline = self.tagline.trim();

        EditProfileRequest {
            username: (!entered_username.is_empty() && entered_username != username)
                .then(|| entered_username.to_string()),
            tagline: (!entered_tagline.is_empty() && Some(entered_tagline) != tagline)
                .then(|| entered_tagline.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing changed; no request was made
    NoOp,
    /// Saved; the context now points at this profile URL
    Navigated(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    SignedOut,
    PostRemoved(Uuid),
    UserRemoved(Uuid),
}

/// Resets the phase to idle however the operation ends, including by being dropped
struct PhaseGuard<'a> {
    phase: &'a watch::Sender<Phase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(Phase::Idle);
    }
}

/// Drives the mutations available on the profile page.
///
/// At most one mutation runs at a time; a second one fails with
/// [`ClientError::Busy`] until the first settles. Cache and context writes only
/// happen after the awaited calls, so dropping an operation's future cancels it
/// cleanly.
pub struct ProfileController<R, U> {
    rpc: R,
    uploader: U,
    context: ClientContext,
    phase: watch::Sender<Phase>,
}

impl<R: Rpc, U: ObjectUploader> ProfileController<R, U> {
    pub fn new(rpc: R, uploader: U, context: ClientContext) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            rpc,
            uploader,
            context,
            phase,
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch the phase, e.g. to disable controls while submitting
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn begin(&self) -> ClientResult<PhaseGuard<'_>> {
        let acquired = self.phase.send_if_modified(|phase| {
            if *phase == Phase::Idle {
                *phase = Phase::Submitting;
                true
            } else {
                false
            }
        });

        if acquired {
            Ok(PhaseGuard { phase: &self.phase })
        } else {
            Err(ClientError::Busy)
        }
    }

    /// Surface a failure as an error toast and hand it back to the caller
    fn report<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(err) = &result {
            warn!(error = %err, "Client operation failed");
            self.context.push_toast(ToastLevel::Error, err.to_string());
        }
        result
    }

    fn require_session(&self) -> ClientResult<Session> {
        self.context.session().ok_or(ClientError::NotSignedIn)
    }

    fn invalidate_own_profile(&self, session: &Session) {
        self.context.cache.invalidate(&QueryKey::Me);
        self.context
            .cache
            .invalidate(&QueryKey::Profile(session.username.clone()));
    }

    /// Upload the staged avatar (if any), then save the changed text fields,
    /// then refresh the session and navigate to the profile.
    pub async fn submit_profile(&self, form: &ProfileForm) -> ClientResult<SubmitOutcome> {
        let _guard = self.begin()?;
        let result = self.submit_profile_chain(form).await;
        self.report(result)
    }

    async fn submit_profile_chain(&self, form: &ProfileForm) -> ClientResult<SubmitOutcome> {
        let session = self.require_session()?;

        let (username, tagline) = match self.context.cache.get(&QueryKey::Me) {
            Some(QueryData::Me(me)) => (me.username, me.tagline),
            _ => (session.username.clone(), None),
        };
        let edit = form.changes(&username, tagline.as_deref());

        if edit.is_empty() && form.staged.is_none() {
            return Ok(SubmitOutcome::NoOp);
        }
        if !edit.is_empty() {
            edit.validate()?;
        }

        if let Some(file) = &form.staged {
            let target = self.rpc.set_image().await?;
            self.uploader.upload(&target, file).await?;
            let me = self
                .rpc
                .confirm_image(&ConfirmImageRequest { key: target.key })
                .await?;
            self.record_saved(me);
        }

        if !edit.is_empty() {
            let me = self.rpc.edit_profile(&edit).await?;
            self.record_saved(me);
        }

        let refreshed = self.rpc.refresh_session().await?;
        self.context
            .cache
            .invalidate(&QueryKey::Profile(refreshed.username.clone()));

        let url = profile_path(&refreshed.username);
        info!(user_id = %refreshed.user_id, %url, "Profile saved");
        self.context.set_session(Some(refreshed));
        self.context.navigate(&url);

        Ok(SubmitOutcome::Navigated(url))
    }

    /// Mirror a record the server has committed into the cache and the session
    fn record_saved(&self, me: MeView) {
        let cache = &self.context.cache;
        if let Some(previous) = self.context.session() {
            if previous.username != me.username {
                cache.remove(&QueryKey::Profile(previous.username));
            }
        }
        cache.invalidate(&QueryKey::Profile(me.username.clone()));

        self.context.set_session(Some(Session::from(&me)));
        cache.set(QueryKey::Me, QueryData::Me(me));
    }

    /// Toggle the like on a loaded profile, showing the result before the server answers
    pub async fn like_profile(&self, username: &str) -> ClientResult<LikeState> {
        let _guard = self.begin()?;
        let result = self.like_profile_chain(username).await;
        self.report(result)
    }

    async fn like_profile_chain(&self, username: &str) -> ClientResult<LikeState> {
        self.require_session()?;

        let key = QueryKey::Profile(username.to_string());
        let Some(QueryData::Profile(profile)) = self.context.cache.get(&key) else {
            return Err(ClientError::NotLoaded("profile"));
        };

        let update = OptimisticUpdate::apply(&self.context.cache, key, |data| {
            if let QueryData::Profile(profile) = data {
                profile.likes = profile.likes.toggled();
            }
        })
        .ok_or(ClientError::NotLoaded("profile"))?;

        let result = self.rpc.like_profile(profile.id).await;
        let key = update.settle(result.is_ok());

        self.context.cache.invalidate(&key);
        match self.rpc.get_profile(username).await {
            Ok(fresh) => self.context.cache.set(key, QueryData::Profile(fresh)),
            Err(err) => warn!(error = %err, "Could not refetch profile after like"),
        }

        Ok(result?)
    }

    /// Open the confirmation modal for a destructive action
    pub fn request(&self, action: PendingAction) {
        self.context.open_modal(action);
    }

    pub fn cancel(&self) {
        self.context.close_modal();
    }

    /// Run the action behind the open confirmation modal
    pub async fn confirm(&self) -> ClientResult<ConfirmOutcome> {
        let Some(action) = self.context.modal() else {
            return self.report(Err(ClientError::NothingToConfirm));
        };

        let _guard = self.begin()?;
        let result = self.run_destructive(action).await;
        self.context.close_modal();
        self.report(result)
    }

    async fn run_destructive(&self, action: PendingAction) -> ClientResult<ConfirmOutcome> {
        match action {
            PendingAction::DeleteAccount => {
                self.require_session()?;
                self.rpc.delete_profile().await?;
                self.forget_session();
                Ok(ConfirmOutcome::SignedOut)
            }
            PendingAction::DeletePost(post) => {
                self.rpc.delete_post(post).await?;
                self.forget_post();
                Ok(ConfirmOutcome::PostRemoved(post))
            }
            PendingAction::AdminDeletePost(post) => {
                self.rpc.admin_delete_post(post).await?;
                self.forget_post();
                Ok(ConfirmOutcome::PostRemoved(post))
            }
            PendingAction::AdminDeleteUser(user) => {
                self.rpc.admin_delete_user(user).await?;
                self.context
                    .cache
                    .invalidate_where(|key| matches!(key, QueryKey::Profile(_)));
                Ok(ConfirmOutcome::UserRemoved(user))
            }
        }
    }

    fn forget_session(&self) {
        self.context.set_session(None);
        self.context.cache.clear();
        self.context.navigate("/");
    }

    fn forget_post(&self) {
        self.context
            .cache
            .invalidate_where(|key| matches!(key, QueryKey::Profile(_)));
        self.context.dismiss_post();
    }

    pub async fn add_link(&self, url: &str) -> ClientResult<ProfileLink> {
        let _guard = self.begin()?;
        let result: ClientResult<ProfileLink> = async {
            let session = self.require_session()?;
            let request = AddLinkRequest {
                url: url.trim().to_string(),
            };
            request.validate()?;

            let link = self.rpc.add_link(&request).await?;
            self.invalidate_own_profile(&session);
            Ok(link)
        }
        .await;
        self.report(result)
    }

    pub async fn delete_link(&self, link: Uuid) -> ClientResult<()> {
        let _guard = self.begin()?;
        let result: ClientResult<()> = async {
            let session = self.require_session()?;
            self.rpc.delete_link(link).await?;
            self.invalidate_own_profile(&session);
            Ok(())
        }
        .await;
        self.report(result)
    }

    pub async fn remove_avatar(&self) -> ClientResult<MeView> {
        let _guard = self.begin()?;
        let result: ClientResult<MeView> = async {
            self.require_session()?;
            let me = self.rpc.delete_image().await?;
            let refreshed = self.rpc.refresh_session().await?;

            self.context.cache.set(QueryKey::Me, QueryData::Me(me.clone()));
            self.context
                .cache
                .invalidate(&QueryKey::Profile(refreshed.username.clone()));
            self.context.set_session(Some(refreshed));
            Ok(me)
        }
        .await;
        self.report(result)
    }

    /// Create a post and upload its image. A post whose upload fails is deleted again.
    pub async fn publish_post(
        &self,
        caption: Option<String>,
        image: &StagedUpload,
    ) -> ClientResult<Post> {
        let _guard = self.begin()?;
        let result: ClientResult<Post> = async {
            let session = self.require_session()?;
            let request = CreatePostRequest {
                caption: caption
                    .map(|caption| caption.trim().to_string())
                    .filter(|caption| !caption.is_empty()),
            };
            request.validate()?;

            let created = self.rpc.create_post(&request).await?;
            if let Err(err) = self.uploader.upload(&created.upload, image).await {
                if let Err(cleanup) = self.rpc.delete_post(created.post.id).await {
                    warn!(post_id = %created.post.id, error = %cleanup, "Could not remove post after failed upload");
                }
                return Err(err.into());
            }

            self.invalidate_own_profile(&session);
            Ok(created.post)
        }
        .await;
        self.report(result)
    }

    pub async fn report_post(&self, post: Uuid) -> ClientResult<()> {
        let _guard = self.begin()?;
        let result: ClientResult<()> = async {
            self.require_session()?;
            self.rpc.report_post(post).await?;
            self.context
                .push_toast(ToastLevel::Info, "Thanks, the post has been reported");
            Ok(())
        }
        .await;
        self.report(result)
    }

    pub async fn register(&self, request: RegisterRequest) -> ClientResult<Session> {
        let _guard = self.begin()?;
        let result: ClientResult<Session> = async {
            request.validate()?;
            let session = self.rpc.register(&request).await?;
            self.start_session(session.clone());
            Ok(session)
        }
        .await;
        self.report(result)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let _guard = self.begin()?;
        let result: ClientResult<Session> = async {
            let request = LoginRequest {
                email: email.to_string(),
                password: Some(password.to_string()),
            };
            request.validate()?;
            let session = self.rpc.login(&request).await?;
            self.start_session(session.clone());
            Ok(session)
        }
        .await;
        self.report(result)
    }

    fn start_session(&self, session: Session) {
        let url = profile_path(&session.username);
        self.context.cache.clear();
        self.context.set_session(Some(session));
        self.context.navigate(&url);
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        let _guard = self.begin()?;
        let result: ClientResult<()> = async {
            self.rpc.logout().await?;
            self.forget_session();
            Ok(())
        }
        .await;
        self.report(result)
    }

    /// Pick up an existing session cookie, e.g. on page load
    pub async fn resume_session(&self) -> ClientResult<Option<Session>> {
        let session = self.report(self.rpc.session().await.map_err(ClientError::from))?;
        self.context.set_session(session.clone());
        Ok(session)
    }

    /// Cached read of a profile; stale or missing entries are fetched
    pub async fn load_profile(&self, username: &str) -> ClientResult<ProfileView> {
        let key = QueryKey::Profile(username.to_string());
        if self.context.cache.is_fresh(&key) {
            if let Some(QueryData::Profile(profile)) = self.context.cache.get(&key) {
                return Ok(profile);
            }
        }

        let profile = self.report(self.rpc.get_profile(username).await.map_err(Into::into))?;
        self.context
            .cache
            .set(key, QueryData::Profile(profile.clone()));
        Ok(profile)
    }

    /// Cached read of the signed-in user's own record
    pub async fn load_me(&self) -> ClientResult<MeView> {
        if self.context.cache.is_fresh(&QueryKey::Me) {
            if let Some(QueryData::Me(me)) = self.context.cache.get(&QueryKey::Me) {
                return Ok(me);
            }
        }

        let me = self.report(self.rpc.get_me().await.map_err(Into::into))?;
        self.context.cache.set(QueryKey::Me, QueryData::Me(me.clone()));
        Ok(me)
    }
}
