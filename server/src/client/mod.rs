//! Typed client for the `/api` surface and the profile page controller built on it.
//!
//! [`Rpc`] and [`ObjectUploader`] are the network seams; [`HttpRpc`] and
//! [`HttpUploader`] are the `reqwest` implementations. [`ProfileController`]
//! drives every mutation on the profile page against a shared [`ClientContext`].

mod cache;
mod context;
mod controller;
mod optimistic;
mod rpc;
mod upload;

pub use cache::{QueryCache, QueryData, QueryKey};
pub use context::{ClientContext, PendingAction, Toast, ToastLevel};
pub use controller::{
    ClientError, ClientResult, ConfirmOutcome, Phase, ProfileController, ProfileForm,
    SubmitOutcome,
};
pub use optimistic::OptimisticUpdate;
pub use rpc::{HttpRpc, Rpc, RpcError, RpcResult};
pub use upload::{HttpUploader, ObjectUploader, StagedUpload, MAX_UPLOAD_BYTES};
