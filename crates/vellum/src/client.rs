//! The stateful datastore client.
//!
//! A [`DatastoreClient`] binds a gateway session token, an HTTP client,
//! and a durable session store. Every operation is a sequential chain of
//! awaits - mount, root fetch, data mutation, root push - with the mount
//! cache and the device-root version map touched only between those
//! suspension points.

pub mod cache;
pub mod context;
pub mod discovery;
pub mod error;
pub mod files;
pub mod lifecycle;
pub mod session;

pub use cache::{MountCache, UserData};
pub use context::{CreationUrls, DevicePubkey, MountContext, ReaderMode};
pub use discovery::RootInfo;
pub use error::{Result, StoreError, StoreErrorKind};
pub use lifecycle::{CreateRequestInfo, DeleteRequestInfo, MountOptions, datastore_create_request};
pub use session::{SessionClaims, StorageClaims, decode_session_token};

use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;
use vellum_api::auth::GetCoreSessionToken;
use vellum_api::node::Ping;
use vellum_common::AuthToken;
use vellum_common::gateway::{GatewayExt, GatewayRequest, GatewayTransport, Response};
use vellum_common::storage::BlobStore;
use vellum_common::types::{DatastoreId, DeviceId};
use vellum_root::policy::ReplicationStrategy;

pub(crate) type RootVersionKey = (DatastoreId, Uuid, DeviceId);

/// Client for one gateway session.
pub struct DatastoreClient<S, T>
where
    S: BlobStore,
    T: GatewayTransport + Send + Sync,
{
    http: Arc<T>,
    base: Url,
    session_token: SmolStr,
    claims: SessionClaims,
    api_password: Option<SmolStr>,
    cache: MountCache<S>,
    default_strategy: ReplicationStrategy,
    // last observed device-root timestamp per (datastore, root uuid, device)
    root_versions: RwLock<HashMap<RootVersionKey, u64>>,
}

impl<S, T> DatastoreClient<S, T>
where
    S: BlobStore,
    T: GatewayTransport + Send + Sync,
{
    /// Build a client from an API node URL, a session token, and a
    /// durable store. Decodes the token's claims up front.
    pub fn new(
        http: T,
        base: Url,
        session_token: impl Into<SmolStr>,
        store: Arc<S>,
    ) -> Result<Self> {
        let session_token = session_token.into();
        let claims = decode_session_token(&session_token)
            .map_err(|e| StoreError::invalid(e.to_string()))?;
        Ok(Self {
            http: Arc::new(http),
            base,
            session_token,
            claims,
            api_password: None,
            cache: MountCache::new(store),
            default_strategy: ReplicationStrategy {
                local: 1,
                ..Default::default()
            },
            root_versions: RwLock::new(HashMap::new()),
        })
    }

    /// Attach the node API password for the auxiliary administrative
    /// create path.
    pub fn with_api_password(mut self, password: impl Into<SmolStr>) -> Self {
        self.api_password = Some(password.into());
        self
    }

    /// Replace the strategy used when an operation must create the
    /// datastore and no explicit drivers are configured.
    pub fn with_strategy(mut self, strategy: ReplicationStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// The decoded session claims.
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// The mount cache backing this client.
    pub fn cache(&self) -> &MountCache<S> {
        &self.cache
    }

    /// The API node this client talks to.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn default_strategy(&self) -> ReplicationStrategy {
        self.default_strategy
    }

    pub(crate) fn session_auth(&self) -> AuthToken {
        AuthToken::Session(self.session_token.clone())
    }

    pub(crate) fn api_password(&self) -> Option<&SmolStr> {
        self.api_password.as_ref()
    }

    /// The owner half of the cache key for this session: the blockchain
    /// id when the session carries one, the app keypair's datastore id
    /// otherwise.
    pub(crate) fn owner_key(&self) -> String {
        match &self.claims.blockchain_id {
            Some(bid) => bid.to_string(),
            None => self.claims.app_user_id.to_string(),
        }
    }

    /// Send a request under the session credential.
    pub(crate) async fn send<R>(&self, request: &R) -> Result<Response<R::Response>>
    where
        R: GatewayRequest,
    {
        Ok(self
            .http
            .gateway(self.base.clone())
            .auth(self.session_auth())
            .send(request)
            .await?)
    }

    /// Send a request under an explicit credential.
    pub(crate) async fn send_with_auth<R>(
        &self,
        request: &R,
        auth: AuthToken,
    ) -> Result<Response<R::Response>>
    where
        R: GatewayRequest,
    {
        Ok(self
            .http
            .gateway(self.base.clone())
            .auth(auth)
            .send(request)
            .await?)
    }

    pub(crate) async fn root_version(&self, key: &RootVersionKey) -> Option<u64> {
        self.root_versions.read().await.get(key).copied()
    }

    pub(crate) async fn set_root_version(&self, key: RootVersionKey, timestamp: u64) {
        self.root_versions.write().await.insert(key, timestamp);
    }

    /// Check gateway liveness. No credential required.
    pub async fn ping(&self) -> Result<bool> {
        let resp = self
            .http
            .gateway(self.base.clone())
            .send(&Ping {})
            .await?;
        let out = resp.parse()?;
        Ok(out.status == "alive")
    }

    /// Exchange a signed auth-request JWT for a gateway session token.
    /// Requires the node API password.
    pub async fn get_core_session_token(&self, auth_request: &str) -> Result<SmolStr> {
        let password = self.api_password.clone().ok_or_else(|| {
            StoreError::new(StoreErrorKind::Perm, None)
                .with_context("session issuance requires the node API password")
        })?;
        let req = GetCoreSessionToken {
            auth_request: auth_request.to_string(),
        };
        let out = self
            .send_with_auth(&req, AuthToken::ApiPassword(password))
            .await?
            .parse()?;
        Ok(out.token)
    }

    /// Force the next mount to treat the datastore as nonexistent, so
    /// mount-or-create retries the create. The external handle for
    /// recovering a create whose outcome was never observed.
    pub async fn datastore_create_set_retry(&self) -> Result<()> {
        let owner = self.owner_key();
        let app_name = self.claims.app_domain.clone();
        self.cache
            .set_partial_create_failure(&owner, &app_name)
            .await
    }
}
