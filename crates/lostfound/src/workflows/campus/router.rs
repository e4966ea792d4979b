use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    ClaimId, ClaimResponse, ClaimSubmission, ClaimVerification, Item, ItemId, ItemQuery,
    ItemReport, ItemStatus, ItemUpdate, ItemVerification, NotificationId, Page, Registration,
    SettingUpdate, User, UserId,
};
use super::repository::{CampusRepository, RepositoryError};
use super::service::{CampusService, ServiceError};
use super::views::{
    AccountView, AddressedNotificationView, AuditLogView, ClaimReviewView, ItemDetailView,
    ItemStateView, ItemView, MyClaimView, NotificationView, PendingItemView, PersonRef,
    SettingView, TokenResponse, UserView,
};

const PUBLIC_PAGE_LIMIT: usize = 100;
const QUEUE_PAGE_LIMIT: usize = 50;

type SharedService<R> = Arc<CampusService<R>>;

/// Router exposing the public, user, and staff endpoints.
pub fn campus_router<R>(service: SharedService<R>) -> Router
where
    R: CampusRepository + 'static,
{
    Router::new()
        .route("/", get(banner))
        .route("/api/auth/register", post(register::<R>))
        .route("/api/auth/login", post(login::<R>))
        .route("/api/users/me", get(me::<R>))
        .route("/api/items", post(report_item::<R>).get(list_items::<R>))
        .route("/api/items/:item_id", get(item::<R>).put(update_item::<R>))
        .route("/api/items/:item_id/mark-found", post(mark_found::<R>))
        .route("/api/items/:item_id/claim", post(submit_claim::<R>))
        .route("/api/my-claims", get(my_claims::<R>))
        .route("/api/claims/:claim_id/respond", post(respond_to_claim::<R>))
        .route("/api/stats", get(stats::<R>))
        .route("/api/notifications", get(notifications::<R>))
        .route("/api/notifications/unread/count", get(unread_count::<R>))
        .route(
            "/api/notifications/:notification_id/read",
            post(mark_notification_read::<R>),
        )
        .route("/api/notifications/mark-all-read", post(mark_all_read::<R>))
        .merge(admin_routes::<R>())
        .with_state(service)
}

fn admin_routes<R>() -> Router<SharedService<R>>
where
    R: CampusRepository + 'static,
{
    Router::new()
        .route("/api/admin/dashboard/stats", get(dashboard_stats::<R>))
        .route("/api/admin/items/pending", get(pending_items::<R>))
        .route("/api/admin/items/:item_id/full", get(item_dossier::<R>))
        .route("/api/admin/items/:item_id/verify", post(verify_item::<R>))
        .route("/api/admin/items/:item_id/release", post(release_item::<R>))
        .route("/api/admin/items/:item_id/lift-hold", post(lift_hold::<R>))
        .route("/api/admin/items/:item_id/archive", post(archive_item::<R>))
        .route("/api/admin/items/:item_id/dispose", post(dispose_item::<R>))
        .route("/api/admin/claims/pending", get(pending_claims::<R>))
        .route("/api/admin/claims/:claim_id/verify", post(verify_claim::<R>))
        .route("/api/admin/notifications", get(all_notifications::<R>))
        .route("/api/admin/audit-logs", get(audit_logs::<R>))
        .route(
            "/api/admin/settings",
            get(settings::<R>).put(update_setting::<R>),
        )
        .route("/api/admin/users", get(users::<R>))
        .route("/api/admin/users/:user_id/activity", get(user_activity::<R>))
}

/// Signed-in, active user resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Signed-in user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl<R> FromRequestParts<SharedService<R>> for CurrentUser
where
    R: CampusRepository + 'static,
{
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        service: &SharedService<R>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ServiceError::Unauthenticated)?;
        service.authenticate(token).map(CurrentUser)
    }
}

#[axum::async_trait]
impl<R> FromRequestParts<SharedService<R>> for AdminUser
where
    R: CampusRepository + 'static,
{
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        service: &SharedService<R>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, service).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

/// JSON body whose rejections surface as `400 {"error": ..}` like every other failure.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

/// Query string counterpart of [`ApiJson`].
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

/// URL-encoded form counterpart of [`ApiJson`].
#[derive(Debug, Clone)]
pub struct ApiForm<T>(pub T);

/// Path parameter counterpart of [`ApiJson`].
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ServiceError::Validation(rejection.body_text())),
        }
    }
}

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(value)) => Ok(ApiForm(value)),
            Err(rejection) => Err(ServiceError::Validation(rejection.body_text())),
        }
    }
}

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ServiceError::Validation(rejection.body_text())),
        }
    }
}

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(ServiceError::Validation(rejection.body_text())),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) | ServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_)
            | ServiceError::Lifecycle(_)
            | ServiceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            ServiceError::InvalidCredentials | ServiceError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::InactiveUser | ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Repository(_) | ServiceError::Auth(_) => {
                error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

fn page(skip: Option<usize>, limit: Option<usize>, default_limit: usize) -> Page {
    Page::new(skip.unwrap_or(0), limit.unwrap_or(default_limit))
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

async fn banner() -> Json<serde_json::Value> {
    Json(json!({ "message": "Lost and Found System API", "status": "running" }))
}

pub(crate) async fn register<R>(
    State(service): State<SharedService<R>>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<Json<TokenResponse>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let session = service.register(registration)?;
    Ok(Json(TokenResponse::from(&session)))
}

/// OAuth2 password-form fields; `username` carries the email address.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub(crate) async fn login<R>(
    State(service): State<SharedService<R>>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let session = service.login(&form.username, &form.password)?;
    Ok(Json(TokenResponse::from(&session)))
}

async fn me<R>(CurrentUser(user): CurrentUser) -> Json<UserView>
where
    R: CampusRepository + 'static,
{
    Json(UserView::from(&user))
}

pub(crate) async fn report_item<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(reporter): CurrentUser,
    ApiJson(report): ApiJson<ItemReport>,
) -> Result<Json<ItemView>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.report_item(&reporter, report)?;
    Ok(Json(ItemView::new(&item, &reporter)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemListParams {
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub q: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

async fn list_items<R>(
    State(service): State<SharedService<R>>,
    ApiQuery(params): ApiQuery<ItemListParams>,
) -> Result<Json<Vec<ItemView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let query = ItemQuery {
        status: params.status,
        category: non_empty(params.category),
        location: non_empty(params.location),
        text: non_empty(params.q),
    };
    let items = service.list_items(&query, page(params.skip, params.limit, PUBLIC_PAGE_LIMIT))?;
    Ok(Json(items.iter().map(ItemView::from).collect()))
}

async fn item<R>(
    State(service): State<SharedService<R>>,
    viewer: Option<CurrentUser>,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Json<ItemView>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let viewer = viewer.map(|CurrentUser(user)| user);
    let reported = service.item(ItemId(item_id), viewer.as_ref())?;
    Ok(Json(ItemView::from(&reported)))
}

async fn update_item<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(reporter): CurrentUser,
    ApiPath(item_id): ApiPath<u64>,
    ApiJson(update): ApiJson<ItemUpdate>,
) -> Result<Json<ItemView>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.update_item(&reporter, ItemId(item_id), update)?;
    Ok(Json(ItemView::new(&item, &reporter)))
}

async fn mark_found<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.mark_found(&actor, ItemId(item_id))?;
    Ok(Json(json!({
        "message": "Item marked as found successfully",
        "item": ItemStateView::from(&item),
    }))
    .into_response())
}

pub(crate) async fn submit_claim<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(claimant): CurrentUser,
    ApiPath(item_id): ApiPath<u64>,
    ApiJson(submission): ApiJson<ClaimSubmission>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let claim = service.submit_claim(&claimant, ItemId(item_id), submission)?;
    Ok(Json(json!({
        "message": "Claim submitted successfully and is pending admin approval",
        "claimId": claim.id,
    }))
    .into_response())
}

async fn my_claims<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(claimant): CurrentUser,
) -> Result<Json<Vec<MyClaimView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let claims = service.my_claims(&claimant)?;
    Ok(Json(
        claims
            .iter()
            .map(|(claim, item)| MyClaimView::new(claim, item))
            .collect(),
    ))
}

async fn respond_to_claim<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(claimant): CurrentUser,
    ApiPath(claim_id): ApiPath<u64>,
    ApiJson(response): ApiJson<ClaimResponse>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let claim = service.respond_to_claim(&claimant, ClaimId(claim_id), response)?;
    Ok(Json(json!({
        "message": "Additional information submitted",
        "claimId": claim.id,
        "status": claim.status,
    }))
    .into_response())
}

async fn stats<R>(State(service): State<SharedService<R>>) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    Ok(Json(service.public_stats()?).into_response())
}

async fn notifications<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<NotificationView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let notifications = service.notifications_for(&user)?;
    Ok(Json(notifications.iter().map(NotificationView::from).collect()))
}

async fn unread_count<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<serde_json::Value>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let count = service.unread_count(&user)?;
    Ok(Json(json!({ "count": count })))
}

async fn mark_notification_read<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
    ApiPath(notification_id): ApiPath<u64>,
) -> Result<Json<serde_json::Value>, ServiceError>
where
    R: CampusRepository + 'static,
{
    service.mark_notification_read(&user, NotificationId(notification_id))?;
    Ok(message("Notification marked as read"))
}

async fn mark_all_read<R>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<serde_json::Value>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let updated = service.mark_all_read(&user)?;
    Ok(Json(json!({
        "message": "All notifications marked as read",
        "updated": updated,
    })))
}

async fn dashboard_stats<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    Ok(Json(service.dashboard_stats(&admin)?).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

async fn pending_items<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<PendingItemView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let items = service.pending_items(&admin, page(params.skip, params.limit, QUEUE_PAGE_LIMIT))?;
    Ok(Json(items.iter().map(PendingItemView::from).collect()))
}

async fn item_dossier<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Json<ItemDetailView>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let dossier = service.item_dossier(&admin, ItemId(item_id))?;
    Ok(Json(ItemDetailView::from(&dossier)))
}

pub(crate) async fn verify_item<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(item_id): ApiPath<u64>,
    ApiJson(verification): ApiJson<ItemVerification>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let (outcome, dossier) = service.verify_item(&admin, ItemId(item_id), verification)?;
    Ok(Json(json!({
        "message": outcome,
        "item": ItemDetailView::from(&dossier),
    }))
    .into_response())
}

fn item_action(text: &str, item: &Item) -> Response {
    Json(json!({
        "message": text,
        "item": ItemStateView::from(item),
    }))
    .into_response()
}

async fn release_item<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.release_item(&admin, ItemId(item_id))?;
    Ok(item_action("Item released to claimant", &item))
}

async fn lift_hold<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.lift_hold(&admin, ItemId(item_id))?;
    Ok(item_action("Hold lifted", &item))
}

async fn archive_item<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.archive_item(&admin, ItemId(item_id))?;
    Ok(item_action("Item archived", &item))
}

async fn dispose_item<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(item_id): ApiPath<u64>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let item = service.dispose_item(&admin, ItemId(item_id))?;
    Ok(item_action("Item disposed", &item))
}

async fn pending_claims<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<ClaimReviewView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let claims = service.pending_claims(&admin, page(params.skip, params.limit, QUEUE_PAGE_LIMIT))?;
    Ok(Json(claims.iter().map(ClaimReviewView::from).collect()))
}

pub(crate) async fn verify_claim<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(claim_id): ApiPath<u64>,
    ApiJson(verification): ApiJson<ClaimVerification>,
) -> Result<Json<serde_json::Value>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let outcome = service.verify_claim(&admin, ClaimId(claim_id), verification)?;
    Ok(message(&outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationParams {
    pub user_id: Option<u64>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

async fn all_notifications<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiQuery(params): ApiQuery<NotificationParams>,
) -> Result<Json<Vec<AddressedNotificationView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let rows = service.all_notifications(
        &admin,
        params.user_id.map(UserId),
        page(params.skip, params.limit, PUBLIC_PAGE_LIMIT),
    )?;
    Ok(Json(
        rows.iter()
            .map(|(notification, user)| AddressedNotificationView {
                notification: NotificationView::from(notification),
                user: PersonRef::from(user),
            })
            .collect(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub action: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

async fn audit_logs<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiQuery(params): ApiQuery<AuditParams>,
) -> Result<Json<Vec<AuditLogView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let action = non_empty(params.action);
    let rows = service.audit_logs(
        &admin,
        action.as_deref(),
        page(params.skip, params.limit, PUBLIC_PAGE_LIMIT),
    )?;
    Ok(Json(
        rows.iter()
            .map(|(entry, admin)| AuditLogView::new(entry, admin))
            .collect(),
    ))
}

async fn settings<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<SettingView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let settings = service.settings(&admin)?;
    Ok(Json(settings.iter().map(SettingView::from).collect()))
}

async fn update_setting<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiJson(update): ApiJson<SettingUpdate>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    let setting = service.update_setting(&admin, update)?;
    Ok(Json(json!({
        "message": "Setting updated successfully",
        "setting": SettingView::from(&setting),
    }))
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchParams {
    pub search: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

async fn users<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiQuery(params): ApiQuery<UserSearchParams>,
) -> Result<Json<Vec<AccountView>>, ServiceError>
where
    R: CampusRepository + 'static,
{
    let users = service.users(
        &admin,
        params.search.as_deref(),
        page(params.skip, params.limit, PUBLIC_PAGE_LIMIT),
    )?;
    Ok(Json(users.iter().map(AccountView::from).collect()))
}

async fn user_activity<R>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    ApiPath(user_id): ApiPath<u64>,
) -> Result<Response, ServiceError>
where
    R: CampusRepository + 'static,
{
    Ok(Json(service.user_activity(&admin, UserId(user_id))?).into_response())
}
