//! # API REST
//!
//! REST surface for the CMR case engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status mapping)
//!
//! Every mutating handler runs the same pipeline: extract the viewer claims
//! installed by the identity provider, check the authorization matrix, run
//! note-specific visibility/verification checks where applicable, and only
//! then touch the store. No endpoint accepts a client-declared role in its
//! body.

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::dto;
use api_shared::{viewer_claims, HealthService, ViewerClaims};
use cmr_core::authz::{self, Action, ResourceKind};
use cmr_core::model::{
    Assessment, AssessmentStatus, CaseItem, CasePatch, Document, ExternalContributor,
    ExternalUpload, Milestone, MilestoneStatus, Note, Report, ReportStatus, Role,
};
use cmr_core::sharing::{self, Notifier, TracingNotifier};
use cmr_core::verification::StaticCodeIssuer;
use cmr_core::{
    info_requests, milestones, timeline, visibility, CaseError, CaseStore, CoreConfig, NewCase,
    SessionGrants, Verification, VerificationGate,
};
use cmr_types::{EmailAddress, NonEmptyText};

pub mod views;

/// Optional optimistic-concurrency header: callers that read a case first
/// may send back the revision they saw; a mismatch yields 409.
pub const EXPECTED_REVISION_HEADER: &str = "x-expected-revision";

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CaseStore>,
    pub gate: VerificationGate,
    pub grants: Arc<SessionGrants>,
    pub notifier: Arc<dyn Notifier>,
}

/// Wires the default state: file-backed store, config-issued verification
/// code, in-memory session grants, tracing-backed notification handoff.
pub fn build_state(cfg: Arc<CoreConfig>) -> AppState {
    AppState {
        store: Arc::new(CaseStore::new(cfg.clone())),
        gate: VerificationGate::new(Arc::new(StaticCodeIssuer::from_config(&cfg))),
        grants: Arc::new(SessionGrants::new()),
        notifier: Arc::new(TracingNotifier),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_cases,
        create_case,
        get_case,
        get_timeline,
        get_milestones,
        create_milestone,
        patch_milestone,
        create_note,
        share_note,
        create_document,
        patch_document_tags,
        create_upload,
        create_assessment,
        patch_assessment,
        create_report,
        patch_report,
        create_info_request,
        answer_info_request,
        toggle_category_tag,
        add_contributor,
        expire_case,
        advance_stage,
        verify,
    ),
    components(schemas(
        dto::HealthRes,
        dto::CreateCaseReq,
        dto::ContributorReq,
        dto::ContributorRes,
        dto::ParticipantsRes,
        dto::CaseRes,
        dto::CaseSummaryRes,
        dto::ListCasesRes,
        dto::ToggleTagReq,
        dto::AdvanceStageReq,
        dto::CreateDocumentReq,
        dto::PatchDocumentTagsReq,
        dto::DocumentRes,
        dto::CreateUploadReq,
        dto::ExternalUploadRes,
        dto::CreateAssessmentReq,
        dto::PatchAssessmentReq,
        dto::AssessmentRes,
        dto::CreateReportReq,
        dto::PatchReportReq,
        dto::ReportRes,
        dto::CreateNoteReq,
        dto::NoteViewRes,
        dto::ShareNoteReq,
        dto::ShareNoteRes,
        dto::CreateInfoRequestReq,
        dto::AnswerInfoRequestReq,
        dto::InfoRequestRes,
        dto::CreateMilestoneReq,
        dto::PatchMilestoneReq,
        dto::MilestoneRes,
        dto::MilestonesRes,
        dto::TimelineEntryRes,
        dto::TimelineRes,
        dto::VerifyReq,
        dto::VerifyRes,
    ))
)]
struct ApiDoc;

/// Builds the REST router with Swagger UI and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cases", get(list_cases).post(create_case))
        .route("/cases/:id", get(get_case))
        .route("/cases/:id/timeline", get(get_timeline))
        .route("/cases/:id/milestones", get(get_milestones).post(create_milestone))
        .route("/cases/:id/milestones/:item_id", patch(patch_milestone))
        .route("/cases/:id/notes", post(create_note))
        .route("/cases/:id/documents", post(create_document))
        .route("/cases/:id/documents/:item_id", patch(patch_document_tags))
        .route("/cases/:id/uploads", post(create_upload))
        .route("/cases/:id/assessments", post(create_assessment))
        .route("/cases/:id/assessments/:item_id", patch(patch_assessment))
        .route("/cases/:id/reports", post(create_report))
        .route("/cases/:id/reports/:item_id", patch(patch_report))
        .route("/cases/:id/info-requests", post(create_info_request))
        .route("/cases/:id/tags", post(toggle_category_tag))
        .route("/cases/:id/contributors", post(add_contributor))
        .route("/cases/:id/expire", post(expire_case))
        .route("/cases/:id/stage", post(advance_stage))
        .route("/info-requests/:id/answers", post(answer_info_request))
        .route("/notes/:id/share", post(share_note))
        .route("/verify", post(verify))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type HandlerError = (StatusCode, String);

fn bad_request(msg: impl Into<String>) -> HandlerError {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn claims(headers: &HeaderMap) -> Result<ViewerClaims, HandlerError> {
    viewer_claims(headers).map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))
}

/// Maps engine errors to status codes. Storage failures are logged and
/// collapsed to an opaque 500; contract errors carry their message.
fn error_response(context: &str, err: CaseError) -> HandlerError {
    let status = match &err {
        CaseError::Validation(_) => StatusCode::BAD_REQUEST,
        CaseError::Authorization { .. } => StatusCode::FORBIDDEN,
        CaseError::Verification => StatusCode::FORBIDDEN,
        CaseError::NotFound(_) => StatusCode::NOT_FOUND,
        CaseError::StateConflict { .. } => StatusCode::CONFLICT,
        CaseError::StorageDirCreation(_)
        | CaseError::CaseDirCreation(_)
        | CaseError::FileWrite(_)
        | CaseError::FileRead(_)
        | CaseError::Serialization(_)
        | CaseError::Deserialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{context}: {err:?}");
        (status, "Internal error".to_string())
    } else {
        (status, err.to_string())
    }
}

fn parse_id(raw: &str) -> Result<Uuid, HandlerError> {
    Uuid::parse_str(raw).map_err(|_| bad_request(format!("invalid id: {raw}")))
}

fn parse_datetime(raw: &str, field: &str) -> Result<DateTime<Utc>, HandlerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| bad_request(format!("{field} must be an RFC 3339 timestamp")))
}

fn parse_text(raw: &str, field: &str) -> Result<NonEmptyText, HandlerError> {
    NonEmptyText::new(raw).map_err(|e| bad_request(format!("{field}: {e}")))
}

fn expected_revision(headers: &HeaderMap) -> Result<Option<u64>, HandlerError> {
    let Some(value) = headers.get(EXPECTED_REVISION_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| bad_request("x-expected-revision must be an unsigned integer"))
}

fn session_verified(state: &AppState, claims: &ViewerClaims) -> bool {
    claims
        .session_id
        .as_deref()
        .map(|session| state.grants.is_granted(session))
        .unwrap_or(false)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Health check response", body = dto::HealthRes))
)]
/// Health check endpoint used by monitoring and load balancers.
async fn health() -> Json<dto::HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/cases",
    responses(
        (status = 200, description = "Case summaries, newest intake first", body = dto::ListCasesRes),
        (status = 403, description = "Role may not view cases")
    )
)]
/// Lists all cases of the practice as summary rows with live progress.
async fn list_cases(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<dto::ListCasesRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::View, ResourceKind::Case)
        .map_err(|e| error_response("list cases", e))?;

    let cases = state.store.list().iter().map(views::summary_view).collect();
    Ok(Json(dto::ListCasesRes { cases }))
}

#[utoipa::path(
    post,
    path = "/cases",
    request_body = dto::CreateCaseReq,
    responses(
        (status = 200, description = "Case created on intake", body = dto::CaseRes),
        (status = 400, description = "Invalid intake data"),
        (status = 403, description = "Role may not create cases")
    )
)]
/// Creates a case on intake.
async fn create_case(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::CreateCaseReq>,
) -> Result<Json<dto::CaseRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::Case)
        .map_err(|e| error_response("create case", e))?;

    let created_date = req
        .created_date
        .as_deref()
        .map(|raw| parse_datetime(raw, "created_date"))
        .transpose()?;
    let expiry_date = parse_datetime(&req.expiry_date, "expiry_date")?;

    let mut others = Vec::with_capacity(req.contributors.len());
    for contributor in req.contributors {
        others.push(ExternalContributor {
            id: Uuid::new_v4(),
            role: contributor.role.parse().map_err(bad_request)?,
            email: EmailAddress::new(&contributor.email)
                .map_err(|e| bad_request(e.to_string()))?,
        });
    }

    let new_case = NewCase {
        claimant_name: parse_text(&req.claimant_name, "claimant_name")?,
        case_type: parse_text(&req.case_type, "case_type")?,
        created_date,
        expiry_date,
        category_tags: req.category_tags,
        participants: cmr_core::model::Participants {
            claimant: req.claimant,
            psychologist: req.psychologist,
            lawyer: req.lawyer,
            others,
        },
        current_stage: req.current_stage,
    };

    let case = state
        .store
        .create(new_case)
        .map_err(|e| error_response("create case", e))?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::case_view(&case, claims.role, verified)))
}

#[utoipa::path(
    get,
    path = "/cases/{id}",
    responses(
        (status = 200, description = "Aggregate view shaped for the viewer", body = dto::CaseRes),
        (status = 404, description = "Unknown case")
    )
)]
/// Fetches a case aggregate, shaped per viewer: note content is withheld
/// pending visibility and verification, reports omitted for ineligible
/// roles.
async fn get_case(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<dto::CaseRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::View, ResourceKind::Case)
        .map_err(|e| error_response("get case", e))?;

    let case_id = parse_id(&id)?;
    let case = state
        .store
        .get(case_id)
        .map_err(|e| error_response("get case", e))?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::case_view(&case, claims.role, verified)))
}

#[utoipa::path(
    get,
    path = "/cases/{id}/timeline",
    responses(
        (status = 200, description = "Full chronological activity feed", body = dto::TimelineRes),
        (status = 404, description = "Unknown case")
    )
)]
/// Derives the case's activity feed from the current aggregate.
async fn get_timeline(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<dto::TimelineRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::View, ResourceKind::Case)
        .map_err(|e| error_response("get timeline", e))?;

    let case_id = parse_id(&id)?;
    let case = state
        .store
        .get(case_id)
        .map_err(|e| error_response("get timeline", e))?;
    Ok(Json(views::timeline_view(timeline::build_timeline(&case))))
}

#[derive(Deserialize)]
struct MilestoneQuery {
    recent: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/cases/{id}/milestones",
    params(("recent" = Option<usize>, Query, description = "Return only the n most recent milestones")),
    responses(
        (status = 200, description = "Curated milestones", body = dto::MilestonesRes),
        (status = 404, description = "Unknown case")
    )
)]
/// Lists milestones chronologically, or the `n` most recent when asked.
async fn get_milestones(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<MilestoneQuery>,
) -> Result<Json<dto::MilestonesRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::View, ResourceKind::Milestone)
        .map_err(|e| error_response("get milestones", e))?;

    let case_id = parse_id(&id)?;
    let case = state
        .store
        .get(case_id)
        .map_err(|e| error_response("get milestones", e))?;

    let selected = match query.recent {
        Some(n) => milestones::recent(&case, n),
        None => milestones::sorted(&case),
    };
    let milestones = selected
        .iter()
        .map(|m| views::milestone_view(&case, m))
        .collect();
    Ok(Json(dto::MilestonesRes { milestones }))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/milestones",
    request_body = dto::CreateMilestoneReq,
    responses(
        (status = 200, description = "Milestone created", body = dto::MilestoneRes),
        (status = 400, description = "Invalid milestone"),
        (status = 403, description = "Role may not create milestones")
    )
)]
/// Flags a curated case event. Milestones are never auto-derived from the
/// timeline.
async fn create_milestone(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateMilestoneReq>,
) -> Result<Json<dto::MilestoneRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::Milestone)
        .map_err(|e| error_response("create milestone", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let status = match req.status.as_deref() {
        Some(raw) => raw.parse::<MilestoneStatus>().map_err(bad_request)?,
        None => MilestoneStatus::Pending,
    };
    let related_item_id = req
        .related_item_id
        .as_deref()
        .map(parse_id)
        .transpose()?;

    let milestone = Milestone {
        id: Uuid::new_v4(),
        kind: req.kind.parse().map_err(bad_request)?,
        title: parse_text(&req.title, "title")?,
        date: parse_datetime(&req.date, "date")?,
        description: req.description,
        status,
        related_item_id,
    };
    let milestone_id = milestone.id;

    let case = state
        .store
        .append(case_id, CaseItem::Milestone(milestone), revision)
        .map_err(|e| error_response("create milestone", e))?;
    let created = case
        .milestones
        .iter()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::milestone_view(&case, created)))
}

#[utoipa::path(
    patch,
    path = "/cases/{id}/milestones/{item_id}",
    request_body = dto::PatchMilestoneReq,
    responses(
        (status = 200, description = "Milestone status set", body = dto::MilestoneRes),
        (status = 404, description = "Unknown case or milestone")
    )
)]
/// Sets a milestone's status explicitly.
async fn patch_milestone(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath((id, item_id)): AxumPath<(String, String)>,
    Json(req): Json<dto::PatchMilestoneReq>,
) -> Result<Json<dto::MilestoneRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Milestone)
        .map_err(|e| error_response("patch milestone", e))?;

    let case_id = parse_id(&id)?;
    let milestone_id = parse_id(&item_id)?;
    let revision = expected_revision(&headers)?;
    let status = req.status.parse::<MilestoneStatus>().map_err(bad_request)?;

    let case = state
        .store
        .update(
            case_id,
            milestone_id,
            CasePatch::MilestoneStatus { status },
            revision,
        )
        .map_err(|e| error_response("patch milestone", e))?;
    let updated = case
        .milestones
        .iter()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::milestone_view(&case, updated)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/notes",
    request_body = dto::CreateNoteReq,
    responses(
        (status = 200, description = "Note appended", body = dto::NoteViewRes),
        (status = 400, description = "Invalid note shape"),
        (status = 403, description = "Role may not create notes")
    )
)]
/// Appends a note. Notes are append-only; there is no edit or delete
/// endpoint. The author identity comes from the verified claims, never the
/// body.
async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateNoteReq>,
) -> Result<Json<dto::NoteViewRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::Note)
        .map_err(|e| error_response("create note", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let visible_to = req
        .visible_to
        .iter()
        .map(|r| r.parse::<Role>())
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(bad_request)?;

    let note = Note {
        id: Uuid::new_v4(),
        content: parse_text(&req.content, "content")?,
        created_by: claims.identity.clone(),
        created_at: Utc::now(),
        is_private: req.is_private,
        visible_to,
        kind: req.kind.parse().map_err(bad_request)?,
    };

    cmr_core::validation::validate_note_for_author(&note, claims.role)
        .map_err(|e| error_response("create note", e))?;

    let note_id = note.id;
    let case = state
        .store
        .append(case_id, CaseItem::Note(note), revision)
        .map_err(|e| error_response("create note", e))?;
    let created = case
        .notes
        .iter()
        .find(|n| n.id == note_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::note_view(created, claims.role, verified)))
}

#[utoipa::path(
    post,
    path = "/notes/{id}/share",
    request_body = dto::ShareNoteReq,
    responses(
        (status = 200, description = "Share grant produced and handed off", body = dto::ShareNoteRes),
        (status = 400, description = "Consent missing or recipient invalid"),
        (status = 403, description = "Verification failed or note not visible"),
        (status = 404, description = "Unknown note")
    )
)]
/// Authorizes sharing a note with an external recipient. Requires consent
/// and a fresh verification code; on success the grant is handed to the
/// notification collaborator for transmission.
async fn share_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::ShareNoteReq>,
) -> Result<Json<dto::ShareNoteRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Share, ResourceKind::Note)
        .map_err(|e| error_response("share note", e))?;

    let note_id = parse_id(&id)?;
    let (_case, note) = state
        .store
        .find_note(note_id)
        .map_err(|e| error_response("share note", e))?;

    if !visibility::is_visible(&note, claims.role) {
        return Err((
            StatusCode::FORBIDDEN,
            format!("note is not visible to role {}", claims.role),
        ));
    }

    let grant = sharing::share_note(
        &state.gate,
        &note,
        &claims.identity,
        &req.recipient,
        req.consent,
        &req.code,
    )
    .map_err(|e| error_response("share note", e))?;

    state
        .notifier
        .deliver(&grant, &note)
        .map_err(|e| error_response("share note", e))?;

    Ok(Json(views::share_view(&grant)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/documents",
    request_body = dto::CreateDocumentReq,
    responses(
        (status = 200, description = "Document metadata appended", body = dto::DocumentRes),
        (status = 400, description = "Invalid document tags")
    )
)]
/// Records document metadata. The binary itself goes to the external file
/// storage collaborator.
async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateDocumentReq>,
) -> Result<Json<dto::DocumentRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::Document)
        .map_err(|e| error_response("create document", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let document = Document {
        id: Uuid::new_v4(),
        name: parse_text(&req.name, "name")?,
        uploaded_by: claims.identity.clone(),
        upload_date: Utc::now(),
        size: req.size,
        tags: req.tags,
    };
    let document_id = document.id;

    let case = state
        .store
        .append(case_id, CaseItem::Document(document), revision)
        .map_err(|e| error_response("create document", e))?;
    let created = case
        .documents
        .iter()
        .find(|d| d.id == document_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::document_view(created)))
}

#[utoipa::path(
    patch,
    path = "/cases/{id}/documents/{item_id}",
    request_body = dto::PatchDocumentTagsReq,
    responses(
        (status = 200, description = "Document tags replaced", body = dto::DocumentRes),
        (status = 404, description = "Unknown case or document")
    )
)]
/// Edits a document's tags: the only mutation documents support.
async fn patch_document_tags(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath((id, item_id)): AxumPath<(String, String)>,
    Json(req): Json<dto::PatchDocumentTagsReq>,
) -> Result<Json<dto::DocumentRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Document)
        .map_err(|e| error_response("patch document tags", e))?;

    let case_id = parse_id(&id)?;
    let document_id = parse_id(&item_id)?;
    let revision = expected_revision(&headers)?;

    let case = state
        .store
        .update(
            case_id,
            document_id,
            CasePatch::DocumentTags { tags: req.tags },
            revision,
        )
        .map_err(|e| error_response("patch document tags", e))?;
    let updated = case
        .documents
        .iter()
        .find(|d| d.id == document_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::document_view(updated)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/uploads",
    request_body = dto::CreateUploadReq,
    responses(
        (status = 200, description = "External upload recorded", body = dto::ExternalUploadRes),
        (status = 400, description = "Contributor not registered on this case")
    )
)]
/// Records an upload from an external contributor. The contributor's
/// verified identity must be registered on the case.
async fn create_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateUploadReq>,
) -> Result<Json<dto::ExternalUploadRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::ExternalUpload)
        .map_err(|e| error_response("create upload", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let uploaded_by = EmailAddress::new(&claims.identity)
        .map_err(|_| bad_request("external contributors must be identified by email"))?;

    let upload = ExternalUpload {
        id: Uuid::new_v4(),
        name: parse_text(&req.name, "name")?,
        uploaded_by,
        upload_date: Utc::now(),
        size: req.size,
        description: req.description,
    };
    let upload_id = upload.id;

    let case = state
        .store
        .append(case_id, CaseItem::ExternalUpload(upload), revision)
        .map_err(|e| error_response("create upload", e))?;
    let created = case
        .external_uploads
        .iter()
        .find(|u| u.id == upload_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::upload_view(created)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/assessments",
    request_body = dto::CreateAssessmentReq,
    responses(
        (status = 200, description = "Assessment created", body = dto::AssessmentRes),
        (status = 403, description = "Role may not create assessments")
    )
)]
/// Creates a not-started assessment.
async fn create_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateAssessmentReq>,
) -> Result<Json<dto::AssessmentRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::Assessment)
        .map_err(|e| error_response("create assessment", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let date = req
        .date
        .as_deref()
        .map(|raw| parse_datetime(raw, "date"))
        .transpose()?;

    let assessment = Assessment {
        id: Uuid::new_v4(),
        title: parse_text(&req.title, "title")?,
        status: AssessmentStatus::NotStarted,
        completion_percentage: 0,
        results: Default::default(),
        date,
    };
    let assessment_id = assessment.id;

    let case = state
        .store
        .append(case_id, CaseItem::Assessment(assessment), revision)
        .map_err(|e| error_response("create assessment", e))?;
    let created = case
        .assessments
        .iter()
        .find(|a| a.id == assessment_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::assessment_view(created)))
}

#[utoipa::path(
    patch,
    path = "/cases/{id}/assessments/{item_id}",
    request_body = dto::PatchAssessmentReq,
    responses(
        (status = 200, description = "Assessment transitioned", body = dto::AssessmentRes),
        (status = 400, description = "Illegal transition or missing results"),
        (status = 404, description = "Unknown case or assessment")
    )
)]
/// Moves an assessment forward. Completion requires results and is
/// terminal.
async fn patch_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath((id, item_id)): AxumPath<(String, String)>,
    Json(req): Json<dto::PatchAssessmentReq>,
) -> Result<Json<dto::AssessmentRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Assessment)
        .map_err(|e| error_response("patch assessment", e))?;

    let case_id = parse_id(&id)?;
    let assessment_id = parse_id(&item_id)?;
    let revision = expected_revision(&headers)?;
    let status = req.status.parse::<AssessmentStatus>().map_err(bad_request)?;

    let case = state
        .store
        .update(
            case_id,
            assessment_id,
            CasePatch::AssessmentStatus {
                status,
                completion_percentage: req.completion_percentage,
                results: req.results,
            },
            revision,
        )
        .map_err(|e| error_response("patch assessment", e))?;
    let updated = case
        .assessments
        .iter()
        .find(|a| a.id == assessment_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::assessment_view(updated)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/reports",
    request_body = dto::CreateReportReq,
    responses(
        (status = 200, description = "Draft report created", body = dto::ReportRes),
        (status = 403, description = "Role may not create reports")
    )
)]
/// Creates a draft report.
async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateReportReq>,
) -> Result<Json<dto::ReportRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::Report)
        .map_err(|e| error_response("create report", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let report = Report {
        id: Uuid::new_v4(),
        title: parse_text(&req.title, "title")?,
        status: ReportStatus::Draft,
        patient_name: req.patient_name,
        date: None,
        last_edited: Some(Utc::now()),
    };
    let report_id = report.id;

    let case = state
        .store
        .append(case_id, CaseItem::Report(report), revision)
        .map_err(|e| error_response("create report", e))?;
    let created = case
        .reports
        .iter()
        .find(|r| r.id == report_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::report_view(created)))
}

#[utoipa::path(
    patch,
    path = "/cases/{id}/reports/{item_id}",
    request_body = dto::PatchReportReq,
    responses(
        (status = 200, description = "Report transitioned", body = dto::ReportRes),
        (status = 400, description = "Illegal transition"),
        (status = 404, description = "Unknown case or report")
    )
)]
/// Marks a report completed; draft → completed is the only legal move.
async fn patch_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath((id, item_id)): AxumPath<(String, String)>,
    Json(req): Json<dto::PatchReportReq>,
) -> Result<Json<dto::ReportRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Report)
        .map_err(|e| error_response("patch report", e))?;

    let case_id = parse_id(&id)?;
    let report_id = parse_id(&item_id)?;
    let revision = expected_revision(&headers)?;
    let status = req.status.parse::<ReportStatus>().map_err(bad_request)?;

    let case = state
        .store
        .update(case_id, report_id, CasePatch::ReportStatus { status }, revision)
        .map_err(|e| error_response("patch report", e))?;
    let updated = case
        .reports
        .iter()
        .find(|r| r.id == report_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::report_view(updated)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/info-requests",
    request_body = dto::CreateInfoRequestReq,
    responses(
        (status = 200, description = "Information request created", body = dto::InfoRequestRes),
        (status = 400, description = "Empty or blank questions")
    )
)]
/// Creates a pending information request directed at the claimant.
async fn create_info_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::CreateInfoRequestReq>,
) -> Result<Json<dto::InfoRequestRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Create, ResourceKind::InfoRequest)
        .map_err(|e| error_response("create info request", e))?;

    let case_id = parse_id(&id)?;
    let revision = expected_revision(&headers)?;
    let request = info_requests::new_request(
        parse_text(&req.title, "title")?,
        req.questions,
        &claims.identity,
    )
    .map_err(|e| error_response("create info request", e))?;
    let request_id = request.id;

    let case = state
        .store
        .append(case_id, CaseItem::InfoRequest(request), revision)
        .map_err(|e| error_response("create info request", e))?;
    let created = case
        .info_requests
        .iter()
        .find(|r| r.id == request_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::info_request_view(created)))
}

#[utoipa::path(
    post,
    path = "/info-requests/{id}/answers",
    request_body = dto::AnswerInfoRequestReq,
    responses(
        (status = 200, description = "Request completed", body = dto::InfoRequestRes),
        (status = 400, description = "Answer count mismatch or empty answer"),
        (status = 403, description = "Role may not answer"),
        (status = 404, description = "Unknown request")
    )
)]
/// Submits answers for an information request. All-or-nothing: a failed
/// submission persists nothing and the request stays pending.
async fn answer_info_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::AnswerInfoRequestReq>,
) -> Result<Json<dto::InfoRequestRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Answer, ResourceKind::InfoRequest)
        .map_err(|e| error_response("answer info request", e))?;

    let request_id = parse_id(&id)?;
    let (case, request) = state
        .store
        .find_info_request(request_id)
        .map_err(|e| error_response("answer info request", e))?;

    let updated_case = state
        .store
        .update(
            case.id,
            request.id,
            CasePatch::InfoRequestAnswers {
                answers: req.answers,
            },
            None,
        )
        .map_err(|e| error_response("answer info request", e))?;
    let completed = updated_case
        .info_requests
        .iter()
        .find(|r| r.id == request_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        })?;
    Ok(Json(views::info_request_view(completed)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/tags",
    request_body = dto::ToggleTagReq,
    responses(
        (status = 200, description = "Tag selection after the toggle", body = dto::CaseRes),
        (status = 400, description = "Tag outside the fixed vocabulary")
    )
)]
/// Toggles a category tag: re-selecting removes, and a 4th tag is rejected
/// as a no-op.
async fn toggle_category_tag(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::ToggleTagReq>,
) -> Result<Json<dto::CaseRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Case)
        .map_err(|e| error_response("toggle tag", e))?;

    let case_id = parse_id(&id)?;
    let case = state
        .store
        .toggle_category_tag(case_id, &req.tag)
        .map_err(|e| error_response("toggle tag", e))?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::case_view(&case, claims.role, verified)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/contributors",
    request_body = dto::ContributorReq,
    responses(
        (status = 200, description = "Contributor registered", body = dto::CaseRes),
        (status = 400, description = "Invalid role or email, or already registered")
    )
)]
/// Registers an external contributor for upload-scoped access. Case owners
/// only.
async fn add_contributor(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::ContributorReq>,
) -> Result<Json<dto::CaseRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Case)
        .map_err(|e| error_response("add contributor", e))?;

    let case_id = parse_id(&id)?;
    let contributor = ExternalContributor {
        id: Uuid::new_v4(),
        role: req.role.parse().map_err(bad_request)?,
        email: EmailAddress::new(&req.email).map_err(|e| bad_request(e.to_string()))?,
    };

    let case = state
        .store
        .add_contributor(case_id, contributor)
        .map_err(|e| error_response("add contributor", e))?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::case_view(&case, claims.role, verified)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/expire",
    responses(
        (status = 200, description = "Case expired", body = dto::CaseRes),
        (status = 404, description = "Unknown case")
    )
)]
/// Expires a case: the only terminal status change. Cases are never
/// deleted.
async fn expire_case(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<dto::CaseRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Case)
        .map_err(|e| error_response("expire case", e))?;

    let case_id = parse_id(&id)?;
    let case = state
        .store
        .expire(case_id)
        .map_err(|e| error_response("expire case", e))?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::case_view(&case, claims.role, verified)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/stage",
    request_body = dto::AdvanceStageReq,
    responses(
        (status = 200, description = "Stage advanced", body = dto::CaseRes),
        (status = 404, description = "Unknown case")
    )
)]
/// Advances the case to its next stage, recording the previous one as
/// completed.
async fn advance_stage(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::AdvanceStageReq>,
) -> Result<Json<dto::CaseRes>, HandlerError> {
    let claims = claims(&headers)?;
    authz::authorize(claims.role, Action::Edit, ResourceKind::Case)
        .map_err(|e| error_response("advance stage", e))?;

    let case_id = parse_id(&id)?;
    let stage = parse_text(&req.stage, "stage")?;
    let case = state
        .store
        .advance_stage(case_id, stage)
        .map_err(|e| error_response("advance stage", e))?;
    let verified = session_verified(&state, &claims);
    Ok(Json(views::case_view(&case, claims.role, verified)))
}

#[utoipa::path(
    post,
    path = "/verify",
    request_body = dto::VerifyReq,
    responses(
        (status = 200, description = "Verification outcome", body = dto::VerifyRes),
        (status = 400, description = "Missing session header")
    )
)]
/// Checks the one-time code against the external authenticator. A grant is
/// remembered for the remainder of the session only; a denial changes
/// nothing.
async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::VerifyReq>,
) -> Result<Json<dto::VerifyRes>, HandlerError> {
    let claims = claims(&headers)?;
    let Some(session_id) = claims.session_id.as_deref() else {
        return Err(bad_request("x-session-id header is required to verify"));
    };

    let granted = match state.gate.verify(&req.code) {
        Verification::Granted => {
            state.grants.grant(session_id);
            true
        }
        Verification::Denied => false,
    };

    Ok(Json(dto::VerifyRes { granted }))
}
