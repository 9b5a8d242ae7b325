use crate::content::{self, Page};
use crate::conversations::{ConversationError, Conversations, InquiryError, InquiryRequest};
use crate::transcript::{Message, Role, TurnError};
use crate::{Match, ResponseTable};
use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use include_dir::{Dir, include_dir};
use markdown::{Options as MarkdownOptions, to_html_with_options};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

type SharedState = Arc<AppState>;

static STATIC_ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

pub struct AppState {
    pub table: Arc<ResponseTable>,
    pub conversations: Conversations,
    pub theme: WebTheme,
    pub base_url: String,
    pub reply_delay: Duration,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_tailwind: bool,
    use_bootstrap: bool,
    body_class: &'static str,
    header_class: &'static str,
    nav_class: &'static str,
    nav_link_class: &'static str,
    nav_active_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    section_title_class: &'static str,
    cta_group_class: &'static str,
    button_class: &'static str,
    secondary_button_class: &'static str,
    grid_class: &'static str,
    tile_class: &'static str,
    label_class: &'static str,
    input_class: &'static str,
    notice_ok_class: &'static str,
    notice_error_class: &'static str,
    chat_panel_class: &'static str,
    footer_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                use_tailwind: true,
                use_bootstrap: false,
                body_class: "bg-slate-50 text-slate-900",
                header_class: "bg-slate-900 text-white",
                nav_class: "max-w-5xl mx-auto flex flex-wrap items-center gap-4 px-4 py-3",
                nav_link_class: "text-slate-300 hover:text-white",
                nav_active_class: "text-amber-400 font-semibold",
                main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
                card_class: "max-w-5xl w-full space-y-8",
                eyebrow_class: "uppercase tracking-wide text-sm text-amber-600",
                headline_class: "text-4xl font-extrabold tracking-tight",
                lede_class: "text-lg text-slate-600",
                section_title_class: "text-2xl font-semibold",
                cta_group_class: "flex flex-wrap gap-3",
                button_class: "inline-flex items-center rounded-md bg-amber-500 px-4 py-2 text-slate-900 font-semibold shadow hover:bg-amber-400 transition-colors",
                secondary_button_class: "inline-flex items-center rounded-md border border-slate-300 px-4 py-2 font-semibold hover:bg-slate-100",
                grid_class: "grid gap-4 md:grid-cols-3",
                tile_class: "bg-white shadow rounded p-4 space-y-2",
                label_class: "block text-sm font-medium text-slate-700",
                input_class: "w-full rounded-md border border-slate-300 px-3 py-2",
                notice_ok_class: "rounded-md bg-emerald-100 text-emerald-900 px-4 py-3",
                notice_error_class: "rounded-md bg-rose-100 text-rose-900 px-4 py-3",
                chat_panel_class: "fixed bottom-4 right-4 w-80 bg-white shadow-lg rounded-lg p-4 space-y-3",
                footer_class: "text-center text-sm text-slate-500 py-6",
            },
            WebTheme::Bootstrap => Self {
                use_tailwind: false,
                use_bootstrap: true,
                body_class: "bg-light text-dark",
                header_class: "bg-dark text-white",
                nav_class: "container d-flex flex-wrap align-items-center gap-3 py-2",
                nav_link_class: "link-light text-decoration-none",
                nav_active_class: "link-warning fw-semibold text-decoration-none",
                main_class: "container py-5",
                card_class: "mx-auto col-lg-10",
                eyebrow_class: "text-uppercase text-warning mb-2",
                headline_class: "display-5 fw-bold",
                lede_class: "lead mb-4",
                section_title_class: "h3 mt-4",
                cta_group_class: "d-flex flex-wrap gap-3",
                button_class: "btn btn-warning btn-lg px-4 py-2",
                secondary_button_class: "btn btn-outline-secondary btn-lg px-4 py-2",
                grid_class: "row row-cols-1 row-cols-md-3 g-3",
                tile_class: "col card card-body",
                label_class: "form-label",
                input_class: "form-control",
                notice_ok_class: "alert alert-success",
                notice_error_class: "alert alert-danger",
                chat_panel_class: "position-fixed bottom-0 end-0 m-3 card card-body shadow",
                footer_class: "text-center text-muted small py-4",
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub enable_openapi: bool,
    pub theme: WebTheme,
    pub base_url: String,
    pub reply_delay: Duration,
    pub table: Arc<ResponseTable>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_openapi: true,
            theme: WebTheme::default(),
            base_url: "http://127.0.0.1:8080".to_string(),
            reply_delay: Duration::from_millis(500),
            table: Arc::new(ResponseTable::canonical().clone()),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        table: config.table.clone(),
        conversations: Conversations::new(),
        theme: config.theme,
        base_url: config.base_url.trim_end_matches('/').to_string(),
        reply_delay: config.reply_delay,
    });
    let router = build_router(state, config.enable_openapi);
    info!(
        addr = %config.addr,
        theme = ?config.theme,
        openapi = config.enable_openapi,
        base = %config.base_url,
        reply_delay_ms = config.reply_delay.as_millis() as u64,
        topics = config.table.len(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = ErrorPayload {
            error: self.message,
        };
        (self.status, Json(payload)).into_response()
    }
}

impl From<ConversationError> for ApiError {
    fn from(value: ConversationError) -> Self {
        let status = match value {
            ConversationError::UnknownConversation => StatusCode::NOT_FOUND,
            ConversationError::Turn(TurnError::EmptyInput) => StatusCode::BAD_REQUEST,
            ConversationError::Turn(TurnError::AwaitingReply | TurnError::NoPendingTurn) => {
                StatusCode::CONFLICT
            }
            ConversationError::Turn(TurnError::TranscriptFull) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, value.to_string())
    }
}

impl From<InquiryError> for ApiError {
    fn from(value: InquiryError) -> Self {
        Self::bad_request(value.to_string())
    }
}

fn build_router(state: SharedState, openapi: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(home_html))
        .route("/about", get(about_html))
        .route("/features", get(features_html))
        .route("/contact", get(contact_html).post(contact_submit))
        .route("/ask", get(ask_html))
        .route("/api/chat", post(api_chat))
        .route("/api/chat/conversations", post(api_open_conversation))
        .route("/api/chat/conversations/:id", delete(api_close_conversation))
        .route("/api/chat/transcript", get(api_transcript))
        .route("/api/respond", get(api_respond))
        .route("/api/topics", get(api_topics))
        .route("/api/contact", post(api_contact))
        .route("/static/*path", get(static_asset))
        .route("/healthz", get(health))
        .route("/sitemap.xml", get(sitemap_xml));
    if openapi {
        router = router.route("/api/openapi.json", get(openapi_json));
    }
    router
        .fallback(not_found_html)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

struct NavLink {
    label: &'static str,
    href: &'static str,
    active: bool,
}

struct Layout {
    chrome: Chrome,
    title: String,
    description: &'static str,
    canonical_url: String,
    nav: Vec<NavLink>,
    page_slug: &'static str,
    product_name: &'static str,
    version: &'static str,
    json_ld: String,
}

impl Layout {
    fn new(state: &AppState, page: Page, title: &str, description: &'static str) -> Self {
        let nav = Page::ALL
            .iter()
            .map(|&link| NavLink {
                label: link.label(),
                href: link.path(),
                active: link == page,
            })
            .collect();
        let canonical_url = page_url(&state.base_url, page);
        Self {
            chrome: Chrome::new(state.theme),
            title: format!("{} • {title}", content::PRODUCT_NAME),
            description,
            json_ld: script_safe(&web_page_json_ld(&state.base_url, page, title)),
            canonical_url,
            nav,
            page_slug: page.slug(),
            product_name: content::PRODUCT_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

struct SuggestedLink {
    question: &'static str,
    href: String,
}

fn suggested_links() -> Vec<SuggestedLink> {
    content::SUGGESTED_QUESTIONS
        .iter()
        .map(|&question| SuggestedLink {
            question,
            href: ask_path(question),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    layout: Layout,
    tagline: &'static str,
    stats: &'static [content::Stat],
    features: &'static [content::Feature],
    suggestions: Vec<SuggestedLink>,
}

#[derive(Template)]
#[template(path = "about.html")]
struct AboutTemplate {
    layout: Layout,
    story_html: String,
}

#[derive(Template)]
#[template(path = "features.html")]
struct FeaturesTemplate {
    layout: Layout,
    features: &'static [content::Feature],
    technologies: &'static [&'static str],
}

#[derive(Template)]
#[template(path = "contact.html")]
struct ContactTemplate {
    layout: Layout,
    contact: &'static content::ContactInfo,
    has_notice: bool,
    notice_ok: bool,
    notice_text: String,
    name: String,
    email: String,
    message: String,
}

#[derive(Template)]
#[template(path = "ask.html")]
struct AskTemplate {
    layout: Layout,
    has_question: bool,
    question: String,
    answer: String,
    topic_label: String,
    matched: bool,
    conversation_id: String,
    lines: Vec<TranscriptLine>,
    notice: String,
    back_href: &'static str,
    back_label: &'static str,
    suggestions: Vec<SuggestedLink>,
}

struct TranscriptLine {
    speaker: &'static str,
    css: &'static str,
    content: String,
}

impl TranscriptLine {
    fn from_message(message: &Message) -> Self {
        match message.role {
            Role::User => Self {
                speaker: "You",
                css: "user",
                content: message.content.clone(),
            },
            Role::Assistant => Self {
                speaker: "Assistant",
                css: "assistant",
                content: message.content.clone(),
            },
        }
    }
}

fn render_template<T: Template>(state: &AppState, template: &T) -> String {
    template.render().unwrap_or_else(|err| {
        warn!(error = %err, "template render failed");
        render_error_page(state.theme, "Something went wrong", err.to_string())
    })
}

async fn home_html(State(state): State<SharedState>) -> impl IntoResponse {
    let template = HomeTemplate {
        layout: Layout::new(
            &state,
            Page::Home,
            "PPE compliance for construction",
            "Automatic PPE checks, instant alerts, and OSHA-mapped reports for construction sites.",
        ),
        tagline: content::TAGLINE,
        stats: content::STATS,
        features: &content::FEATURES[..3],
        suggestions: suggested_links(),
    };
    Html(render_template(&state, &template))
}

async fn about_html(State(state): State<SharedState>) -> impl IntoResponse {
    let template = AboutTemplate {
        layout: Layout::new(
            &state,
            Page::About,
            "About us",
            "Why SiteSafe exists and how we approach construction safety.",
        ),
        story_html: render_markdown_str(content::ABOUT_STORY).unwrap_or_default(),
    };
    Html(render_template(&state, &template))
}

async fn features_html(State(state): State<SharedState>) -> impl IntoResponse {
    let template = FeaturesTemplate {
        layout: Layout::new(
            &state,
            Page::Features,
            "Features",
            "Real-time PPE detection, alerts, zone rules, and compliance reporting.",
        ),
        features: content::FEATURES,
        technologies: content::TECHNOLOGIES,
    };
    Html(render_template(&state, &template))
}

fn contact_template(state: &AppState) -> ContactTemplate {
    ContactTemplate {
        layout: Layout::new(
            state,
            Page::Contact,
            "Contact",
            "Talk to the SiteSafe team about a pilot on your site.",
        ),
        contact: &content::CONTACT,
        has_notice: false,
        notice_ok: false,
        notice_text: String::new(),
        name: String::new(),
        email: String::new(),
        message: String::new(),
    }
}

async fn contact_html(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_template(&state, &contact_template(&state)))
}

async fn contact_submit(
    State(state): State<SharedState>,
    Form(request): Form<InquiryRequest>,
) -> impl IntoResponse {
    let mut template = contact_template(&state);
    template.has_notice = true;
    match state.conversations.record_inquiry(request.clone()) {
        Ok(inquiry) => {
            template.notice_ok = true;
            template.notice_text = format!(
                "Thanks, {}! Your message has been sent. We'll get back to you shortly.",
                inquiry.name
            );
            (StatusCode::OK, Html(render_template(&state, &template)))
        }
        Err(err) => {
            template.notice_text = err.to_string();
            template.name = request.name;
            template.email = request.email;
            template.message = request.message;
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_template(&state, &template)),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct AskParams {
    q: Option<String>,
    page: Option<String>,
    conversation_id: Option<String>,
}

/// Full-page assistant. Questions asked here land in the same kind of
/// transcript the widget uses, carried between requests by `conversation_id`.
async fn ask_html(
    State(state): State<SharedState>,
    Query(params): Query<AskParams>,
) -> impl IntoResponse {
    let question = params.q.unwrap_or_default();
    let back = params
        .page
        .as_deref()
        .and_then(|slug| Page::ALL.iter().copied().find(|page| page.slug() == slug))
        .unwrap_or(Page::Features);
    let known_id = params
        .conversation_id
        .map(|id| id.trim().to_string())
        .filter(|id| state.conversations.len_of(id).is_some());
    let has_question = !question.trim().is_empty();

    let mut notice = String::new();
    let mut found = None;
    let conversation_id = if has_question {
        let id = known_id.unwrap_or_else(|| state.conversations.open());
        match state.conversations.submit(&id, &question) {
            Ok(_) => {
                tokio::time::sleep(state.reply_delay).await;
                let answer = state.table.lookup(&question);
                if let Err(err) = state.conversations.resolve(&id, answer.response()) {
                    warn!(conversation = %id, error = %err, "ask page reply was not appended");
                }
                found = Some(answer);
            }
            Err(err) => notice = err.to_string(),
        }
        Some(id)
    } else {
        known_id
    };

    let (answer, topic_label, matched) = match found {
        Some(found) => (
            found.response().to_string(),
            found.topic().unwrap_or("General").to_string(),
            !found.is_fallback(),
        ),
        None => (String::new(), String::new(), false),
    };
    let lines = conversation_id
        .as_deref()
        .and_then(|id| state.conversations.transcript(id))
        .unwrap_or_default()
        .iter()
        .map(TranscriptLine::from_message)
        .collect();
    let template = AskTemplate {
        layout: Layout::new(
            &state,
            Page::Home,
            "Safety assistant",
            "Quick answers to common PPE and site-safety questions.",
        ),
        has_question: found.is_some(),
        question,
        answer,
        topic_label,
        matched,
        conversation_id: conversation_id.unwrap_or_default(),
        lines,
        notice,
        back_href: back.path(),
        back_label: back.label(),
        suggestions: suggested_links(),
    };
    Html(render_template(&state, &template))
}

async fn not_found_html(State(state): State<SharedState>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(render_error_page(
            state.theme,
            "Page not found",
            "We couldn't find that page.",
        )),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct ErrorPayload {
    error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct ConversationOpened {
    conversation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct ChatRequest {
    conversation_id: String,
    message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct ChatReply {
    conversation_id: String,
    reply: String,
    topic: Option<String>,
    matched: bool,
    /// Transcript length after the reply was appended.
    messages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct TranscriptPayload {
    conversation_id: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct TranscriptParams {
    conversation_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct RespondParams {
    /// Free-text question.
    q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct RespondPayload {
    query: String,
    reply: String,
    topic: Option<String>,
    matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct TopicPayload {
    keyword: String,
    topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct TopicsPayload {
    version: u32,
    fallback: String,
    topics: Vec<TopicPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct ContactAccepted {
    id: u64,
    received_at: u64,
}

struct ReplyOutcome {
    reply: String,
    topic: Option<String>,
    matched: bool,
}

impl ReplyOutcome {
    fn from_match(found: &Match<'_>) -> Self {
        Self {
            reply: found.response().to_string(),
            topic: found.topic().map(str::to_string),
            matched: !found.is_fallback(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/chat/conversations",
    responses((status = 201, description = "Conversation opened", body = ConversationOpened))
)]
async fn api_open_conversation(State(state): State<SharedState>) -> impl IntoResponse {
    let conversation_id = state.conversations.open();
    debug!(conversation = %conversation_id, "conversation opened");
    (StatusCode::CREATED, Json(ConversationOpened { conversation_id }))
}

#[utoipa::path(
    delete,
    path = "/api/chat/conversations/{id}",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 204, description = "Conversation closed"),
        (status = 404, description = "Unknown conversation", body = ErrorPayload)
    )
)]
async fn api_close_conversation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.conversations.close(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("unknown conversation"))
    }
}

/// Appends the question, waits out the reply delay, then appends and returns
/// the answer.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 400, description = "Blank message", body = ErrorPayload),
        (status = 404, description = "Unknown conversation", body = ErrorPayload),
        (status = 409, description = "A reply is still pending", body = ErrorPayload),
        (status = 422, description = "Transcript is full", body = ErrorPayload)
    )
)]
async fn api_chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let conversation_id = request.conversation_id.trim().to_string();
    state
        .conversations
        .submit(&conversation_id, &request.message)?;

    // The reply runs on its own task so it lands in the transcript even if
    // the client goes away mid-delay.
    let task_state = Arc::clone(&state);
    let task_id = conversation_id.clone();
    let message = request.message;
    let pending = tokio::spawn(async move {
        tokio::time::sleep(task_state.reply_delay).await;
        let outcome = ReplyOutcome::from_match(&task_state.table.lookup(&message));
        let appended = task_state
            .conversations
            .resolve(&task_id, &outcome.reply)
            .map(|_| ());
        (outcome, appended)
    });
    let (outcome, appended) = pending
        .await
        .map_err(|err| ApiError::internal(format!("reply task failed: {err}")))?;
    appended?;

    Ok(Json(ChatReply {
        messages: state.conversations.len_of(&conversation_id).unwrap_or(0),
        conversation_id,
        reply: outcome.reply,
        topic: outcome.topic,
        matched: outcome.matched,
    }))
}

#[utoipa::path(
    get,
    path = "/api/chat/transcript",
    params(TranscriptParams),
    responses(
        (status = 200, description = "Transcript in submission order", body = TranscriptPayload),
        (status = 400, description = "Missing conversation id", body = ErrorPayload),
        (status = 404, description = "Unknown conversation", body = ErrorPayload)
    )
)]
async fn api_transcript(
    State(state): State<SharedState>,
    Query(params): Query<TranscriptParams>,
) -> Result<Json<TranscriptPayload>, ApiError> {
    let conversation_id = params
        .conversation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter `conversation_id` is required"))?
        .to_string();
    let messages = state
        .conversations
        .transcript(&conversation_id)
        .ok_or_else(|| ApiError::not_found("unknown conversation"))?;
    Ok(Json(TranscriptPayload {
        conversation_id,
        messages,
    }))
}

#[utoipa::path(
    get,
    path = "/api/respond",
    params(RespondParams),
    responses((status = 200, description = "Canned answer", body = RespondPayload))
)]
async fn api_respond(
    State(state): State<SharedState>,
    Query(params): Query<RespondParams>,
) -> Json<RespondPayload> {
    let query = params.q.unwrap_or_default();
    let outcome = ReplyOutcome::from_match(&state.table.lookup(&query));
    Json(RespondPayload {
        query,
        reply: outcome.reply,
        topic: outcome.topic,
        matched: outcome.matched,
    })
}

#[utoipa::path(
    get,
    path = "/api/topics",
    responses((status = 200, description = "Keywords in match priority order", body = TopicsPayload))
)]
async fn api_topics(State(state): State<SharedState>) -> Json<TopicsPayload> {
    Json(TopicsPayload {
        version: state.table.version(),
        fallback: state.table.fallback().to_string(),
        topics: state
            .table
            .topics()
            .map(|(keyword, topic)| TopicPayload {
                keyword: keyword.to_string(),
                topic: topic.to_string(),
            })
            .collect(),
    })
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = InquiryRequest,
    responses(
        (status = 201, description = "Inquiry recorded", body = ContactAccepted),
        (status = 400, description = "Missing or invalid field", body = ErrorPayload)
    )
)]
async fn api_contact(
    State(state): State<SharedState>,
    Json(request): Json<InquiryRequest>,
) -> Result<(StatusCode, Json<ContactAccepted>), ApiError> {
    let inquiry = state.conversations.record_inquiry(request)?;
    Ok((
        StatusCode::CREATED,
        Json(ContactAccepted {
            id: inquiry.id,
            received_at: inquiry.received_at,
        }),
    ))
}

#[derive(OpenApi)]
#[openapi(
    info(title = "SiteSafe API", description = "FAQ assistant and contact endpoints"),
    paths(
        api_open_conversation,
        api_close_conversation,
        api_chat,
        api_transcript,
        api_respond,
        api_topics,
        api_contact
    ),
    components(schemas(
        ErrorPayload,
        ConversationOpened,
        ChatRequest,
        ChatReply,
        TranscriptPayload,
        Message,
        RespondPayload,
        TopicPayload,
        TopicsPayload,
        InquiryRequest,
        ContactAccepted
    ))
)]
struct ApiDoc;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let stats = state.conversations.stats();
    Json(json!({
        "status": "ok",
        "service": "sitesafe-web",
        "version": env!("CARGO_PKG_VERSION"),
        "topics": state.table.len(),
        "live_conversations": stats.live_conversations,
        "pending_replies": stats.pending_replies,
        "inquiries_received": stats.inquiries_received,
    }))
}

async fn static_asset(Path(path): Path<String>) -> Response {
    match STATIC_ASSETS.get_file(&path) {
        Some(file) => (
            [
                (header::CONTENT_TYPE, asset_mime(&path).to_string()),
                (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            ],
            file.contents(),
        )
            .into_response(),
        None => ApiError::not_found(format!("No asset named {path:?}")).into_response(),
    }
}

fn asset_mime(path: &str) -> mime::Mime {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => mime::TEXT_JAVASCRIPT,
        Some("css") => mime::TEXT_CSS_UTF_8,
        Some("svg") => mime::IMAGE_SVG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

async fn sitemap_xml(State(state): State<SharedState>) -> impl IntoResponse {
    let mut body = String::with_capacity(512);
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    body.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    for page in Page::ALL {
        body.push_str("<url><loc>");
        body.push_str(&xml_escape(&page_url(&state.base_url, page)));
        body.push_str("</loc><changefreq>monthly</changefreq><priority>");
        body.push_str(page.sitemap_priority());
        body.push_str("</priority></url>");
    }
    body.push_str("</urlset>");
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

fn render_error_page(theme: WebTheme, heading: &str, message: impl Into<String>) -> String {
    let chrome = Chrome::new(theme);
    let (css_tag, js_tag) = match theme {
        WebTheme::Tailwind => (
            r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#,
            "",
        ),
        WebTheme::Bootstrap => (
            r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">"#,
            r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js" integrity="sha384-FKyoEForCGlyvwx9Hj09JcYn3nv7wiPVlz7YYwJrWVcXK/BmnVDxM+D2scQbITxI" crossorigin="anonymous"></script>"#,
        ),
    };
    let message = html_escape(&message.into());
    let heading = html_escape(heading);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{product} • {heading}</title>
    {css_tag}
    {js_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <h1 class="{headline_class}">{heading}</h1>
        <p class="{lede_class}">{message}</p>
        <a href="/" class="{button_class}">Back to home</a>
      </div>
    </main>
  </body>
</html>"#,
        product = content::PRODUCT_NAME,
        css_tag = css_tag,
        js_tag = js_tag,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
        heading = heading,
        message = message,
    )
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn ask_path(question: &str) -> String {
    format!("/ask?q={}", encode_component(question))
}

fn page_url(base_url: &str, page: Page) -> String {
    match page {
        Page::Home => format!("{base_url}/"),
        _ => format!("{base_url}{}", page.path()),
    }
}

fn web_page_json_ld(base_url: &str, page: Page, title: &str) -> String {
    serde_json::to_string_pretty(&json!({
        "@context": "https://schema.org",
        "@type": "WebPage",
        "name": title,
        "url": page_url(base_url, page),
        "isPartOf": {
            "@type": "WebSite",
            "name": content::PRODUCT_NAME,
            "url": base_url,
        },
        "publisher": {
            "@type": "Organization",
            "name": content::PRODUCT_NAME,
            "email": content::CONTACT.email,
            "telephone": content::CONTACT.phone,
        }
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

/// Keeps embedded JSON from closing its `<script>` element early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn xml_escape(input: &str) -> String {
    html_escape(input).replace('\'', "&apos;")
}

fn render_markdown_str(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let options = MarkdownOptions::gfm();
    let html = to_html_with_options(trimmed, &options).unwrap_or_else(|_| trimmed.to_string());
    Some(html)
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    fn test_state(reply_delay: Duration) -> SharedState {
        Arc::new(AppState {
            table: Arc::new(ResponseTable::canonical().clone()),
            conversations: Conversations::new(),
            theme: WebTheme::Tailwind,
            base_url: "http://127.0.0.1:8080".to_string(),
            reply_delay,
        })
    }

    fn test_router(state: SharedState) -> Router {
        build_router(state, true)
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_post(uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    async fn open_conversation(router: &Router) -> String {
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/chat/conversations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let opened: ConversationOpened = serde_json::from_str(&body_text(response).await).unwrap();
        opened.conversation_id
    }

    #[tokio::test]
    async fn marketing_pages_render_with_chat_widget() {
        let router = test_router(test_state(Duration::ZERO));
        for (path, slug, needle) in [
            ("/", "home", "What PPE do I need?"),
            ("/about", "about", "<h2>Why we started</h2>"),
            ("/features", "features", "Real-time PPE checks"),
            ("/contact", "contact", "hello@sitesafe.example"),
        ] {
            let response = router
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status().is_success(), "{path}");
            let html = body_text(response).await;
            assert!(html.contains(needle), "{path} should contain {needle}");
            assert!(html.contains(&format!("data-page=\"{slug}\"")), "{path}");
            assert!(html.contains("/static/chat.js"), "{path}");
            assert!(html.contains("application/ld+json"), "{path}");
        }
    }

    #[tokio::test]
    async fn chat_round_trip_appends_both_messages() {
        let router = test_router(test_state(Duration::ZERO));
        let id = open_conversation(&router).await;

        let response = router
            .clone()
            .oneshot(json_post(
                "/api/chat",
                json!({ "conversation_id": id, "message": "What PPE do I need?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply: ChatReply = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(
            reply
                .reply
                .starts_with("Personal Protective Equipment (PPE) is essential")
        );
        assert_eq!(reply.topic.as_deref(), Some("PPE basics"));
        assert!(reply.matched);
        assert_eq!(reply.messages, 2);

        let response = router
            .oneshot(
                Request::get(format!("/api/chat/transcript?conversation_id={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let transcript: TranscriptPayload =
            serde_json::from_str(&body_text(response).await).unwrap();
        let roles: Vec<_> = transcript.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
        assert_eq!(transcript.messages[0].content, "What PPE do I need?");
    }

    #[tokio::test(start_paused = true)]
    async fn chat_reply_waits_for_configured_delay() {
        let router = test_router(test_state(Duration::from_millis(500)));
        let id = open_conversation(&router).await;
        let started = tokio::time::Instant::now();
        let response = router
            .oneshot(json_post(
                "/api/chat",
                json!({ "conversation_id": id, "message": "HELMET required?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(started.elapsed() >= Duration::from_millis(500));
        let reply: ChatReply = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(reply.reply.contains("ANSI Z89.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn reply_lands_after_client_disconnects() {
        let state = test_state(Duration::from_millis(500));
        let router = test_router(state.clone());
        let id = open_conversation(&router).await;

        let chat = router.oneshot(json_post(
            "/api/chat",
            json!({ "conversation_id": id, "message": "fire extinguisher?" }),
        ));
        let abandoned = tokio::time::timeout(Duration::from_millis(100), chat).await;
        assert!(abandoned.is_err());
        assert_eq!(state.conversations.len_of(&id), Some(1));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        tokio::task::yield_now().await;
        let messages = state.conversations.transcript(&id).unwrap();
        assert_eq!(messages.len(), 2);
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with("Fire safety:"));
        assert_eq!(state.conversations.stats().pending_replies, 0);
    }

    #[tokio::test]
    async fn chat_rejects_blank_and_unknown_conversations() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let id = open_conversation(&router).await;

        let response = router
            .clone()
            .oneshot(json_post(
                "/api/chat",
                json!({ "conversation_id": id, "message": "   " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.conversations.len_of(&id), Some(0));

        let response = router
            .oneshot(json_post(
                "/api/chat",
                json!({ "conversation_id": "nope", "message": "ladder" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("unknown conversation"));
    }

    #[tokio::test]
    async fn chat_rejects_submission_while_reply_pending() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let id = open_conversation(&router).await;
        state.conversations.submit(&id, "first question").unwrap();

        let response = router
            .oneshot(json_post(
                "/api/chat",
                json!({ "conversation_id": id, "message": "second question" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(state.conversations.len_of(&id), Some(1));
    }

    #[tokio::test]
    async fn closing_conversation_forgets_transcript() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let id = open_conversation(&router).await;
        let uri = format!("/api/chat/conversations/{id}");

        let response = router
            .clone()
            .oneshot(Request::delete(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.conversations.transcript(&id).is_none());

        let response = router
            .oneshot(Request::delete(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_respond_is_stateless() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let response = router
            .clone()
            .oneshot(
                Request::get("/api/respond?q=fall%20and%20scaffold")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let payload: RespondPayload = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload.topic.as_deref(), Some("Fall protection"));
        assert!(payload.reply.contains("6 feet"));

        let response = router
            .oneshot(
                Request::get("/api/respond?q=tell%20me%20about%20dinosaurs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let payload: RespondPayload = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(!payload.matched);
        assert_eq!(payload.reply, state.table.fallback());
        assert_eq!(state.conversations.stats().live_conversations, 0);
    }

    #[tokio::test]
    async fn api_topics_lists_priority_order() {
        let router = test_router(test_state(Duration::ZERO));
        let response = router
            .oneshot(Request::get("/api/topics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let payload: TopicsPayload = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload.version, 1);
        assert_eq!(payload.topics.len(), 16);
        assert_eq!(payload.topics[0].keyword, "ppe");
        assert_eq!(payload.topics[1].keyword, "helmet");
        assert_eq!(payload.topics[5].keyword, "fall");
        assert_eq!(payload.topics[6].keyword, "scaffold");
        assert_eq!(payload.topics[15].keyword, "first aid");
    }

    #[tokio::test]
    async fn contact_form_confirms_and_clears_fields() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let response = router
            .oneshot(
                Request::post("/contact")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "name=Dana&email=dana%40builders.example&message=Pilot%20request",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Thanks, Dana!"));
        assert!(html.contains(r#"name="name" value="""#));
        assert!(html.contains(r#"name="email" value="""#));
        assert!(!html.contains("Pilot request"));
        assert_eq!(state.conversations.stats().inquiries_received, 1);
    }

    #[tokio::test]
    async fn contact_form_keeps_values_on_error() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let response = router
            .oneshot(
                Request::post("/contact")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("name=Dana&email=&message=Pilot%20request"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("The email field is required."));
        assert!(html.contains("Pilot request"));
        assert_eq!(state.conversations.stats().inquiries_received, 0);
    }

    #[tokio::test]
    async fn api_contact_records_inquiry() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let response = router
            .clone()
            .oneshot(json_post(
                "/api/contact",
                json!({ "name": "Lee", "email": "lee@crew.example", "message": "Demo?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let accepted: ContactAccepted = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(accepted.id, 0);

        let response = router
            .clone()
            .oneshot(json_post(
                "/api/contact",
                json!({ "name": "Lee", "email": "lee", "message": "Demo?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(json_post("/api/contact", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("The name field is required."));
        assert_eq!(state.conversations.recent_inquiries(10).len(), 1);
    }

    #[tokio::test]
    async fn ask_page_answers_without_script() {
        let router = test_router(test_state(Duration::ZERO));
        let response = router
            .clone()
            .oneshot(
                Request::get("/ask?q=HELMET%20required%3F&page=features")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains("ANSI Z89.1"));
        assert!(html.contains(r#"id="back-link" href="/features""#));

        let response = router
            .oneshot(Request::get("/ask?q=%20%20").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(!html.contains("ANSI Z89.1"));
        assert!(html.contains("Type a question"));
    }

    #[tokio::test]
    async fn ask_page_keeps_running_transcript() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let id = state.conversations.open();
        for question in ["ladder height?", "Where is the first aid kit?"] {
            let uri = format!("/ask?q={}&conversation_id={id}", encode_component(question));
            let response = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status().is_success());
        }

        let response = router
            .oneshot(
                Request::get(format!("/ask?conversation_id={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_text(response).await;
        assert_eq!(state.conversations.len_of(&id), Some(4));
        assert!(html.contains("Ladder safety: Inspect before use"));
        assert!(html.contains("First aid: Know the location of first aid kits"));
        assert!(html.contains(&format!(r#"name="conversation_id" value="{id}""#)));
        assert!(html.contains(r#"id="back-link" href="/features""#));
        assert!(html.contains("Back to Features"));
        assert!(html.contains("Type a question"));
    }

    #[tokio::test]
    async fn ask_page_opens_conversation_for_first_question() {
        let state = test_state(Duration::ZERO);
        let router = test_router(state.clone());
        let response = router
            .clone()
            .oneshot(Request::get("/ask?q=report%20a%20hazard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Report all hazards immediately"));
        assert_eq!(state.conversations.stats().live_conversations, 1);
        assert!(html.contains(r#"name="conversation_id" value=""#));

        let response = router
            .oneshot(
                Request::get("/ask?q=fire&conversation_id=unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_text(response).await.contains("Fire safety:"));
        assert_eq!(state.conversations.stats().live_conversations, 2);
    }

    #[tokio::test]
    async fn static_assets_are_served_with_mime() {
        let router = test_router(test_state(Duration::ZERO));
        let response = router
            .clone()
            .oneshot(Request::get("/static/chat.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            mime::TEXT_JAVASCRIPT.as_ref()
        );

        let response = router
            .oneshot(Request::get("/static/missing.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_page_renders_not_found() {
        let router = test_router(test_state(Duration::ZERO));
        let response = router
            .oneshot(Request::get("/pricing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn sitemap_lists_pages() {
        let router = test_router(test_state(Duration::ZERO));
        let response = router
            .oneshot(Request::get("/sitemap.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let text = body_text(response).await;
        assert!(text.contains("<urlset"));
        assert!(text.contains("<loc>http://127.0.0.1:8080/</loc>"));
        assert!(text.contains("<loc>http://127.0.0.1:8080/contact</loc>"));
    }

    #[tokio::test]
    async fn openapi_document_lists_chat_route() {
        let router = test_router(test_state(Duration::ZERO));
        let response = router
            .oneshot(Request::get("/api/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let doc: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(doc["paths"]["/api/chat"]["post"].is_object());
        let schemas = &doc["components"]["schemas"];
        assert!(schemas["InquiryRequest"]["properties"]["email"].is_object());
        assert!(schemas["ContactRequest"].is_null());

        let router = build_router(test_state(Duration::ZERO), false);
        let response = router
            .oneshot(Request::get("/api/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn default_config_waits_half_a_second() {
        let config = WebConfig::default();
        assert_eq!(config.reply_delay, Duration::from_millis(500));
        assert_eq!(config.table.len(), 16);
    }

    #[test]
    fn ask_links_are_percent_encoded() {
        assert_eq!(
            ask_path("What PPE do I need?"),
            "/ask?q=What%20PPE%20do%20I%20need%3F"
        );
    }

    #[test]
    fn error_page_escapes_message() {
        let html = render_error_page(WebTheme::Bootstrap, "Oops", "<script>x</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("bootstrap"));
    }
}
