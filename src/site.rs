//! Client route table.
//!
//! Maps browser paths to the page views of the single-page client and serves the
//! client shell for them. No content is rendered here; the client fetches it from
//! the JSON API.

use std::path::Path;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::config::AppConfig;

/// PageView
///
/// One entry per client page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageView {
    Home,
    Office,
    Lawyer,
    PracticeAreas,
    Articles,
    Contact,
    Dashboard,
    DashboardArticles,
    PageEditor,
    NotFound,
}

impl PageView {
    /// Resolves a URL path (query string excluded). Trailing slashes are ignored.
    pub fn resolve(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => PageView::Home,
            ["escritorio"] => PageView::Office,
            ["advogado"] => PageView::Lawyer,
            ["areas-atuacao"] => PageView::PracticeAreas,
            ["artigos"] => PageView::Articles,
            ["contato"] => PageView::Contact,
            ["dashboard"] => PageView::Dashboard,
            ["dashboard", "articles", ..] => PageView::DashboardArticles,
            ["dashboard", "pages", "editor", _, ..] => PageView::PageEditor,
            _ => PageView::NotFound,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PageView::Home => "home",
            PageView::Office => "office",
            PageView::Lawyer => "lawyer",
            PageView::PracticeAreas => "practice-areas",
            PageView::Articles => "articles",
            PageView::Contact => "contact",
            PageView::Dashboard => "dashboard",
            PageView::DashboardArticles => "dashboard-articles",
            PageView::PageEditor => "page-editor",
            PageView::NotFound => "not-found",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PageView::Home => "Início",
            PageView::Office => "O Escritório",
            PageView::Lawyer => "O Advogado",
            PageView::PracticeAreas => "Áreas de Atuação",
            PageView::Articles => "Artigos",
            PageView::Contact => "Contato",
            PageView::Dashboard => "Painel",
            PageView::DashboardArticles => "Painel · Artigos",
            PageView::PageEditor => "Painel · Editor de Páginas",
            PageView::NotFound => "Página não encontrada",
        }
    }

    /// Dashboard views call protected endpoints; the client redirects to login
    /// when those return 401.
    pub fn is_dashboard(self) -> bool {
        matches!(
            self,
            PageView::Dashboard | PageView::DashboardArticles | PageView::PageEditor
        )
    }

    pub fn status(self) -> StatusCode {
        match self {
            PageView::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::OK,
        }
    }
}

/// Router fallback.
///
/// Unknown `/api` paths get a JSON 404. Everything else is treated as a client
/// route: the built `index.html` is served when present, otherwise a bare shell.
pub async fn client_fallback(State(config): State<AppConfig>, uri: Uri) -> Response {
    let path = uri.path();
    if path == "/api" || path.starts_with("/api/") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Route not found" })),
        )
            .into_response();
    }

    let view = PageView::resolve(path);
    let index = Path::new(&config.static_dir).join("index.html");
    let body = match tokio::fs::read_to_string(&index).await {
        Ok(html) => html,
        Err(_) => shell(view),
    };

    (view.status(), Html(body)).into_response()
}

fn shell(view: PageView) -> String {
    format!(
        "<!doctype html>\n<html lang=\"pt-BR\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body><div id=\"root\" data-view=\"{}\"></div></body>\n</html>\n",
        view.title(),
        view.name()
    )
}
