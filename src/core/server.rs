use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use url::Url;

use crate::core::engine::Engine;
use crate::widgets::{WidgetDescriptor, WidgetError};

/// 预览服务器
pub struct Server {
    engine: Arc<Engine>,
    /// 端口
    port: u16,
}

/// 处理请求时的错误
pub struct ServerError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ServerError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<WidgetError>() {
            Some(WidgetError::UnknownPlaceholder { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("请求失败: {:#}", self.0);
        (status, format!("{:#}", self.0)).into_response()
    }
}

#[derive(Serialize)]
struct WidgetIndex<'a> {
    widgets: &'a [WidgetDescriptor],
    placeholders: Vec<&'a str>,
}

impl Server {
    /// 创建新的服务器
    pub fn new(engine: Arc<Engine>, port: u16) -> Self {
        Self { engine, port }
    }

    /// 路由：挂件列表、占位符预览、搜索，其余请求交给公共目录
    pub fn router(engine: Arc<Engine>) -> Router {
        let public_dir = engine.public_dir.clone();
        let mut router: Router<Arc<Engine>> = Router::new()
            .route("/widgets", get(list_widgets))
            .route("/placeholders/:name", get(render_placeholder));

        // 搜索表单的地址，带或不带结尾斜杠都可以访问
        let search_path = search_route(&engine.search_url());
        let bare = search_path.trim_end_matches('/');
        if bare.is_empty() {
            router = router.route("/", get(search));
        } else {
            router = router.route(bare, get(search));
            if bare != search_path {
                router = router.route(&search_path, get(search));
            }
        }
        debug!("搜索路由: {}", search_path);

        router
            .fallback_service(ServeDir::new(public_dir))
            .layer(TraceLayer::new_for_http())
            .with_state(engine)
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.engine);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse()?;
        info!("Server started at http://localhost:{}", self.port);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// 搜索地址中的路径部分
fn search_route(search_url: &str) -> String {
    match Url::parse(search_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => crate::utils::ensure_leading_slash(search_url),
    }
}

async fn list_widgets(State(engine): State<Arc<Engine>>) -> Response {
    Json(WidgetIndex {
        widgets: engine.pool.descriptors(),
        placeholders: engine.placeholders(),
    })
    .into_response()
}

async fn render_placeholder(
    State(engine): State<Arc<Engine>>,
    Path(name): Path<String>,
) -> Result<Html<String>, ServerError> {
    Ok(Html(engine.render_placeholder(&name)?))
}

async fn search(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, ServerError> {
    let pattern = params
        .get(&engine.config.search.param)
        .map(String::as_str)
        .unwrap_or("");
    Ok(Html(engine.render_search(pattern)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::categories::CategoryTree;
    use crate::core::store::EntryStore;
    use crate::models::config::Config;
    use crate::models::Entry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    fn app_with(dir: &std::path::Path, yaml: &str) -> Router {
        let config = Config::parse(yaml).unwrap();
        let store = EntryStore::new(vec![Entry::new("rusty", "Rusty post", Utc::now())], CategoryTree::new());
        let engine = Engine::from_parts(dir.to_path_buf(), config, store).unwrap();
        Server::router(Arc::new(engine))
    }

    fn app(dir: &std::path::Path) -> Router {
        app_with(dir, "placeholders:\n  sidebar:\n    - type: tools\n    - type: search_form\n")
    }

    /// 搜索表单的提交地址
    fn form_action(html: &str) -> String {
        let start = html.find("action=\"").unwrap() + "action=\"".len();
        let end = start + html[start..].find('"').unwrap();
        html[start..end].replace("&#x2F;", "/")
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_placeholder_route() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_body(app(dir.path()), "/placeholders/sidebar").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post an entry"));

        let (status, _) = get_body(app(dir.path()), "/placeholders/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_route() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_body(app(dir.path()), "/search?pattern=rusty").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Rusty post"));
    }

    #[tokio::test]
    async fn test_search_form_reaches_search_route() {
        let dir = tempfile::tempdir().unwrap();
        let (_, html) = get_body(app(dir.path()), "/placeholders/sidebar").await;
        let action = form_action(&html);
        assert_eq!(action, "/search/");
        let (status, body) = get_body(app(dir.path()), &format!("{}?pattern=rusty", action)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Rusty post"));

        let yaml = "root: /blog/\nsearch:\n  path: find\n  param: q\nplaceholders:\n  sidebar:\n    - type: search_form\n";
        let (_, html) = get_body(app_with(dir.path(), yaml), "/placeholders/sidebar").await;
        let action = form_action(&html);
        assert_eq!(action, "/blog/find");
        for uri in [format!("{}?q=rusty", action), format!("{}/?q=rusty", action)] {
            let (status, body) = get_body(app_with(dir.path(), yaml), &uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert!(body.contains("Rusty post"));
        }
    }

    #[tokio::test]
    async fn test_widgets_route() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_body(app(dir.path()), "/widgets").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["widgets"].as_array().unwrap().len(), 7);
        assert_eq!(json["placeholders"][0], "sidebar");
    }
}
