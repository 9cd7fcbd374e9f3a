//! The mashup form page.

use axum::extract::State;
use axum::response::Html;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

const FALLBACK_BANNER: &str =
    r#"<p class="banner info">Fallback mode is on: a demo mashup is delivered if downloads fail.</p>"#;
const FULL_BANNER: &str = r#"<p class="banner ok">Full mode: attempting real downloads.</p>"#;

/// GET /
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let banner = if state.runner.profile().fallback_enabled {
        FALLBACK_BANNER
    } else {
        FULL_BANNER
    };
    Html(INDEX_HTML.replace("{{MODE_BANNER}}", banner))
}
