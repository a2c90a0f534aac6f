use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(description = "Issue Tracker API Documentation", license(name = "MIT or Apache2", identifier="MIT Apache2.0"), title = "Issue Tracker", version = env!("CARGO_PKG_VERSION")),
    paths(
        crate::project::get_projects,
        crate::project::get_project,
        crate::project::post_project,
        crate::project::put_project,
        crate::project::patch_project,
        crate::project::delete_project,
        crate::issue::get_issues,
        crate::issue::get_issue,
        crate::issue::post_issue,
        crate::issue::put_issue,
        crate::issue::patch_issue,
        crate::issue::delete_issue
    )
)]
pub struct ApiDoc;

pub(crate) fn api_route<T: Clone + Sync + Send + 'static>() -> Router<T> {
    let doc = ApiDoc::openapi();
    Router::new().merge(SwaggerUi::new("/api/swagger-ui").url("/api/openapi.json", doc))
}
