use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse, axum_helpers::ErrorCode)
    ),
    info(
        title = "Accounts API",
        version = "0.1.0",
        description = "User accounts: lifecycle, soft delete and restore, credential checks and role statistics"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/users", api = domain_users::ApiDoc),
        (path = "/auth", api = domain_users::AuthApiDoc)
    )
)]
pub struct ApiDoc;
