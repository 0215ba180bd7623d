use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mural API",
        version = "0.1.0",
        description = "Client API of a replicated bulletin board node. Posts are replicated to peer nodes in the background.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::session::login,
        crate::handlers::messages::post_message,
        crate::handlers::messages::list_messages,
        crate::handlers::internal::replication_status,
    ),
    components(
        schemas(
            crate::dto::LoginRequest,
            crate::dto::LoginResponse,
            crate::dto::PostMessageRequest,
            crate::dto::PostMessageResponse,
            crate::dto::MessagesResponse,
            mural::Message,
        )
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "session", description = "Login and session tokens"),
        (name = "messages", description = "Post and read the board"),
        (name = "internal", description = "Replication status"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
