//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, health, loans, notifications, tickets, users};
use crate::models::{author, book, borrower, notification, ticket, user};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LMS API",
        version = "1.0.0",
        description = "Library lending, ticket visibility and notification addressing REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Users
        users::signup,
        users::login,
        users::refresh,
        users::me,
        users::assign_role,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::search_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Loans
        loans::borrow_book,
        loans::return_book,
        loans::my_books,
        // Tickets
        tickets::search_tickets,
        tickets::accessible_ticket_ids,
        // Notifications
        notifications::list_rules,
        notifications::preview_recipients,
    ),
    components(
        schemas(
            health::HealthResponse,
            // Users
            user::Role,
            user::UserOut,
            user::CreateUser,
            user::LoginRequest,
            user::LoginResponse,
            user::RefreshRequest,
            user::AssignRole,
            // Catalog
            author::Author,
            author::CreateAuthor,
            author::UpdateAuthor,
            book::Book,
            book::LoanState,
            book::BookDetails,
            book::CreateBook,
            book::UpdateBook,
            borrower::HeldBooks,
            // Tickets
            ticket::TicketRecord,
            ticket::TicketStatusRef,
            ticket::SlaInfo,
            ticket::PurposeInfo,
            ticket::AttachmentInfo,
            ticket::AssigneeUser,
            // Notifications
            notification::NotificationEvent,
            notification::RecipientPolicy,
            notification::EventPolicy,
            notification::RecipientRequest,
            notification::RecipientList,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Accounts and authentication"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book catalog"),
        (name = "loans", description = "Borrowing and returning books"),
        (name = "tickets", description = "Ticket visibility and search"),
        (name = "notifications", description = "Notification recipients")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
