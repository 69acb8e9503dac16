// src/web/routes.rs
use crate::{
    state::AppState,
    web::{
        admin_handlers, auth_handlers, coord_handlers, inventory_handlers, mw_auth, mw_role, student_handlers,
        ticket_handlers, user_handlers, ws_handlers,
    },
};
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/api/auth/login", post(auth_handlers::api_login))
        .route("/api/auth/logout", post(auth_handlers::api_logout));

    // --- Páginas HTML (sem sessão -> /login) ---
    let page_routes = Router::new()
        .route("/", get(user_handlers::home_page_handler))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), mw_auth::require_page_auth));

    // --- Admin ---
    let admin_routes = Router::new()
        .route("/users", get(admin_handlers::list_users).post(admin_handlers::create_user))
        .route("/users/{id}", patch(admin_handlers::update_user))
        .route("/users/{id}/password", post(admin_handlers::change_password))
        .route("/programs", get(admin_handlers::list_programs))
        .route("/programs/{id}/coordinators", post(admin_handlers::add_coordinator))
        .route("/periods", get(admin_handlers::list_periods).post(admin_handlers::create_period))
        .route("/periods/{id}", patch(admin_handlers::update_period))
        .route("/periods/{id}/activate", post(admin_handlers::activate_period))
        .route(
            "/periods/{id}/config",
            get(admin_handlers::get_period_config).put(admin_handlers::put_period_config),
        )
        .route(
            "/periods/{id}/days",
            get(admin_handlers::get_enabled_days).put(admin_handlers::put_enabled_days),
        )
        .route("/coordinators/{id}/windows", post(admin_handlers::bulk_create_windows))
        .route_layer(middleware::from_fn(mw_role::require_admin));

    // --- AgendaTec ---
    let coord_routes = Router::new()
        .route("/windows", get(coord_handlers::list_windows).post(coord_handlers::create_window))
        .route("/windows/{id}", axum::routing::delete(coord_handlers::delete_window))
        .route("/windows/delete-range", post(coord_handlers::delete_range))
        .route("/slots", get(coord_handlers::list_slots))
        .route("/requests", get(coord_handlers::list_requests))
        .route("/requests/{id}", patch(coord_handlers::update_request_status))
        .route("/dashboard", get(coord_handlers::dashboard))
        .route_layer(middleware::from_fn(mw_role::require_coordinator));

    let student_routes = Router::new()
        .route("/slots", get(student_handlers::free_slots))
        .route(
            "/requests",
            get(student_handlers::my_requests).post(student_handlers::create_request),
        )
        .route("/requests/{id}/cancel", post(student_handlers::cancel_request))
        .route_layer(middleware::from_fn(mw_role::require_student));

    let social_routes = Router::new()
        .route("/appointments", get(coord_handlers::social_appointments))
        .route_layer(middleware::from_fn(mw_role::require_social_service));

    let agendatec_routes = Router::new()
        .route("/periods/active", get(student_handlers::active_period))
        .nest("/coord", coord_routes)
        .nest("/student", student_routes)
        .nest("/social", social_routes);

    // --- Helpdesk ---
    let ticket_admin_routes = Router::new()
        .route("/tickets/{id}/assign", post(ticket_handlers::assign_ticket))
        .route("/stats", get(ticket_handlers::stats))
        .route_layer(middleware::from_fn(mw_role::require_helpdesk_admin));

    let inventory_admin_routes = Router::new()
        .route("/items", post(inventory_handlers::create_item))
        .route("/items/{id}", patch(inventory_handlers::update_item))
        .route("/items/{id}/assign", post(inventory_handlers::assign_item))
        .route("/items/{id}/unassign", post(inventory_handlers::unassign_item))
        .route("/items/{id}/status", post(inventory_handlers::change_status))
        .route_layer(middleware::from_fn(mw_role::require_helpdesk_admin));

    let inventory_read_routes = Router::new()
        .route("/items", get(inventory_handlers::list_items))
        .route("/items/{id}", get(inventory_handlers::get_item))
        .route("/items/{id}/history", get(inventory_handlers::item_history))
        .route("/stats", get(inventory_handlers::stats))
        .route_layer(middleware::from_fn(mw_role::require_helpdesk_staff));

    let helpdesk_routes = Router::new()
        .route("/categories", get(ticket_handlers::list_categories))
        .route("/tickets", get(ticket_handlers::list_tickets).post(ticket_handlers::create_ticket))
        .route("/tickets/{id}", get(ticket_handlers::get_ticket))
        .route("/tickets/{id}/start", post(ticket_handlers::start_ticket))
        .route("/tickets/{id}/resolve", post(ticket_handlers::resolve_ticket))
        .route("/tickets/{id}/cancel", post(ticket_handlers::cancel_ticket))
        .route("/tickets/{id}/rate", post(ticket_handlers::rate_ticket))
        .route("/tickets/{id}/comments", post(ticket_handlers::add_comment))
        .merge(ticket_admin_routes)
        .nest("/inventory", inventory_admin_routes.merge(inventory_read_routes));

    // --- Rotas Autenticadas (JSON + WebSocket) ---
    // require_auth cobre tudo o que está acima, incluindo os routers aninhados
    let authenticated_routes = Router::new()
        .route("/api/auth/me", get(auth_handlers::me))
        .route("/ws", get(ws_handlers::websocket_handler))
        .nest("/api/admin", admin_routes)
        .nest("/api/agendatec", agendatec_routes)
        .nest("/api/help-desk", helpdesk_routes)
        .route_layer(middleware::from_fn_with_state(app_state.clone(), mw_auth::require_auth));

    // --- Router Final ---
    Router::new()
        .merge(public_routes)
        .merge(page_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
