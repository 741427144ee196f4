//! Route table. Each method router declares the guard chain it sits behind;
//! handlers only run once the whole chain has passed.

use axum::{
    Router,
    routing::{MethodRouter, delete, get, patch, post, put},
};

use craftowl_auth::Access;

use crate::app::services::AppServices;
use crate::middleware::{GuardState, guard_middleware};

pub mod admin;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod system;
pub mod tools;
pub mod users;

fn guarded(method_router: MethodRouter, state: &GuardState) -> MethodRouter {
    method_router.route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        guard_middleware,
    ))
}

pub fn router(services: &AppServices) -> Router {
    let authenticated = GuardState::new(services.guards(Access::Authenticated));
    let admin = GuardState::new(services.guards(Access::Admin));
    let authed = |m: MethodRouter| guarded(m, &authenticated);
    let admin_only = |m: MethodRouter| guarded(m, &admin);

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        // users
        .route("/user", admin_only(get(users::list_users)))
        .route(
            "/user/:email",
            put(users::upsert_user).merge(authed(get(users::get_user))),
        )
        .route("/login/:email", post(users::login))
        .route("/update-user/:email", authed(patch(users::update_profile)))
        .route(
            "/admin/user/:email",
            authed(get(admin::admin_status))
                .merge(admin_only(patch(admin::promote).delete(admin::revoke))),
        )
        // catalog
        .route(
            "/tool",
            get(tools::top_tools).merge(admin_only(post(tools::create_tool))),
        )
        .route("/all-tools", get(tools::all_tools))
        .route("/cheapest-tool", get(tools::cheapest_tool))
        .route(
            "/tool/:id",
            get(tools::get_tool).merge(admin_only(delete(tools::delete_tool))),
        )
        // orders
        .route(
            "/order",
            authed(post(orders::place_order).get(orders::list_own_orders)),
        )
        .route(
            "/order/:id",
            authed(
                get(orders::get_own_order)
                    .patch(orders::confirm_payment)
                    .delete(orders::cancel_order),
            ),
        )
        .route(
            "/create-payment-intent",
            authed(post(payments::create_payment_intent)),
        )
        .route("/admin/order", admin_only(get(admin::list_orders)))
        .route(
            "/admin/order/:id",
            admin_only(patch(admin::ship_order).delete(admin::delete_order)),
        )
        // reviews
        .route(
            "/review",
            get(reviews::list_reviews).merge(authed(put(reviews::submit_review))),
        )
}
