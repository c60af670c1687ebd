use crate::route::RouteKey;
use agora_types::GroupId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("route {0} is already bound")]
    DuplicateRoute(RouteKey),

    #[error("no handler bound for route {0}")]
    RouteNotFound(RouteKey),

    #[error("group {group} is not eligible to propose on route {route}")]
    IneligibleGroup { route: RouteKey, group: GroupId },

    #[error("route {route} rejected the action: {reason}")]
    ActionRejected { route: RouteKey, reason: String },

    #[error("invalid route key: {0}")]
    InvalidRouteKey(String),
}
