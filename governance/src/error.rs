use crate::proposal::ProposalStatus;
use agora_groups::GroupError;
use agora_router::{RouteKey, RouterError};
use agora_store::StoreError;
use agora_types::{BlockHeight, GroupId, ProposalId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("proposal {id} is {status}: cannot {operation}")]
    InvalidState {
        id: ProposalId,
        status: ProposalStatus,
        operation: &'static str,
    },

    #[error("voting on proposal {id} closed at {deadline}")]
    VotingClosed { id: ProposalId, deadline: BlockHeight },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no handler bound for route {0}")]
    RouteNotFound(RouteKey),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The caller-facing classification of a failed governance operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Unauthorized,
    InvalidInput,
    RouteNotFound,
    /// A handler ran and reported failure.
    ExecutionFailure,
    /// The storage backend failed; not a property of the transaction.
    Storage,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProposalNotFound(_) | Self::GroupNotFound(_) => ErrorKind::NotFound,
            Self::InvalidState { .. } | Self::VotingClosed { .. } => ErrorKind::InvalidState,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::RouteNotFound(_) => ErrorKind::RouteNotFound,
            Self::Store(_) => ErrorKind::Storage,
        }
    }
}

impl From<GroupError> for GovernanceError {
    fn from(e: GroupError) -> Self {
        match e {
            GroupError::GroupNotFound(id) => Self::GroupNotFound(id),
            GroupError::InvalidInput(msg) => Self::InvalidInput(msg),
            GroupError::Store(e) => Self::Store(e),
        }
    }
}

impl From<RouterError> for GovernanceError {
    fn from(e: RouterError) -> Self {
        match e {
            RouterError::RouteNotFound(route) => Self::RouteNotFound(route),
            RouterError::IneligibleGroup { route, group } => {
                Self::Unauthorized(format!("group {group} may not propose on route {route}"))
            }
            RouterError::ActionRejected { route, reason } => {
                Self::InvalidInput(format!("route {route} rejected the action: {reason}"))
            }
            RouterError::DuplicateRoute(route) => {
                Self::InvalidInput(format!("route {route} bound twice"))
            }
            RouterError::InvalidRouteKey(key) => Self::InvalidInput(format!("invalid route key {key:?}")),
        }
    }
}
