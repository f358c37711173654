//! Request and response models for the role-request API.

pub mod concept;
pub mod long_polling;
pub mod role;
pub mod role_request;

pub use concept::{
    ConceptDeleteResponse, ConceptListResponse, ConceptResponse, UpsertConceptRequest,
};
pub use long_polling::UnresolvedCheckResponse;
pub use role::{
    CompositionListResponse, CompositionResponse, CreateCompositionRequest,
    CreateIncompatibleRoleRequest, IncompatibleRoleListResponse, IncompatibleRoleResponse,
    ViolationListResponse, ViolationResponse,
};
pub use role_request::{
    CopyRolesRequest, CreateRoleRequestRequest, ListRoleRequestsQuery, RequestDeleteResponse,
    RoleRequestListResponse, RoleRequestResponse, StartRoleRequestQuery,
};
