pub mod gate;
pub mod response;

pub use gate::{
    login_redirect, session_gate_middleware, AuthorizationGate, GateDecision, GateState,
    LOGIN_PATH, NEXT_PARAM,
};
pub use response::{ApiResponse, ApiResult};
