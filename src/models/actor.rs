use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Authenticated caller identity, checked once per operation against the
/// owning ids on the record it touches. Session handling itself lives in
/// the auth service; it forwards identity via `x-actor-id` and
/// `x-actor-role` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Farmer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Farmer => write!(f, "farmer"),
        }
    }
}

impl Actor {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::Unauthorized(format!(
                "this action requires the {role} role"
            )));
        }
        Ok(())
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_str(parts, "x-actor-id")?
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthorized("x-actor-id is not a valid uuid".to_string()))?;

        let role = match header_str(parts, "x-actor-role")? {
            "buyer" => Role::Buyer,
            "farmer" => Role::Farmer,
            other => {
                return Err(AppError::Unauthorized(format!(
                    "unknown actor role: {other}"
                )))
            }
        };

        Ok(Actor { id, role })
    }
}
