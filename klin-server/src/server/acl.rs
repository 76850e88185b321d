use super::{AppError, AppState, auth::AuthCtx};
use axum::response::Response;
use axum::{
    extract::{OriginalUri, State},
    http::{Method, Request},
    middleware::Next,
};
use klin_shared::auth::MemberRole;
use percent_encoding::percent_decode_str;

pub async fn enforce_acl(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|orig| orig.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();
    let Some(auth) = req.extensions().get::<AuthCtx>() else {
        return Err(AppError::unauthorized());
    };
    let user_id = auth.user_id().to_string();

    let segs = segmented(&path);
    let rest = match segs.as_slice() {
        ["api", "v1", rest @ ..] => rest,
        _ => {
            tracing::warn!(?segs, "ACL: path outside api scope");
            return Err(AppError::forbidden());
        }
    };

    match rest {
        ["auth", "signout" | "renew"] | ["me"] | ["badges"] | ["households"]
        | ["households", "join"] => {}
        ["households", hid, scoped @ ..] => {
            let hid = decode(hid);
            let role = state
                .store
                .member_role(&hid, &user_id)
                .await
                .map_err(AppError::internal)?;
            let Some(role) = role else {
                tracing::warn!(household_id = %hid, user_id = %user_id, "ACL: not a member");
                return Err(AppError::forbidden());
            };
            if requires_admin(&method, scoped) && role != MemberRole::Admin {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    user_id = %user_id,
                    role = %role,
                    "ACL: admin role required"
                );
                return Err(AppError::forbidden());
            }
        }
        _ => {
            tracing::warn!(method = %method, path = %path, user_id = %user_id, "ACL: no rule matched; denying");
            return Err(AppError::forbidden());
        }
    }

    Ok(next.run(req).await)
}

fn requires_admin(method: &Method, scoped: &[&str]) -> bool {
    match scoped {
        ["tasks", _] => *method == Method::DELETE,
        ["tasks", _, "instances"] => *method == Method::POST,
        _ => false,
    }
}

fn segmented(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(seg: &str) -> String {
    percent_decode_str(seg).decode_utf8_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_rules_cover_delete_and_materialize() {
        assert!(requires_admin(&Method::DELETE, &["tasks", "t1"]));
        assert!(requires_admin(&Method::POST, &["tasks", "t1", "instances"]));
        assert!(!requires_admin(&Method::GET, &["tasks"]));
        assert!(!requires_admin(&Method::POST, &["tasks"]));
        assert!(!requires_admin(&Method::POST, &["instances", "i1", "complete"]));
    }

    #[test]
    fn segments_skip_empty_parts() {
        assert_eq!(
            segmented("/api//v1/households/"),
            vec!["api", "v1", "households"]
        );
    }
}
