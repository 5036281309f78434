use serde::{Deserialize, Serialize};

/// Body value flask-jwt sends with an expired-token 401.
pub(crate) const EXPIRED_MSG: &str = "Token has expired";

/// Error code the API sends with a 403 for deactivated accounts.
pub(crate) const INACTIVE_CODE: &str = "ACCOUNT_INACTIVE";

/// Identity snapshot returned inside the `usuario` field of the
/// session-validation endpoint. Cached in the durable state file and
/// read by UI collaborators; a cache, not a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "rol", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_wire_field_names() {
        let identity: Identity = serde_json::from_str(
            r#"{"id": 7, "email": "ana@example.com", "nombre": "Ana", "rol": "cliente"}"#,
        )
        .unwrap();
        assert_eq!(identity.id, 7);
        assert_eq!(identity.name, "Ana");
        assert_eq!(identity.role.as_deref(), Some("cliente"));

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["nombre"], "Ana");
        assert_eq!(json["rol"], "cliente");
    }

    #[test]
    fn test_identity_role_optional() {
        let identity: Identity = serde_json::from_str(
            r#"{"id": 1, "email": "luis@example.com", "nombre": "Luis"}"#,
        )
        .unwrap();
        assert!(identity.role.is_none());

        // Absent role stays absent on the wire
        let json = serde_json::to_value(&identity).unwrap();
        assert!(json.get("rol").is_none());
    }
}
