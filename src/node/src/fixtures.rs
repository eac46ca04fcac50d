//! JSON fixtures the node serves decisions from

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_authz::PolicyProgram;
use warden_core::{GrantData, RoleClaim, Subject};

/// Body of a `check` request file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Overrides the configured auth method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,

    pub subject: Subject,

    pub claims: Vec<RoleClaim>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {} from {:?}", what, path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {} in {:?}", what, path))
}

pub fn load_grants(path: &Path) -> Result<GrantData> {
    read_json(path, "grant data")
}

pub fn load_policies(path: &Path) -> Result<Vec<PolicyProgram>> {
    let programs: Vec<PolicyProgram> = read_json(path, "policy programs")?;

    let mut names = std::collections::HashSet::new();
    for program in &programs {
        if !names.insert(program.name.as_str()) {
            anyhow::bail!("Policy program {} is defined twice in {:?}", program.name, path);
        }
    }
    Ok(programs)
}

pub fn load_check_request(path: &Path) -> Result<CheckRequest> {
    let request: CheckRequest = read_json(path, "check request")?;
    if request.claims.is_empty() {
        anyhow::bail!("Check request {:?} has no claims", path);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_policies_with_source_defaults() {
        let file = write(
            r#"[{"name": "ssh", "source": {"allow": "true"}, "bound_roles": ["ssh.*"]}]"#,
        );
        let programs = load_policies(file.path()).unwrap();

        assert_eq!(programs.len(), 1);
        assert!(programs[0].is_bound_to("ssh.admin"));
        assert!(programs[0].accepts_auth_method("okta"));
    }

    #[test]
    fn test_duplicate_program_names_are_rejected() {
        let file = write(
            r#"[{"name": "a", "source": {"allow": "true"}, "bound_roles": []},
                {"name": "a", "source": {"allow": "false"}, "bound_roles": []}]"#,
        );
        assert!(load_policies(file.path()).is_err());
    }

    #[test]
    fn test_check_request_needs_claims() {
        let file = write(r#"{"subject": {"type": "user", "uuid": "u1", "tenant_uuid": "t1"}, "claims": []}"#);
        assert!(load_check_request(file.path()).is_err());

        let file = write(
            r#"{"auth_method": "okta",
                "subject": {"type": "service_account", "uuid": "sa1", "tenant_uuid": "t1"},
                "claims": [{"role": "ssh", "tenant_uuid": "t1", "project_uuid": "p1"}]}"#,
        );
        let request = load_check_request(file.path()).unwrap();
        assert_eq!(request.auth_method.as_deref(), Some("okta"));
        assert_eq!(request.subject, Subject::service_account("sa1", "t1"));
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = load_grants(Path::new("/nonexistent/grants.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("grants.json"));
    }
}
