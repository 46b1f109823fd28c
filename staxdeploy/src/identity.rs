//! Deployment identity and credential resolution.
//!
//! Identity is computed from explicit parameters first, then the package
//! descriptor, and finally by asking an [`InputProvider`]. The library never
//! touches stdin itself; interactive front ends supply their own provider.

use std::collections::VecDeque;
use std::io;

use thiserror::Error;
use tracing::debug;

use crate::descriptor::AppDescriptor;

/// Environments always applied to a deploy before any explicit ones.
pub const IMPLICIT_DEPLOY_ENVIRONMENTS: &[&str] = &["deploy"];

/// Prompt shown when no application id could be found.
pub const APP_ID_PROMPT: &str = "Enter application ID (ex: account/appname): ";

/// Prompt shown when the username is missing.
pub const USERNAME_PROMPT: &str = "Enter your username: ";

/// Prompt shown when the password is missing.
pub const PASSWORD_PROMPT: &str = "Enter your password: ";

/// A required deployment value could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResolutionError(pub String);

impl ResolutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Answers prompts for missing identity or credentials.
pub trait InputProvider {
    /// Ask for a visible value.
    fn prompt(&mut self, message: &str) -> io::Result<String>;

    /// Ask for a value that should not be echoed.
    fn prompt_secret(&mut self, message: &str) -> io::Result<String> {
        self.prompt(message)
    }
}

/// Input provider that replays a fixed list of answers.
///
/// Once the answers run out every prompt yields an empty string. All prompt
/// messages are recorded, which makes it useful for asserting that no prompt
/// happened.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    /// Provider that never has an answer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Provider answering prompts with `answers`, in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Messages of all prompts received so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl InputProvider for ScriptedInput {
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        self.prompts.push(message.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

/// Build the environment list: `implicit` in order, then the comma-separated
/// `explicit` elements, trimmed. Empty elements are dropped; duplicates are
/// kept.
pub fn environment_list(explicit: &str, implicit: &[&str]) -> Vec<String> {
    implicit
        .iter()
        .map(|s| s.to_string())
        .chain(explicit.split(',').map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Identity inputs supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct IdentityRequest<'a> {
    /// Explicit application id, possibly qualified as `domain/app`.
    pub app_id: Option<&'a str>,
    /// Explicit domain.
    pub domain: Option<&'a str>,
    /// Domain used when neither the id nor `domain` provide one.
    pub default_domain: Option<&'a str>,
    /// Comma-separated explicit environments.
    pub environments: &'a str,
}

/// Fully resolved logical target of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentIdentity {
    pub application_id: String,
    pub domain: String,
    /// Requested environments, before merging with the descriptor.
    pub environments: Vec<String>,
    /// Environments declared by the descriptor that this deploy applies.
    pub applied_environments: Vec<String>,
    pub default_environment: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl DeploymentIdentity {
    /// Resolve the identity of a deploy.
    ///
    /// The application id comes from the request, then the descriptor, then
    /// a prompt. A qualified id `domain/app` always wins over any supplied
    /// domain.
    pub fn resolve(
        request: &IdentityRequest<'_>,
        descriptor: Option<&AppDescriptor>,
        input: &mut dyn InputProvider,
    ) -> Result<Self, ResolutionError> {
        let mut app_id = non_blank(request.app_id)
            .or_else(|| non_blank(descriptor.and_then(AppDescriptor::application_id)));

        if app_id.is_none() {
            let answer = input
                .prompt(APP_ID_PROMPT)
                .map_err(|e| ResolutionError(format!("failed to read application id: {}", e)))?;
            app_id = non_blank(Some(&answer));
        }

        let app_id = app_id.ok_or_else(|| ResolutionError::new("no application id specified"))?;

        let (domain, application_id) = match app_id.split_once('/') {
            Some((domain, app)) => {
                if domain.is_empty() || app.is_empty() {
                    return Err(ResolutionError(format!(
                        "invalid application id '{}'",
                        app_id
                    )));
                }
                (domain.to_string(), app.to_string())
            }
            None => {
                let domain = non_blank(request.domain)
                    .or_else(|| non_blank(request.default_domain))
                    .ok_or_else(|| {
                        ResolutionError(format!("no domain specified for application '{}'", app_id))
                    })?;
                (domain, app_id)
            }
        };

        let environments = environment_list(request.environments, IMPLICIT_DEPLOY_ENVIRONMENTS);
        let explicit_requested = !environment_list(request.environments, &[]).is_empty();

        let (applied_environments, default_environment) = match descriptor {
            Some(d) => (
                d.applied_environments(&environments, explicit_requested),
                d.default_environment().map(str::to_string),
            ),
            None => (Vec::new(), None),
        };

        if let Some(d) = descriptor {
            debug!(
                params = ?d.effective_params(&applied_environments),
                "Effective descriptor parameters"
            );
        }

        Ok(Self {
            application_id,
            domain,
            environments,
            applied_environments,
            default_environment,
        })
    }

    /// Comma-joined applied environments, as transmitted.
    pub fn environment_field(&self) -> String {
        self.applied_environments.join(",")
    }

    /// The `domain/app` form of the identity.
    pub fn qualified_id(&self) -> String {
        format!("{}/{}", self.domain, self.application_id)
    }
}

/// Account credentials for the hosting API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Complete partially supplied credentials.
    ///
    /// A missing username is prompted for. The password is prompted for when
    /// either value was missing, so a newly entered username never pairs with
    /// a stale password.
    pub fn resolve(
        username: Option<&str>,
        password: Option<&str>,
        input: &mut dyn InputProvider,
    ) -> Result<Self, ResolutionError> {
        let mut user = non_blank(username);
        let mut pass = password.filter(|p| !p.is_empty()).map(str::to_string);
        let user_missing = user.is_none();

        if user_missing {
            let answer = input
                .prompt(USERNAME_PROMPT)
                .map_err(|e| ResolutionError(format!("failed to read username: {}", e)))?;
            user = non_blank(Some(&answer));
        }

        if user_missing || pass.is_none() {
            let answer = input
                .prompt_secret(PASSWORD_PROMPT)
                .map_err(|e| ResolutionError(format!("failed to read password: {}", e)))?;
            pass = Some(answer).filter(|p| !p.is_empty());
        }

        match (user, pass) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            (None, _) => Err(ResolutionError::new("no username specified")),
            (_, None) => Err(ResolutionError::new("no password specified")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request<'a>(app_id: Option<&'a str>, domain: Option<&'a str>) -> IdentityRequest<'a> {
        IdentityRequest {
            app_id,
            domain,
            default_domain: None,
            environments: "",
        }
    }

    #[test]
    fn test_environment_list() {
        assert_eq!(
            environment_list("e1, e2,e3", &["deploy"]),
            vec!["deploy", "e1", "e2", "e3"]
        );
        assert!(environment_list("", &[]).is_empty());
        assert_eq!(environment_list("", &["deploy"]), vec!["deploy"]);
        assert_eq!(environment_list("a,,b,a", &[]), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_qualified_id_overrides_domain() {
        let mut input = ScriptedInput::empty();
        let identity =
            DeploymentIdentity::resolve(&request(Some("acme/site"), Some("other")), None, &mut input)
                .unwrap();
        assert_eq!(identity.domain, "acme");
        assert_eq!(identity.application_id, "site");
        assert_eq!(identity.qualified_id(), "acme/site");
        assert!(input.prompts().is_empty());
    }

    #[test]
    fn test_unqualified_without_domain_fails() {
        let mut input = ScriptedInput::empty();
        let err = DeploymentIdentity::resolve(&request(Some("site"), None), None, &mut input)
            .unwrap_err();
        assert!(err.to_string().contains("no domain"));
    }

    #[test]
    fn test_default_domain_used() {
        let mut input = ScriptedInput::empty();
        let req = IdentityRequest {
            default_domain: Some("bob"),
            ..request(Some("site"), None)
        };
        let identity = DeploymentIdentity::resolve(&req, None, &mut input).unwrap();
        assert_eq!(identity.domain, "bob");
    }

    #[test]
    fn test_empty_segments_rejected() {
        let mut input = ScriptedInput::empty();
        assert!(DeploymentIdentity::resolve(&request(Some("/site"), None), None, &mut input).is_err());
        assert!(DeploymentIdentity::resolve(&request(Some("acme/"), None), None, &mut input).is_err());
    }

    #[test]
    fn test_descriptor_appid_used_before_prompt() {
        let descriptor =
            AppDescriptor::parse("<stax-application><appid>acme/blog</appid></stax-application>")
                .unwrap();
        let mut input = ScriptedInput::new(["never/used"]);
        let identity =
            DeploymentIdentity::resolve(&request(None, None), Some(&descriptor), &mut input).unwrap();
        assert_eq!(identity.qualified_id(), "acme/blog");
        assert!(input.prompts().is_empty());
    }

    #[test]
    fn test_prompts_for_missing_appid() {
        let mut input = ScriptedInput::new(["acme/shop"]);
        let identity = DeploymentIdentity::resolve(&request(None, None), None, &mut input).unwrap();
        assert_eq!(identity.qualified_id(), "acme/shop");
        assert_eq!(input.prompts(), &[APP_ID_PROMPT.to_string()]);
    }

    #[test]
    fn test_unanswered_prompt_fails() {
        let mut input = ScriptedInput::empty();
        let err = DeploymentIdentity::resolve(&request(None, None), None, &mut input).unwrap_err();
        assert_eq!(err.to_string(), "no application id specified");
    }

    #[test]
    fn test_applied_environments_from_descriptor() {
        let descriptor = AppDescriptor::parse(
            r#"<stax-application>
                 <default-environment>prod</default-environment>
                 <environment name="deploy"/>
                 <environment name="prod"/>
                 <environment name="qa"/>
               </stax-application>"#,
        )
        .unwrap();
        let mut input = ScriptedInput::empty();

        let identity =
            DeploymentIdentity::resolve(&request(Some("a/b"), None), Some(&descriptor), &mut input)
                .unwrap();
        assert_eq!(identity.environments, vec!["deploy"]);
        assert_eq!(identity.environment_field(), "deploy,prod");
        assert_eq!(identity.default_environment.as_deref(), Some("prod"));

        let req = IdentityRequest {
            environments: "qa",
            ..request(Some("a/b"), None)
        };
        let identity = DeploymentIdentity::resolve(&req, Some(&descriptor), &mut input).unwrap();
        assert_eq!(identity.environment_field(), "deploy,qa");
    }

    #[test]
    fn test_credentials_complete() {
        let mut input = ScriptedInput::empty();
        let creds = Credentials::resolve(Some("bob"), Some("secret"), &mut input).unwrap();
        assert_eq!(creds.username, "bob");
        assert!(input.prompts().is_empty());
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_missing_username_prompts_for_both() {
        let mut input = ScriptedInput::new(["alice", "pw"]);
        let creds = Credentials::resolve(None, Some("stale"), &mut input).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "pw");
        assert_eq!(
            input.prompts(),
            &[USERNAME_PROMPT.to_string(), PASSWORD_PROMPT.to_string()]
        );
    }

    #[test]
    fn test_missing_password_prompts_once() {
        let mut input = ScriptedInput::new(["pw"]);
        let creds = Credentials::resolve(Some("bob"), None, &mut input).unwrap();
        assert_eq!(creds.password, "pw");
        assert_eq!(input.prompts(), &[PASSWORD_PROMPT.to_string()]);
    }

    #[test]
    fn test_empty_password_answer_fails() {
        let mut input = ScriptedInput::empty();
        let err = Credentials::resolve(Some("bob"), None, &mut input).unwrap_err();
        assert_eq!(err.to_string(), "no password specified");
    }

    proptest! {
        #[test]
        fn prop_qualified_id_splits_on_first_slash(
            domain in "[a-z][a-z0-9-]{0,12}",
            app in "[a-z][a-z0-9/-]{0,12}",
            supplied in proptest::option::of("[a-z]{1,8}"),
        ) {
            let id = format!("{}/{}", domain, app);
            let mut input = ScriptedInput::empty();
            let req = IdentityRequest {
                app_id: Some(&id),
                domain: supplied.as_deref(),
                default_domain: Some("fallback"),
                environments: "",
            };
            let identity = DeploymentIdentity::resolve(&req, None, &mut input).unwrap();
            prop_assert_eq!(identity.domain, domain);
            prop_assert_eq!(identity.application_id, app);
        }

        #[test]
        fn prop_environment_list_starts_with_implicit(
            names in proptest::collection::vec("[a-z]{1,6}", 0..6),
        ) {
            let explicit = names.join(" , ");
            let list = environment_list(&explicit, IMPLICIT_DEPLOY_ENVIRONMENTS);
            prop_assert_eq!(list.len(), names.len() + 1);
            prop_assert_eq!(list[0].as_str(), "deploy");
            prop_assert_eq!(&list[1..], &names[..]);
        }
    }
}
